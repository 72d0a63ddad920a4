//! WebSocket Protocol Types
//!
//! Messages exchanged with wallboard clients. Every frame is a JSON object
//! discriminated by a `type` field.
//!
//! # Inbound
//!
//! | `type`            | Legacy alias        | Fields  |
//! |-------------------|---------------------|---------|
//! | `liveness-probe`  | `ping`              |         |
//! | `resubscribe`     | `subscribe`         | `scope` (alias `subscription`) |
//! | `refresh-request` | `request_snapshot`  |         |
//!
//! # Outbound
//!
//! `snapshot`, `update`, `liveness-probe`, `liveness-ack`, `error`,
//! `scoped-data`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::market::{Category, CategoryPayload, Snapshot};

// =============================================================================
// Subscription Scope
// =============================================================================

/// The slice of market data a subscriber declared interest in.
///
/// Scope only shapes the immediate reply to a resubscription; periodic
/// broadcasts always carry the full snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SubscriptionScope {
    /// Every category.
    #[default]
    All,
    /// Mainland A-share benchmark indices.
    AShares,
    /// A single category.
    Category(Category),
}

impl SubscriptionScope {
    /// Parse a scope name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Some(Self::All),
            "a-shares" | "a_shares" | "ashares" => Some(Self::AShares),
            other => Category::from_str_case_insensitive(other).map(Self::Category),
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::AShares => "a-shares",
            Self::Category(category) => category.as_str(),
        }
    }

    /// Whether this scope covers less than the full snapshot.
    #[must_use]
    pub const fn is_narrowed(&self) -> bool {
        !matches!(self, Self::All)
    }

    /// The slice of `snapshot` this scope selects, or `None` for [`Self::All`].
    #[must_use]
    pub fn view(&self, snapshot: &Snapshot) -> Option<CategoryPayload> {
        match self {
            Self::All => None,
            Self::AShares => Some(snapshot.a_share_indices()),
            Self::Category(category) => Some(snapshot.payload(*category).clone()),
        }
    }
}

impl fmt::Display for SubscriptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SubscriptionScope {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown subscription scope: {value}"))
    }
}

impl From<SubscriptionScope> for String {
    fn from(scope: SubscriptionScope) -> Self {
        scope.as_str().to_string()
    }
}

// =============================================================================
// Client Messages
// =============================================================================

/// Control message sent by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Keepalive; answered with `liveness-ack`.
    #[serde(alias = "ping")]
    LivenessProbe,
    /// Declare a new subscription scope.
    #[serde(alias = "subscribe")]
    Resubscribe {
        /// Requested scope.
        #[serde(alias = "subscription", default)]
        scope: SubscriptionScope,
    },
    /// Ask for an immediate snapshot.
    #[serde(alias = "request_snapshot")]
    RefreshRequest,
}

const KNOWN_CLIENT_TYPES: [&str; 6] = [
    "liveness-probe",
    "ping",
    "resubscribe",
    "subscribe",
    "refresh-request",
    "request_snapshot",
];

impl ClientMessage {
    /// Parse an inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`InboundMessageError::Malformed`] if the frame is not a JSON
    /// object with a string `type` or a known type has invalid fields, and
    /// [`InboundMessageError::UnknownType`] for unrecognized types.
    pub fn parse(text: &str) -> Result<Self, InboundMessageError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| InboundMessageError::Malformed(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| InboundMessageError::Malformed("missing message type".to_string()))?;

        if !KNOWN_CLIENT_TYPES.contains(&kind) {
            return Err(InboundMessageError::UnknownType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| InboundMessageError::Malformed(e.to_string()))
    }
}

/// Inbound frame that could not be turned into a [`ClientMessage`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InboundMessageError {
    /// Not JSON, no `type`, or invalid fields.
    #[error("malformed message: {0}")]
    Malformed(String),
    /// Well-formed message of an unrecognized type.
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

// =============================================================================
// Server Messages
// =============================================================================

/// Message pushed to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Initial state or on-demand refresh.
    Snapshot {
        /// Full snapshot.
        data: Arc<Snapshot>,
    },
    /// Periodic broadcast.
    Update {
        /// Full snapshot.
        data: Arc<Snapshot>,
    },
    /// Sent after an idle window without inbound traffic.
    LivenessProbe,
    /// Reply to a subscriber's liveness probe.
    LivenessAck,
    /// On-demand refresh failure.
    Error {
        /// Human-readable reason.
        message: String,
    },
    /// Narrowed view sent in reply to a resubscription.
    ScopedData {
        /// Scope the view was built for.
        scope: SubscriptionScope,
        /// Snapshot time.
        timestamp: DateTime<Utc>,
        /// Selected payload.
        data: CategoryPayload,
    },
}

impl ServerMessage {
    /// Wire `type` value.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Update { .. } => "update",
            Self::LivenessProbe => "liveness-probe",
            Self::LivenessAck => "liveness-ack",
            Self::Error { .. } => "error",
            Self::ScopedData { .. } => "scoped-data",
        }
    }

    /// Scoped reply for `scope`, or `None` when the scope is not narrowed.
    #[must_use]
    pub fn scoped(scope: SubscriptionScope, snapshot: &Snapshot) -> Option<Self> {
        scope.view(snapshot).map(|data| Self::ScopedData {
            scope,
            timestamp: snapshot.timestamp,
            data,
        })
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Tests
// =============================================================================
