//! Subscriber Identity and Occupancy
//!
//! The broadcast loop runs exactly while at least one subscriber is
//! registered. [`LoopTransition::between`] turns a registry size change into
//! the edge that starts or stops it.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Unique subscriber identifier. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to correlate log lines.
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Lifecycle phase of the periodic broadcast loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopPhase {
    /// No periodic task.
    Stopped,
    /// Periodic task active.
    Running,
}

impl LoopPhase {
    /// Phase implied by a registry size.
    #[must_use]
    pub const fn for_occupancy(subscribers: usize) -> Self {
        if subscribers == 0 {
            Self::Stopped
        } else {
            Self::Running
        }
    }

    /// Metric/log name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }
}

/// Edge produced by a registry size change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopTransition {
    /// Registry went from empty to occupied.
    Start,
    /// Registry went from occupied to empty.
    Stop,
    /// No edge crossed.
    None,
}

impl LoopTransition {
    /// Edge between two registry sizes.
    #[must_use]
    pub const fn between(before: usize, after: usize) -> Self {
        match (
            LoopPhase::for_occupancy(before),
            LoopPhase::for_occupancy(after),
        ) {
            (LoopPhase::Stopped, LoopPhase::Running) => Self::Start,
            (LoopPhase::Running, LoopPhase::Stopped) => Self::Stop,
            _ => Self::None,
        }
    }
}

/// Registry status as reported at `/ws/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStatus {
    /// Registered subscribers.
    pub active_connections: usize,
    /// Whether the periodic loop is running.
    pub broadcasting: bool,
}

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the message was offered to.
    pub attempted: usize,
    /// Successful sends.
    pub delivered: usize,
    /// Subscribers removed after a failed send.
    pub removed: Vec<SubscriberId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_subscriber_starts_loop() {
        assert_eq!(LoopTransition::between(0, 1), LoopTransition::Start);
    }

    #[test]
    fn last_subscriber_stops_loop() {
        assert_eq!(LoopTransition::between(1, 0), LoopTransition::Stop);
    }

    #[test]
    fn interior_changes_cross_no_edge() {
        assert_eq!(LoopTransition::between(1, 2), LoopTransition::None);
        assert_eq!(LoopTransition::between(3, 2), LoopTransition::None);
        assert_eq!(LoopTransition::between(0, 0), LoopTransition::None);
    }

    #[test]
    fn ids_are_unique() {
        let a = SubscriberId::new();
        let b = SubscriberId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 8);
    }

    #[test]
    fn status_serializes_for_status_endpoint() {
        let status = RegistryStatus {
            active_connections: 2,
            broadcasting: true,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({"active_connections": 2, "broadcasting": true})
        );
    }
}
