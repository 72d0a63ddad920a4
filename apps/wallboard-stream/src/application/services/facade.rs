//! Snapshot Service Facade
//!
//! The single entry point used by the transport layer. Holds only the
//! snapshot source and the registry.

use std::sync::Arc;

use super::SubscriberRegistry;
use crate::application::ports::{SendError, SnapshotError, SnapshotSource, SubscriberSink};
use crate::domain::market::Snapshot;
use crate::domain::streaming::{ClientMessage, InboundMessageError, ServerMessage};
use crate::domain::subscription::{RegistryStatus, SubscriberId};
use crate::infrastructure::metrics;

/// Pull and push access to market snapshots.
#[derive(Clone)]
pub struct SnapshotService {
    source: Arc<dyn SnapshotSource>,
    registry: SubscriberRegistry,
}

impl SnapshotService {
    /// Create a facade over `source` and `registry`.
    #[must_use]
    pub fn new(source: Arc<dyn SnapshotSource>, registry: SubscriberRegistry) -> Self {
        Self { source, registry }
    }

    /// Build the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the source cannot build one.
    pub async fn get_snapshot(&self) -> Result<Arc<Snapshot>, SnapshotError> {
        self.source.build_snapshot().await
    }

    /// Register a connection; it receives an initial snapshot.
    pub async fn subscribe(&self, sink: Arc<dyn SubscriberSink>) -> SubscriberId {
        self.registry.register(sink).await
    }

    /// Unregister a connection. Idempotent.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.unregister(id)
    }

    /// Subscriber count and loop state.
    #[must_use]
    pub fn status(&self) -> RegistryStatus {
        self.registry.status()
    }

    /// Underlying registry.
    #[must_use]
    pub const fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Act on a parsed control message.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if the reply could not be delivered; the
    /// subscriber has then been unregistered.
    pub async fn handle_message(
        &self,
        id: SubscriberId,
        message: ClientMessage,
    ) -> Result<(), SendError> {
        match message {
            ClientMessage::LivenessProbe => {
                metrics::record_inbound_message("liveness-probe");
                self.registry.send_to(id, ServerMessage::LivenessAck).await
            }
            ClientMessage::Resubscribe { scope } => {
                metrics::record_inbound_message("resubscribe");
                self.registry.resubscribe(id, scope).await
            }
            ClientMessage::RefreshRequest => {
                metrics::record_inbound_message("refresh-request");
                self.registry.refresh(id).await
            }
        }
    }

    /// Parse and act on a raw text frame. Unparseable frames are logged and
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if a reply could not be delivered.
    pub async fn handle_text(&self, id: SubscriberId, text: &str) -> Result<(), SendError> {
        match ClientMessage::parse(text) {
            Ok(message) => self.handle_message(id, message).await,
            Err(e) => {
                let label = match &e {
                    InboundMessageError::Malformed(_) => "malformed",
                    InboundMessageError::UnknownType(_) => "unknown",
                };
                metrics::record_inbound_message(label);
                tracing::warn!(subscriber_id = %id, error = %e, "Ignoring inbound message");
                Ok(())
            }
        }
    }

    /// Send a liveness probe to an idle subscriber.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if the probe could not be delivered.
    pub async fn probe(&self, id: SubscriberId) -> Result<(), SendError> {
        self.registry.send_to(id, ServerMessage::LivenessProbe).await
    }

    /// Stop broadcasting and release every subscriber.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

impl std::fmt::Debug for SnapshotService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
