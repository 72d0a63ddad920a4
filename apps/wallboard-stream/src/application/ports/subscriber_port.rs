//! Subscriber Sink Port (Driven Port)
//!
//! Outbound half of a subscriber connection. A failed send means the
//! connection is unusable and the subscriber will be unregistered.

use async_trait::async_trait;

use crate::domain::streaming::ServerMessage;

/// Destination for messages pushed to one subscriber.
#[async_trait]
pub trait SubscriberSink: Send + Sync {
    /// Deliver a message.
    async fn send(&self, message: ServerMessage) -> Result<(), SendError>;
}

/// Subscriber send error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Connection closed by the peer or transport.
    #[error("subscriber connection closed")]
    Closed,

    /// Outbound queue is full; the subscriber is not keeping up.
    #[error("subscriber outbound queue full")]
    QueueFull,

    /// Transport-specific failure.
    #[error("subscriber transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },
}

impl SendError {
    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::QueueFull => "queue_full",
            Self::Transport { .. } => "transport",
        }
    }
}
