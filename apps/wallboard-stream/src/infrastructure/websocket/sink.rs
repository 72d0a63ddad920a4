//! Channel-backed subscriber sink.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::application::ports::{SendError, SubscriberSink};
use crate::domain::streaming::ServerMessage;

/// Subscriber sink backed by a bounded channel.
///
/// The receiving half is drained by the connection's writer task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ServerMessage>,
}

impl ChannelSink {
    /// Create a sink and the receiver for its messages.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SubscriberSink for ChannelSink {
    async fn send(&self, message: ServerMessage) -> Result<(), SendError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_until_full() {
        let (sink, mut rx) = ChannelSink::new(1);
        sink.send(ServerMessage::LivenessProbe).await.unwrap();
        assert_eq!(
            sink.send(ServerMessage::LivenessAck).await,
            Err(SendError::QueueFull)
        );
        assert_eq!(rx.recv().await, Some(ServerMessage::LivenessProbe));
    }

    #[tokio::test]
    async fn closed_receiver_fails_send() {
        let (sink, rx) = ChannelSink::new(4);
        drop(rx);
        assert_eq!(
            sink.send(ServerMessage::LivenessProbe).await,
            Err(SendError::Closed)
        );
    }
}
