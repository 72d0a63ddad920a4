//! WebSocket Connection
//!
//! Bridges one upgraded socket to a [`SubscriberSession`]: a writer task
//! drains the connection's [`ChannelSink`] into the socket while the
//! session consumes inbound frames.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;

use super::ChannelSink;
use crate::application::services::{
    InboundEvent, SessionSettings, SnapshotService, SubscriberSession,
};

/// Per-connection transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Outbound queue length before sends are treated as failed.
    pub queue_capacity: usize,
    /// Session settings.
    pub session: SessionSettings,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            session: SessionSettings::default(),
        }
    }
}

/// Serve one upgraded WebSocket until either side closes or `shutdown` fires.
pub async fn serve_socket(
    socket: WebSocket,
    service: SnapshotService,
    settings: ConnectionSettings,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, ws_rx) = socket.split();
    let (sink, mut outbound) = ChannelSink::new(settings.queue_capacity);
    let cancel = shutdown.child_token();

    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                () = writer_cancel.cancelled() => break,
                message = outbound.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, message_type = message.kind(), "Failed to encode message");
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                tracing::debug!(error = %e, "WebSocket write failed");
                break;
            }
        }
        let _ = ws_tx.close().await;
        writer_cancel.cancel();
    });

    let id = service.subscribe(Arc::new(sink)).await;

    let inbound = Box::pin(ws_rx.filter_map(|frame| async move {
        match frame {
            Ok(Message::Text(text)) => Some(InboundEvent::Text(text.as_str().to_owned())),
            Ok(Message::Close(_)) | Err(_) => Some(InboundEvent::Closed),
            Ok(_) => None,
        }
    }));

    SubscriberSession::new(service, id, settings.session)
        .run(inbound, cancel.clone())
        .await;

    cancel.cancel();
    if let Err(e) = writer.await {
        tracing::warn!(subscriber_id = %id, error = %e, "WebSocket writer task failed");
    }
    tracing::debug!(subscriber_id = %id, "WebSocket connection closed");
}
