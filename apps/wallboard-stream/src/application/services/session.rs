//! Subscriber Session
//!
//! Drives one connection's inbound side: control messages go to the
//! facade, an idle window elicits a liveness probe, and the subscriber is
//! unregistered when the stream ends or a reply cannot be delivered.

use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::SnapshotService;
use crate::domain::subscription::SubscriberId;

/// Inbound frame as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Text frame.
    Text(String),
    /// Peer closed the connection.
    Closed,
}

/// Per-connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Wait for inbound traffic before sending a liveness probe.
    pub idle_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Inbound handler for one registered subscriber.
#[derive(Debug)]
pub struct SubscriberSession {
    service: SnapshotService,
    id: SubscriberId,
    settings: SessionSettings,
}

impl SubscriberSession {
    /// Create a session for an already registered subscriber.
    #[must_use]
    pub const fn new(service: SnapshotService, id: SubscriberId, settings: SessionSettings) -> Self {
        Self {
            service,
            id,
            settings,
        }
    }

    /// Subscriber this session serves.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Process `inbound` until it ends, a reply fails or `cancel` fires.
    /// Always unregisters the subscriber on return.
    pub async fn run<S>(self, mut inbound: S, cancel: CancellationToken)
    where
        S: Stream<Item = InboundEvent> + Unpin,
    {
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => break,
                next = tokio::time::timeout(self.settings.idle_timeout, inbound.next()) => next,
            };

            let delivered = match next {
                Err(_) => {
                    tracing::debug!(subscriber_id = %self.id, "Subscriber idle, sending liveness probe");
                    self.service.probe(self.id).await
                }
                Ok(Some(InboundEvent::Text(text))) => self.service.handle_text(self.id, &text).await,
                Ok(Some(InboundEvent::Closed) | None) => break,
            };

            if let Err(e) = delivered {
                tracing::debug!(subscriber_id = %self.id, error = %e, "Closing session after failed send");
                break;
            }
        }

        self.service.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::channel::mpsc as inbound;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::application::ports::SnapshotSource;
    use crate::application::services::{
        BroadcastLoopSettings, CacheTtl, CategoryFetcher, FreshnessCache, SnapshotAggregator,
        SubscriberRegistry,
    };
    use crate::domain::market::MarketHours;
    use crate::domain::streaming::ServerMessage;
    use crate::infrastructure::providers::FixtureProvider;
    use crate::infrastructure::websocket::ChannelSink;

    const IDLE: Duration = Duration::from_secs(30);

    fn service() -> SnapshotService {
        let provider = Arc::new(FixtureProvider::with_sample_data());
        let cache = FreshnessCache::new(CategoryFetcher::new(provider), None, CacheTtl::Disabled);
        let source: Arc<dyn SnapshotSource> = Arc::new(SnapshotAggregator::new(
            Arc::new(cache),
            MarketHours::default(),
        ));
        let registry = SubscriberRegistry::new(
            Arc::clone(&source),
            BroadcastLoopSettings {
                interval: Duration::from_secs(600),
                error_backoff: Duration::from_secs(5),
            },
            CancellationToken::new(),
        );
        SnapshotService::new(source, registry)
    }

    struct Harness {
        service: SnapshotService,
        id: SubscriberId,
        to_session: inbound::UnboundedSender<InboundEvent>,
        from_session: mpsc::Receiver<ServerMessage>,
        cancel: CancellationToken,
        task: tokio::task::JoinHandle<()>,
    }

    async fn start() -> Harness {
        let service = service();
        let (sink, mut from_session) = ChannelSink::new(16);
        let id = service.subscribe(Arc::new(sink)).await;
        assert_eq!(from_session.recv().await.unwrap().kind(), "snapshot");

        let (to_session, stream) = inbound::unbounded();
        let cancel = CancellationToken::new();
        let session = SubscriberSession::new(
            service.clone(),
            id,
            SessionSettings { idle_timeout: IDLE },
        );
        let task = tokio::spawn(session.run(stream, cancel.clone()));

        Harness {
            service,
            id,
            to_session,
            from_session,
            cancel,
            task,
        }
    }

    async fn next_kind(rx: &mut mpsc::Receiver<ServerMessage>) -> &'static str {
        timeout(Duration::from_secs(120), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed")
            .kind()
    }

    fn send(harness: &Harness, text: &str) {
        harness
            .to_session
            .unbounded_send(InboundEvent::Text(text.to_string()))
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn idle_subscriber_receives_probe_and_probe_gets_ack() {
        let mut h = start().await;

        let started = tokio::time::Instant::now();
        assert_eq!(next_kind(&mut h.from_session).await, "liveness-probe");
        assert!(started.elapsed() >= IDLE);

        send(&h, r#"{"type":"liveness-probe"}"#);
        assert_eq!(next_kind(&mut h.from_session).await, "liveness-ack");
        assert!(h.service.registry().contains(h.id));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_messages_are_ignored() {
        let mut h = start().await;

        send(&h, "garbage");
        send(&h, r#"{"type":"teleport"}"#);
        send(&h, r#"{"type":"refresh-request"}"#);

        assert_eq!(next_kind(&mut h.from_session).await, "snapshot");
        assert!(h.service.registry().contains(h.id));
    }

    #[tokio::test(start_paused = true)]
    async fn legacy_subscribe_gets_scoped_reply() {
        let mut h = start().await;

        send(&h, r#"{"type":"subscribe","subscription":"a-shares"}"#);

        assert_eq!(next_kind(&mut h.from_session).await, "scoped-data");
    }

    #[tokio::test(start_paused = true)]
    async fn close_unregisters_subscriber() {
        let h = start().await;

        h.to_session.unbounded_send(InboundEvent::Closed).unwrap();
        h.task.await.unwrap();

        assert!(!h.service.registry().contains(h.id));
        assert!(!h.service.status().broadcasting);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_stream_unregisters_subscriber() {
        let Harness {
            service,
            id,
            to_session,
            task,
            ..
        } = start().await;

        drop(to_session);
        task.await.unwrap();

        assert!(!service.registry().contains(id));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_session() {
        let h = start().await;

        h.cancel.cancel();
        h.task.await.unwrap();

        assert_eq!(h.service.status().active_connections, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_ends_session() {
        let h = start().await;
        let Harness {
            service,
            id,
            from_session,
            task,
            to_session: _keep_open,
            ..
        } = h;

        drop(from_session);
        timeout(IDLE * 2, task).await.unwrap().unwrap();

        assert!(!service.registry().contains(id));
    }
}
