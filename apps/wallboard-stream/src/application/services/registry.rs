//! Subscriber Registry & Broadcast Loop
//!
//! Owns the set of live subscribers and the periodic broadcast task.
//!
//! # Loop Lifecycle
//!
//! ```text
//!            register into empty registry
//!   Stopped ─────────────────────────────► Running
//!      ▲                                      │
//!      └──────────────────────────────────────┘
//!            unregister of last subscriber
//! ```
//!
//! Transitions are edge-triggered under the registry lock, so at most one
//! loop exists and it exists exactly while the registry is non-empty.
//! Stopping cancels the loop's token; the task exits at its next
//! suspension point and never broadcasts after cancellation.
//!
//! # Fan-out
//!
//! A broadcast copies the subscriber list, sends to every entry
//! concurrently and then unregisters the ones whose send failed. One dead
//! connection never prevents delivery to the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{SendError, SnapshotSource, SubscriberSink};
use crate::domain::streaming::{ServerMessage, SubscriptionScope};
use crate::domain::subscription::{BroadcastReport, LoopTransition, RegistryStatus, SubscriberId};
use crate::infrastructure::metrics;

// =============================================================================
// Settings
// =============================================================================

/// Timing of the periodic broadcast loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastLoopSettings {
    /// Delay between periodic pushes.
    pub interval: Duration,
    /// Delay after a failed build before the next attempt.
    pub error_backoff: Duration,
}

impl Default for BroadcastLoopSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            error_backoff: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Registry State
// =============================================================================

struct Subscriber {
    id: SubscriberId,
    sink: Arc<dyn SubscriberSink>,
    pending_close: AtomicBool,
    awaiting_initial: AtomicBool,
    scope: Mutex<SubscriptionScope>,
}

impl Subscriber {
    fn new(id: SubscriberId, sink: Arc<dyn SubscriberSink>) -> Self {
        Self {
            id,
            sink,
            pending_close: AtomicBool::new(false),
            awaiting_initial: AtomicBool::new(true),
            scope: Mutex::new(SubscriptionScope::All),
        }
    }
}

struct LoopHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct RegistryState {
    subscribers: HashMap<SubscriberId, Arc<Subscriber>>,
    broadcast_loop: Option<LoopHandle>,
}

struct Inner {
    source: Arc<dyn SnapshotSource>,
    settings: BroadcastLoopSettings,
    state: Mutex<RegistryState>,
    shutdown: CancellationToken,
    loop_starts: AtomicU64,
    loop_stops: AtomicU64,
}

/// Count of loop transitions since creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    /// Stopped → Running transitions.
    pub starts: u64,
    /// Running → Stopped transitions.
    pub stops: u64,
}

// =============================================================================
// Subscriber Registry
// =============================================================================

/// Shared handle to the subscriber registry.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<Inner>,
}

impl SubscriberRegistry {
    /// Create an empty registry. Cancelling `shutdown` stops the loop.
    #[must_use]
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        settings: BroadcastLoopSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                settings,
                state: Mutex::new(RegistryState::default()),
                shutdown,
                loop_starts: AtomicU64::new(0),
                loop_stops: AtomicU64::new(0),
            }),
        }
    }

    /// Register a subscriber and push it an initial snapshot.
    ///
    /// Starts the broadcast loop if this is the first subscriber. Periodic
    /// updates skip the subscriber until its initial snapshot has been
    /// delivered. If the initial push fails the subscriber is unregistered
    /// again.
    pub async fn register(&self, sink: Arc<dyn SubscriberSink>) -> SubscriberId {
        let id = SubscriberId::new();
        let subscriber = Arc::new(Subscriber::new(id, sink));

        let active = {
            let mut state = self.inner.state.lock();
            let before = state.subscribers.len();
            state.subscribers.insert(id, Arc::clone(&subscriber));
            let after = state.subscribers.len();
            if LoopTransition::between(before, after) == LoopTransition::Start {
                self.start_loop(&mut state);
            }
            after
        };
        metrics::set_subscribers(active);
        tracing::info!(subscriber_id = %id, active, "Subscriber registered");

        if let Err(e) = self.push_snapshot(&subscriber).await {
            tracing::debug!(subscriber_id = %id, error = %e, "Initial snapshot not delivered");
        }
        subscriber.awaiting_initial.store(false, Ordering::Release);
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    ///
    /// Stops the broadcast loop when the registry becomes empty.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let (removed, active) = {
            let mut state = self.inner.state.lock();
            let before = state.subscribers.len();
            let removed = state.subscribers.remove(&id).is_some();
            let after = state.subscribers.len();
            if LoopTransition::between(before, after) == LoopTransition::Stop {
                self.stop_loop(&mut state);
            }
            (removed, after)
        };

        if removed {
            metrics::set_subscribers(active);
            tracing::info!(subscriber_id = %id, active, "Subscriber unregistered");
        }
        removed
    }

    /// Send `message` to every registered subscriber.
    ///
    /// Subscribers still waiting for their initial snapshot are skipped.
    /// Subscribers whose send fails are unregistered after the pass.
    pub async fn broadcast(&self, message: ServerMessage) -> BroadcastReport {
        let subscribers: Vec<Arc<Subscriber>> = self
            .inner
            .state
            .lock()
            .subscribers
            .values()
            .filter(|s| {
                !s.pending_close.load(Ordering::Acquire) && !s.awaiting_initial.load(Ordering::Acquire)
            })
            .cloned()
            .collect();

        let sends = subscribers.iter().map(|subscriber| {
            let message = message.clone();
            async move { (subscriber, subscriber.sink.send(message).await) }
        });
        let results = join_all(sends).await;

        let mut report = BroadcastReport {
            attempted: subscribers.len(),
            ..BroadcastReport::default()
        };
        let mut failed = Vec::new();
        for (subscriber, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    subscriber.pending_close.store(true, Ordering::Release);
                    metrics::record_send_failure(e.kind());
                    tracing::warn!(subscriber_id = %subscriber.id, error = %e, "Broadcast send failed");
                    failed.push(subscriber.id);
                }
            }
        }
        metrics::record_messages_sent(message.kind(), report.delivered as u64);

        for id in failed {
            if self.unregister(id) {
                report.removed.push(id);
            }
        }
        report
    }

    /// Send `message` to one subscriber, unregistering it on failure.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] if the subscriber is not registered, or
    /// the sink's error if delivery fails.
    pub async fn send_to(&self, id: SubscriberId, message: ServerMessage) -> Result<(), SendError> {
        let subscriber = self.subscriber(id).ok_or(SendError::Closed)?;
        self.deliver(&subscriber, message).await
    }

    /// Build a snapshot and push it to one subscriber.
    ///
    /// A build failure is reported to the subscriber as an `error` message.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if the subscriber is gone or delivery fails.
    pub async fn refresh(&self, id: SubscriberId) -> Result<(), SendError> {
        let subscriber = self.subscriber(id).ok_or(SendError::Closed)?;
        self.push_snapshot(&subscriber).await
    }

    /// Record a subscriber's scope and reply with the narrowed view.
    ///
    /// Periodic broadcasts are unaffected. No reply is sent for
    /// [`SubscriptionScope::All`].
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if the subscriber is gone or delivery fails.
    pub async fn resubscribe(
        &self,
        id: SubscriberId,
        scope: SubscriptionScope,
    ) -> Result<(), SendError> {
        let subscriber = self.subscriber(id).ok_or(SendError::Closed)?;
        *subscriber.scope.lock() = scope;
        tracing::debug!(subscriber_id = %id, scope = %scope, "Subscriber scope changed");

        if !scope.is_narrowed() {
            return Ok(());
        }

        let message = match self.inner.source.build_snapshot().await {
            Ok(snapshot) => match ServerMessage::scoped(scope, &snapshot) {
                Some(message) => message,
                None => return Ok(()),
            },
            Err(e) => {
                tracing::warn!(subscriber_id = %id, error = %e, "Scoped snapshot build failed");
                ServerMessage::Error {
                    message: format!("Failed to fetch snapshot: {e}"),
                }
            }
        };
        self.deliver(&subscriber, message).await
    }

    /// Declared scope of a subscriber.
    #[must_use]
    pub fn scope(&self, id: SubscriberId) -> Option<SubscriptionScope> {
        self.subscriber(id).map(|s| *s.scope.lock())
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner.state.lock().subscribers.contains_key(&id)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    /// Whether no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the broadcast loop is running.
    #[must_use]
    pub fn is_broadcasting(&self) -> bool {
        self.inner.state.lock().broadcast_loop.is_some()
    }

    /// Subscriber count and loop state.
    #[must_use]
    pub fn status(&self) -> RegistryStatus {
        let state = self.inner.state.lock();
        RegistryStatus {
            active_connections: state.subscribers.len(),
            broadcasting: state.broadcast_loop.is_some(),
        }
    }

    /// Loop transition counters.
    #[must_use]
    pub fn loop_stats(&self) -> LoopStats {
        LoopStats {
            starts: self.inner.loop_starts.load(Ordering::Relaxed),
            stops: self.inner.loop_stops.load(Ordering::Relaxed),
        }
    }

    /// Stop the loop and release every subscriber.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let (handle, released) = {
            let mut state = self.inner.state.lock();
            let released = state.subscribers.len();
            state.subscribers.clear();
            let handle = state.broadcast_loop.take();
            if handle.is_some() {
                self.inner.loop_stops.fetch_add(1, Ordering::Relaxed);
            }
            (handle, released)
        };
        metrics::set_subscribers(0);
        metrics::set_loop_running(false);

        if let Some(handle) = handle {
            handle.cancel.cancel();
            if let Err(e) = handle.task.await {
                tracing::warn!(error = %e, "Broadcast loop task ended abnormally");
            }
        }
        tracing::info!(released, "Subscriber registry shut down");
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn subscriber(&self, id: SubscriberId) -> Option<Arc<Subscriber>> {
        self.inner.state.lock().subscribers.get(&id).cloned()
    }

    async fn push_snapshot(&self, subscriber: &Arc<Subscriber>) -> Result<(), SendError> {
        let message = match self.inner.source.build_snapshot().await {
            Ok(snapshot) => ServerMessage::Snapshot { data: snapshot },
            Err(e) => {
                tracing::warn!(subscriber_id = %subscriber.id, error = %e, "On-demand snapshot build failed");
                ServerMessage::Error {
                    message: format!("Failed to fetch snapshot: {e}"),
                }
            }
        };
        self.deliver(subscriber, message).await
    }

    async fn deliver(
        &self,
        subscriber: &Arc<Subscriber>,
        message: ServerMessage,
    ) -> Result<(), SendError> {
        let kind = message.kind();
        match subscriber.sink.send(message).await {
            Ok(()) => {
                metrics::record_messages_sent(kind, 1);
                Ok(())
            }
            Err(e) => {
                subscriber.pending_close.store(true, Ordering::Release);
                metrics::record_send_failure(e.kind());
                tracing::warn!(subscriber_id = %subscriber.id, error = %e, message_type = kind, "Send failed");
                self.unregister(subscriber.id);
                Err(e)
            }
        }
    }

    fn start_loop(&self, state: &mut RegistryState) {
        if state.broadcast_loop.is_some() || self.inner.shutdown.is_cancelled() {
            return;
        }

        let cancel = self.inner.shutdown.child_token();
        let task = tokio::spawn(run_broadcast_loop(
            Arc::downgrade(&self.inner),
            cancel.clone(),
            self.inner.settings,
        ));
        state.broadcast_loop = Some(LoopHandle { cancel, task });
        self.inner.loop_starts.fetch_add(1, Ordering::Relaxed);
        metrics::set_loop_running(true);
    }

    fn stop_loop(&self, state: &mut RegistryState) {
        let Some(handle) = state.broadcast_loop.take() else {
            return;
        };
        handle.cancel.cancel();
        self.inner.loop_stops.fetch_add(1, Ordering::Relaxed);
        metrics::set_loop_running(false);
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("SubscriberRegistry")
            .field("active_connections", &status.active_connections)
            .field("broadcasting", &status.broadcasting)
            .field("settings", &self.inner.settings)
            .finish()
    }
}

// =============================================================================
// Broadcast Loop
// =============================================================================

/// Periodic body: wait, build, broadcast `update`. Ends only on cancellation.
///
/// The first push happens one interval after start; new subscribers get
/// their initial snapshot from [`SubscriberRegistry::register`].
async fn run_broadcast_loop(
    inner: Weak<Inner>,
    cancel: CancellationToken,
    settings: BroadcastLoopSettings,
) {
    tracing::info!(interval_secs = settings.interval.as_secs(), "Broadcast loop started");
    let mut delay = settings.interval;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        let Some(inner) = inner.upgrade() else {
            break;
        };
        let registry = SubscriberRegistry { inner };

        let built = tokio::select! {
            () = cancel.cancelled() => break,
            built = registry.inner.source.build_snapshot() => built,
        };

        match built {
            Ok(snapshot) => {
                if cancel.is_cancelled() {
                    break;
                }
                let report = registry.broadcast(ServerMessage::Update { data: snapshot }).await;
                tracing::debug!(
                    attempted = report.attempted,
                    delivered = report.delivered,
                    removed = report.removed.len(),
                    "Broadcast pass complete"
                );
                delay = settings.interval;
            }
            Err(e) => {
                metrics::record_loop_fault();
                tracing::error!(
                    error = %e,
                    backoff_secs = settings.error_backoff.as_secs(),
                    "Broadcast loop iteration failed"
                );
                delay = settings.error_backoff;
            }
        }
    }

    tracing::info!("Broadcast loop stopped");
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::application::ports::SnapshotError;
    use crate::domain::market::{MarketStatus, Snapshot};
    use crate::infrastructure::websocket::ChannelSink;

    const INTERVAL: Duration = Duration::from_secs(15);
    const BACKOFF: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct ScriptedSource {
        fail: AtomicBool,
        builds: AtomicUsize,
    }

    impl ScriptedSource {
        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn builds(&self) -> usize {
            self.builds.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn build_snapshot(&self) -> Result<Arc<Snapshot>, SnapshotError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(SnapshotError::BuildFailed {
                    message: "provider down".to_string(),
                });
            }
            Ok(Arc::new(Snapshot::empty(Utc::now(), MarketStatus::Open)))
        }
    }

    fn registry() -> (SubscriberRegistry, Arc<ScriptedSource>) {
        let source = Arc::new(ScriptedSource::default());
        let registry = SubscriberRegistry::new(
            source.clone(),
            BroadcastLoopSettings {
                interval: INTERVAL,
                error_backoff: BACKOFF,
            },
            CancellationToken::new(),
        );
        (registry, source)
    }

    fn channel() -> (Arc<dyn SubscriberSink>, mpsc::Receiver<ServerMessage>) {
        let (sink, rx) = ChannelSink::new(16);
        (Arc::new(sink), rx)
    }

    fn closed_channel() -> Arc<dyn SubscriberSink> {
        let (sink, rx) = ChannelSink::new(16);
        drop(rx);
        Arc::new(sink)
    }

    async fn next(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
        timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed")
    }

    // -------------------------------------------------------------------------
    // Registration and loop transitions
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn register_pushes_initial_snapshot_before_any_tick() {
        let (registry, _source) = registry();
        let (sink, mut rx) = channel();

        registry.register(sink).await;

        let message = rx.try_recv().unwrap();
        assert_eq!(message.kind(), "snapshot");
        assert!(rx.try_recv().is_err());
    }

    struct SlowSource {
        build_time: Duration,
    }

    #[async_trait]
    impl SnapshotSource for SlowSource {
        async fn build_snapshot(&self) -> Result<Arc<Snapshot>, SnapshotError> {
            tokio::time::sleep(self.build_time).await;
            Ok(Arc::new(Snapshot::empty(Utc::now(), MarketStatus::Open)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_subscriber_gets_snapshot_before_in_flight_update() {
        let registry = SubscriberRegistry::new(
            Arc::new(SlowSource {
                build_time: Duration::from_secs(10),
            }),
            BroadcastLoopSettings {
                interval: INTERVAL,
                error_backoff: BACKOFF,
            },
            CancellationToken::new(),
        );
        let start = tokio::time::Instant::now();

        let (a, mut rx_a) = channel();
        registry.register(a).await;
        assert_eq!(next(&mut rx_a).await.kind(), "snapshot");

        // The loop's first build runs from t=15s to t=25s.
        tokio::time::sleep_until(start + Duration::from_secs(20)).await;
        let (b, mut rx_b) = channel();
        registry.register(b).await;

        assert_eq!(next(&mut rx_a).await.kind(), "update");
        assert_eq!(next(&mut rx_b).await.kind(), "snapshot");
        assert_eq!(next(&mut rx_b).await.kind(), "update");
    }

    #[tokio::test(start_paused = true)]
    async fn first_subscriber_starts_loop_once() {
        let (registry, _source) = registry();
        assert!(!registry.is_broadcasting());

        let (a, _rx_a) = channel();
        let (b, _rx_b) = channel();
        registry.register(a).await;
        assert!(registry.is_broadcasting());
        registry.register(b).await;

        assert_eq!(registry.loop_stats(), LoopStats { starts: 1, stops: 0 });
        assert_eq!(
            registry.status(),
            RegistryStatus {
                active_connections: 2,
                broadcasting: true
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn last_unregister_stops_loop_once() {
        let (registry, _source) = registry();
        let (a, _rx_a) = channel();
        let (b, _rx_b) = channel();
        let id_a = registry.register(a).await;
        let id_b = registry.register(b).await;

        assert!(registry.unregister(id_a));
        assert!(registry.is_broadcasting());
        assert!(registry.unregister(id_b));
        assert!(!registry.is_broadcasting());
        assert!(!registry.unregister(id_b));

        assert_eq!(registry.loop_stats(), LoopStats { starts: 1, stops: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn reoccupied_registry_starts_a_new_loop() {
        let (registry, _source) = registry();
        let (a, _rx_a) = channel();
        let id = registry.register(a).await;
        registry.unregister(id);

        let (b, _rx_b) = channel();
        registry.register(b).await;

        assert_eq!(registry.loop_stats(), LoopStats { starts: 2, stops: 1 });
        assert!(registry.is_broadcasting());
    }

    // -------------------------------------------------------------------------
    // Periodic broadcast
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn loop_pushes_updates_on_interval() {
        let (registry, _source) = registry();
        let (sink, mut rx) = channel();
        registry.register(sink).await;
        assert_eq!(next(&mut rx).await.kind(), "snapshot");

        let started = tokio::time::Instant::now();
        assert_eq!(next(&mut rx).await.kind(), "update");
        assert!(started.elapsed() >= INTERVAL);
        assert_eq!(next(&mut rx).await.kind(), "update");
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_cease_after_stop() {
        let (registry, source) = registry();
        let (sink, mut rx) = channel();
        let id = registry.register(sink).await;
        assert_eq!(next(&mut rx).await.kind(), "snapshot");
        assert_eq!(next(&mut rx).await.kind(), "update");

        registry.unregister(id);
        let builds = source.builds();
        tokio::time::sleep(INTERVAL * 4).await;

        assert_eq!(source.builds(), builds);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_survives_build_failures() {
        let (registry, source) = registry();
        let (sink, mut rx) = channel();
        registry.register(sink).await;
        assert_eq!(next(&mut rx).await.kind(), "snapshot");

        source.set_failing(true);
        tokio::time::sleep(INTERVAL + BACKOFF * 2 + Duration::from_millis(1)).await;
        assert!(source.builds() >= 3);
        assert!(rx.try_recv().is_err());
        assert!(registry.is_broadcasting());

        source.set_failing(false);
        assert_eq!(next(&mut rx).await.kind(), "update");
    }

    #[tokio::test(start_paused = true)]
    async fn one_pass_shares_one_snapshot_instance() {
        let (registry, _source) = registry();
        let (a, mut rx_a) = channel();
        let (b, mut rx_b) = channel();
        registry.register(a).await;
        registry.register(b).await;
        next(&mut rx_a).await;
        next(&mut rx_b).await;

        let (ServerMessage::Update { data: first }, ServerMessage::Update { data: second }) =
            (next(&mut rx_a).await, next(&mut rx_b).await)
        else {
            panic!("expected updates");
        };
        assert!(Arc::ptr_eq(&first, &second));
    }

    // -------------------------------------------------------------------------
    // Fan-out failure isolation
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn broadcast_isolates_failed_subscriber() {
        let (registry, _source) = registry();
        let (a, mut rx_a) = channel();
        let (b, mut rx_b) = channel();
        registry.register(a).await;
        registry.register(b).await;

        let (dead_sink, dead_rx) = ChannelSink::new(16);
        let dead = registry.register(Arc::new(dead_sink)).await;
        drop(dead_rx);
        assert_eq!(registry.len(), 3);

        next(&mut rx_a).await;
        next(&mut rx_b).await;
        let snapshot = Arc::new(Snapshot::empty(Utc::now(), MarketStatus::Open));
        let report = registry.broadcast(ServerMessage::Update { data: snapshot }).await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.removed, vec![dead]);
        assert_eq!(registry.len(), 2);
        assert_eq!(next(&mut rx_a).await.kind(), "update");
        assert_eq!(next(&mut rx_b).await.kind(), "update");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_initial_push_unregisters() {
        let (registry, _source) = registry();

        let id = registry.register(closed_channel()).await;

        assert!(!registry.contains(id));
        assert!(!registry.is_broadcasting());
        assert_eq!(registry.loop_stats(), LoopStats { starts: 1, stops: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_counts_as_failure() {
        let (registry, _source) = registry();
        let (sink, _rx) = ChannelSink::new(1);
        let id = registry.register(Arc::new(sink)).await;
        assert!(registry.contains(id));

        let result = registry.send_to(id, ServerMessage::LivenessProbe).await;

        assert_eq!(result, Err(SendError::QueueFull));
        assert!(!registry.contains(id));
    }

    // -------------------------------------------------------------------------
    // Single-subscriber replies
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn refresh_failure_reports_error_and_keeps_subscriber() {
        let (registry, source) = registry();
        let (sink, mut rx) = channel();
        let id = registry.register(sink).await;
        next(&mut rx).await;

        source.set_failing(true);
        registry.refresh(id).await.unwrap();

        let ServerMessage::Error { message } = next(&mut rx).await else {
            panic!("expected error message");
        };
        assert!(message.contains("provider down"));
        assert!(registry.contains(id));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_pushes_snapshot() {
        let (registry, _source) = registry();
        let (sink, mut rx) = channel();
        let id = registry.register(sink).await;
        next(&mut rx).await;

        registry.refresh(id).await.unwrap();

        assert_eq!(next(&mut rx).await.kind(), "snapshot");
    }

    #[tokio::test(start_paused = true)]
    async fn narrowed_resubscribe_replies_with_scoped_view() {
        let (registry, _source) = registry();
        let (sink, mut rx) = channel();
        let id = registry.register(sink).await;
        next(&mut rx).await;

        registry
            .resubscribe(id, SubscriptionScope::AShares)
            .await
            .unwrap();

        assert_eq!(registry.scope(id), Some(SubscriptionScope::AShares));
        assert_eq!(next(&mut rx).await.kind(), "scoped-data");
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribe_to_all_sends_nothing() {
        let (registry, _source) = registry();
        let (sink, mut rx) = channel();
        let id = registry.register(sink).await;
        next(&mut rx).await;

        registry.resubscribe(id, SubscriptionScope::All).await.unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(registry.scope(id), Some(SubscriptionScope::All));
    }

    #[tokio::test(start_paused = true)]
    async fn scope_does_not_narrow_broadcasts() {
        let (registry, _source) = registry();
        let (sink, mut rx) = channel();
        let id = registry.register(sink).await;
        next(&mut rx).await;
        registry
            .resubscribe(id, SubscriptionScope::AShares)
            .await
            .unwrap();
        next(&mut rx).await;

        assert_eq!(next(&mut rx).await.kind(), "update");
    }

    #[tokio::test]
    async fn replies_to_unknown_subscriber_fail_closed() {
        let (registry, _source) = registry();
        let id = SubscriberId::new();

        assert_eq!(registry.refresh(id).await, Err(SendError::Closed));
        assert_eq!(
            registry.send_to(id, ServerMessage::LivenessAck).await,
            Err(SendError::Closed)
        );
    }

    // -------------------------------------------------------------------------
    // Shutdown
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_subscribers_and_stops_loop() {
        let (registry, _source) = registry();
        let (a, mut rx) = channel();
        registry.register(a).await;
        next(&mut rx).await;

        registry.shutdown().await;

        assert!(registry.is_empty());
        assert!(!registry.is_broadcasting());
        assert_eq!(rx.recv().await.map(|m| m.kind()), None);
    }
}
