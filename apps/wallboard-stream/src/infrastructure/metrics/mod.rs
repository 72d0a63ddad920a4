//! Prometheus Metrics Module
//!
//! # Metrics Categories
//!
//! - **Snapshots**: build counts and durations
//! - **Categories**: upstream fetch outcomes and cache lookups
//! - **Subscribers**: registry size, loop state, messages pushed, send failures
//!
//! Metrics are exposed at `/metrics` on the HTTP port. Recording before
//! [`init_metrics`] is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::market::Category;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder was already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "wallboard_snapshot_builds_total",
        "Total snapshots built by the aggregator"
    );
    describe_histogram!(
        "wallboard_snapshot_build_seconds",
        "Time to build a complete snapshot"
    );

    describe_counter!(
        "wallboard_category_fetches_total",
        "Upstream category fetches by outcome"
    );
    describe_histogram!(
        "wallboard_category_fetch_seconds",
        "Upstream category fetch latency"
    );
    describe_counter!(
        "wallboard_cache_lookups_total",
        "Freshness cache lookups by result"
    );
    describe_counter!(
        "wallboard_cache_store_errors_total",
        "Persistent cache store failures by operation"
    );

    describe_gauge!("wallboard_subscribers", "Registered WebSocket subscribers");
    describe_gauge!(
        "wallboard_broadcast_loop_running",
        "1 while the periodic broadcast loop is running"
    );
    describe_counter!(
        "wallboard_messages_sent_total",
        "Messages delivered to subscribers by type"
    );
    describe_counter!(
        "wallboard_send_failures_total",
        "Failed subscriber sends by reason"
    );
    describe_counter!(
        "wallboard_inbound_messages_total",
        "Inbound subscriber messages by type"
    );
    describe_counter!(
        "wallboard_loop_faults_total",
        "Broadcast loop iterations that failed to build a snapshot"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Result of an upstream fetch.
#[derive(Debug, Clone, Copy)]
pub enum FetchOutcome {
    /// Provider returned data.
    Success,
    /// Provider failed.
    Failure,
}

impl FetchOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// How a freshness cache lookup was served.
#[derive(Debug, Clone, Copy)]
pub enum CacheLookup {
    /// Served from the persistent store.
    StoreHit,
    /// Served from the in-memory record.
    MemoryHit,
    /// Required an upstream fetch.
    Miss,
    /// Caching disabled.
    Bypass,
}

impl CacheLookup {
    const fn as_str(self) -> &'static str {
        match self {
            Self::StoreHit => "store_hit",
            Self::MemoryHit => "memory_hit",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
        }
    }
}

/// Cache store operation.
#[derive(Debug, Clone, Copy)]
pub enum StoreOperation {
    /// Read.
    Get,
    /// Write.
    Set,
    /// Stored entry could not be decoded.
    Decode,
}

impl StoreOperation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Decode => "decode",
        }
    }
}

/// Record a completed snapshot build.
pub fn record_snapshot_build(duration: Duration) {
    counter!("wallboard_snapshot_builds_total").increment(1);
    histogram!("wallboard_snapshot_build_seconds").record(duration.as_secs_f64());
}

/// Record an upstream category fetch.
pub fn record_category_fetch(category: Category, outcome: FetchOutcome, duration: Duration) {
    counter!(
        "wallboard_category_fetches_total",
        "category" => category.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(
        "wallboard_category_fetch_seconds",
        "category" => category.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record how a cache lookup was served.
pub fn record_cache_lookup(category: Category, lookup: CacheLookup) {
    counter!(
        "wallboard_cache_lookups_total",
        "category" => category.as_str(),
        "result" => lookup.as_str()
    )
    .increment(1);
}

/// Record a persistent cache store failure.
pub fn record_cache_store_error(operation: StoreOperation) {
    counter!(
        "wallboard_cache_store_errors_total",
        "operation" => operation.as_str()
    )
    .increment(1);
}

/// Update the registered subscriber count.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscribers(count: usize) {
    gauge!("wallboard_subscribers").set(count as f64);
}

/// Update the broadcast loop state.
pub fn set_loop_running(running: bool) {
    gauge!("wallboard_broadcast_loop_running").set(if running { 1.0 } else { 0.0 });
}

/// Record messages delivered to subscribers.
pub fn record_messages_sent(message_type: &'static str, count: u64) {
    counter!(
        "wallboard_messages_sent_total",
        "message_type" => message_type
    )
    .increment(count);
}

/// Record a failed subscriber send.
pub fn record_send_failure(reason: &'static str) {
    counter!(
        "wallboard_send_failures_total",
        "reason" => reason
    )
    .increment(1);
}

/// Record an inbound subscriber message.
pub fn record_inbound_message(message_type: &'static str) {
    counter!(
        "wallboard_inbound_messages_total",
        "message_type" => message_type
    )
    .increment(1);
}

/// Record a broadcast loop fault.
pub fn record_loop_fault() {
    counter!("wallboard_loop_faults_total").increment(1);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_names() {
        assert_eq!(FetchOutcome::Success.as_str(), "success");
        assert_eq!(FetchOutcome::Failure.as_str(), "failure");
        assert_eq!(CacheLookup::StoreHit.as_str(), "store_hit");
        assert_eq!(CacheLookup::MemoryHit.as_str(), "memory_hit");
        assert_eq!(CacheLookup::Miss.as_str(), "miss");
        assert_eq!(CacheLookup::Bypass.as_str(), "bypass");
        assert_eq!(StoreOperation::Decode.as_str(), "decode");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_snapshot_build(Duration::from_millis(5));
        record_category_fetch(Category::Fx, FetchOutcome::Success, Duration::ZERO);
        set_subscribers(3);
        set_loop_running(true);
    }
}
