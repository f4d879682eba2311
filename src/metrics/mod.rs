// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    REQUESTS_TOTAL,
    REQUEST_DURATION,
    FETCHES_TOTAL,
    NETWORK_FAILURES,
    CACHE_WRITES,
    CACHE_PARTITIONS,
    LIFECYCLE_EVENTS,
    PARTITIONS_SWEPT,
    ACTIVE_GENERATION,
};

/// Helper to record proxy request metrics
pub fn record_request(method: &str, status_code: u16, strategy: &str, source: &str, duration_secs: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status_code.to_string(), strategy])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[strategy, source])
        .observe(duration_secs);
}

/// Helper to record a resolved fetch event
pub fn record_fetch(strategy: &str, source: &str) {
    FETCHES_TOTAL.with_label_values(&[strategy, source]).inc();
}

/// Helper to record a network failure inside a strategy
pub fn record_network_failure(strategy: &str, outcome: &str) {
    NETWORK_FAILURES.with_label_values(&[strategy, outcome]).inc();
}

/// Helper to record cache writes
pub fn record_cache_write(partition: &str, stored: bool) {
    let result = if stored { "stored" } else { "failed" };
    CACHE_WRITES.with_label_values(&[partition, result]).inc();
}

pub fn update_partition_count(count: usize) {
    CACHE_PARTITIONS.with_label_values(&["total"]).set(count as f64);
}

/// Helper to record lifecycle events
pub fn record_lifecycle(event: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    LIFECYCLE_EVENTS.with_label_values(&[event, result]).inc();
}

pub fn record_sweep(deleted: bool) {
    let result = if deleted { "deleted" } else { "failed" };
    PARTITIONS_SWEPT.with_label_values(&[result]).inc();
}

pub fn set_active_generation(version: &str) {
    ACTIVE_GENERATION.reset();
    ACTIVE_GENERATION.with_label_values(&[version]).set(1.0);
}
