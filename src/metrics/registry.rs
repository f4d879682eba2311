// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // PROXY METRICS
    // ============================================================================

    /// Requests received by the proxy
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("proxy_requests_total", "Total number of proxied requests"),
        &["method", "status_code", "strategy"],
        REGISTRY
    ).unwrap();

    /// Request duration histogram
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("proxy_request_duration_seconds", "Proxied request duration in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["strategy", "source"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // STRATEGY METRICS
    // ============================================================================

    /// Fetch events resolved, by strategy and where the response came from
    pub static ref FETCHES_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("fetch_events_total", "Total fetch events resolved"),
        &["strategy", "source"], // source: network, cache, fallback
        REGISTRY
    ).unwrap();

    /// Network failures seen by strategies
    pub static ref NETWORK_FAILURES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("network_failures_total", "Total network failures inside strategies"),
        &["strategy", "outcome"], // outcome: recovered, surfaced, background
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache writes
    pub static ref CACHE_WRITES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_writes_total", "Total cache writes"),
        &["partition", "result"], // partition: static, dynamic; result: stored, failed
        REGISTRY
    ).unwrap();

    /// Current partitions in storage
    pub static ref CACHE_PARTITIONS: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_partitions_current", "Current number of cache partitions"),
        &["type"], // type: total
        REGISTRY
    ).unwrap();

    // ============================================================================
    // LIFECYCLE METRICS
    // ============================================================================

    /// Install / activate / message events
    pub static ref LIFECYCLE_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("lifecycle_events_total", "Total worker lifecycle events"),
        &["event", "result"], // event: install, restore, activate, skip_waiting
        REGISTRY
    ).unwrap();

    /// Partitions removed by activation sweeps
    pub static ref PARTITIONS_SWEPT: CounterVec = register_counter_vec_with_registry!(
        Opts::new("partitions_swept_total", "Total stale partitions handled by activation"),
        &["result"], // result: deleted, failed
        REGISTRY
    ).unwrap();

    /// Active generation (value 1 for the current version token)
    pub static ref ACTIVE_GENERATION: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("active_generation", "Version token of the active generation"),
        &["version"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
