// Prometheus metrics definitions for the panel backend.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Support commands waiting for crawler pickup.
    pub static ref DISPATCH_QUEUE_DEPTH: IntGauge =
        IntGauge::new("plemiona_dispatch_queue_depth", "Support commands waiting for pickup").unwrap();

    /// Game servers with a village-units snapshot on record.
    pub static ref TRACKED_SERVERS: IntGauge =
        IntGauge::new("plemiona_tracked_servers", "Servers with a units snapshot").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Allocation plans computed, by outcome (complete / short).
    pub static ref PLANS_COMPUTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("plemiona_plans_computed_total", "Allocation plans computed"),
        &["outcome"],
    )
    .unwrap();

    /// Support commands accepted into the dispatch queue.
    pub static ref SUPPORT_COMMANDS_QUEUED_TOTAL: IntCounter = IntCounter::new(
        "plemiona_support_commands_queued_total",
        "Support commands accepted into the queue",
    )
    .unwrap();

    /// Support commands dropped because the crawler never picked them up.
    pub static ref SUPPORT_COMMANDS_EXPIRED_TOTAL: IntCounter = IntCounter::new(
        "plemiona_support_commands_expired_total",
        "Stale support commands dropped unexecuted",
    )
    .unwrap();

    /// Village-units snapshots uploaded by the crawler.
    pub static ref SNAPSHOT_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "plemiona_snapshot_uploads_total",
        "Village-units snapshots uploaded",
    )
    .unwrap();

    /// Send requests rejected at validation, by reason.
    pub static ref SEND_REJECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("plemiona_send_rejections_total", "Send requests rejected"),
        &["reason"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(DISPATCH_QUEUE_DEPTH.clone()),
        Box::new(TRACKED_SERVERS.clone()),
        Box::new(PLANS_COMPUTED_TOTAL.clone()),
        Box::new(SUPPORT_COMMANDS_QUEUED_TOTAL.clone()),
        Box::new(SUPPORT_COMMANDS_EXPIRED_TOTAL.clone()),
        Box::new(SNAPSHOT_UPLOADS_TOTAL.clone()),
        Box::new(SEND_REJECTIONS_TOTAL.clone()),
    ];

    for c in collectors {
        REGISTRY.register(c).expect("failed to register metric");
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
