use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: schedule requests. Labels: outcome (committed, rescheduled, or an
/// error label).
pub const SCHEDULE_REQUESTS_TOTAL: &str = "allot_schedule_requests_total";

/// Counter: requests committed at a window other than the requested one.
pub const RESCHEDULES_TOTAL: &str = "allot_reschedules_total";

/// Histogram: slot search latency in seconds.
pub const SLOT_SEARCH_DURATION_SECONDS: &str = "allot_slot_search_duration_seconds";

/// Counter: events removed by retention purges.
pub const EVENTS_PURGED_TOTAL: &str = "allot_events_purged_total";

// ── USE metrics ─────────────────────────────────────────────────

/// Gauge: events currently held in the registry.
pub const EVENTS_REGISTERED: &str = "allot_events_registered";

/// Histogram: snapshot save duration in seconds.
pub const SNAPSHOT_SAVE_DURATION_SECONDS: &str = "allot_snapshot_save_duration_seconds";

/// Counter: failed snapshot saves.
pub const SNAPSHOT_FAILURES_TOTAL: &str = "allot_snapshot_failures_total";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
