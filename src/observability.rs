use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: broadcasts performed.
pub const BROADCASTS_TOTAL: &str = "dayplanner_broadcasts_total";

/// Counter: frames handed to live connections.
pub const DELIVERIES_TOTAL: &str = "dayplanner_deliveries_total";

/// Counter: failed writes during broadcast (connection dropped afterwards).
pub const DELIVERY_FAILURES_TOTAL: &str = "dayplanner_delivery_failures_total";

/// Histogram: broadcast latency in seconds.
pub const BROADCAST_DURATION_SECONDS: &str = "dayplanner_broadcast_duration_seconds";

/// Counter: unread-counter updates that failed.
pub const UNREAD_FAILURES_TOTAL: &str = "dayplanner_unread_failures_total";

/// Histogram: day-plan layout time in seconds.
pub const LAYOUT_DURATION_SECONDS: &str = "dayplanner_layout_duration_seconds";

/// Counter: appointment sources that failed while gathering a day plan.
pub const SOURCE_FAILURES_TOTAL: &str = "dayplanner_source_failures_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: open TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "dayplanner_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "dayplanner_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "dayplanner_connections_rejected_total";

/// Gauge: connections currently registered for fan-out.
pub const CONNECTIONS_REGISTERED: &str = "dayplanner_connections_registered";

/// Counter: handshakes that failed or timed out.
pub const HANDSHAKE_FAILURES_TOTAL: &str = "dayplanner_handshake_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
