//! Prometheus metrics recorder and metric-name constants.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` path.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Handshake refusals total (counter).
pub const WS_HANDSHAKE_FAILURES_TOTAL: &str = "ws_handshake_failures_total";
/// Successful joins total (counter).
pub const CHAT_JOINS_TOTAL: &str = "chat_joins_total";
/// Relayed chat lines total (counter).
pub const CHAT_MESSAGES_TOTAL: &str = "chat_messages_total";
/// Room-wide fan-outs total (counter).
pub const CHAT_BROADCASTS_TOTAL: &str = "chat_broadcasts_total";
/// Plain HTTP (non-upgrade) requests total (counter).
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
