//! Prometheus metrics for the collaboration server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const WS_CONNECTIONS_ACTIVE: &str = "collab_ws_connections_active";
const EVENTS_TOTAL: &str = "collab_events_total";
const LOCK_CONFLICTS_TOTAL: &str = "collab_lock_conflicts_total";
const SESSIONS_SWEPT_TOTAL: &str = "collab_sessions_swept_total";
const LOCKS_EXPIRED_TOTAL: &str = "collab_locks_expired_total";
const VALIDATION_FAILURES_TOTAL: &str = "collab_validation_failures_total";
const PROJECTS_ACTIVE: &str = "collab_projects_active";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Increment active WebSocket connections.
pub fn inc_ws_connections() {
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement active WebSocket connections.
pub fn dec_ws_connections() {
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a routed collaboration event.
///
/// # Arguments
///
/// * `event_type` - Wire tag of the event (e.g. "cursor_move", "project_lock")
pub fn record_event(event_type: &str) {
    counter!(
        EVENTS_TOTAL,
        "type" => event_type.to_string()
    )
    .increment(1);
}

/// Record a rejected mutation or lock request.
pub fn record_lock_conflict() {
    counter!(LOCK_CONFLICTS_TOTAL).increment(1);
}

/// Record sessions evicted by the liveness sweeper.
pub fn record_sessions_swept(count: usize) {
    counter!(SESSIONS_SWEPT_TOTAL).increment(count as u64);
}

/// Record locks dropped because they expired.
pub fn record_locks_expired(count: usize) {
    counter!(LOCKS_EXPIRED_TOTAL).increment(count as u64);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (project_id, user_id, event, ...)
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

/// Update the active project gauge (refreshed on each sweep).
#[allow(clippy::cast_precision_loss)]
pub fn set_active_projects(count: usize) {
    gauge!(PROJECTS_ACTIVE).set(count as f64);
}
