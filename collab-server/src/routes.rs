//! HTTP API routes for monitoring and state inspection.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

/// Operational counters for `/api/stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Projects with at least one attached session.
    pub active_projects: usize,
    /// Live WebSocket connections.
    pub total_connections: usize,
    /// Outstanding locks across all projects.
    pub total_locks: usize,
}

/// GET /api/stats - operational counters across all projects.
#[tracing::instrument(name = "get_stats", skip(state))]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.store.stats();
    Json(StatsResponse {
        active_projects: stats.active_projects,
        total_connections: state.registry.len(),
        total_locks: stats.total_locks,
    })
}

/// GET /api/projects/{project_id}/state - snapshot of one project.
///
/// Returns 404 when the project has no attached sessions (its state has
/// been garbage-collected or never existed).
#[tracing::instrument(name = "get_project_state", skip(state))]
pub async fn get_project_state(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    match state.store.snapshot(&project_id) {
        Some(snapshot) => (StatusCode::OK, Json(json!(snapshot))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No active collaboration for project {project_id}") })),
        ),
    }
}
