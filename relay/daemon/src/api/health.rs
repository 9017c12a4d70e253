//! `GET /health`

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;

/// One live relay as reported by the health endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    /// Short relay id, as it appears in the logs
    pub id: String,
    /// Model being streamed
    pub model: String,
    /// Seconds since the relay opened
    pub uptime_secs: u64,
}

/// Health report
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// Always `"ok"` while the daemon answers
    pub status: &'static str,
    /// `"reachable"` or `"unreachable"`
    pub backend: &'static str,
    /// Number of relays currently streaming
    pub active_streams: usize,
    /// The live relays, oldest first
    pub streams: Vec<StreamStatus>,
}

/// Report daemon and backend status
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let backend = if state.relay.backend_healthy().await {
        "reachable"
    } else {
        "unreachable"
    };

    let streams: Vec<StreamStatus> = state
        .relays
        .stats()
        .into_iter()
        .map(|(id, stats)| StreamStatus {
            id: id.to_string(),
            model: stats.model,
            uptime_secs: stats.uptime_secs,
        })
        .collect();

    Json(Health {
        status: "ok",
        backend,
        active_streams: streams.len(),
        streams,
    })
}
