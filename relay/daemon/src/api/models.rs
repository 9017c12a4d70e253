//! `GET /api/models`

use axum::extract::State;
use axum::Json;

use relay_core::ModelList;

use super::AppState;

/// List backend models, or the static fallback list when the backend fails
pub async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    Json(state.relay.available_models().await)
}
