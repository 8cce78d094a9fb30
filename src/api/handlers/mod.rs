//! Route handlers

pub mod account;
pub mod generations;
pub mod history;
pub mod jobs;
pub mod models;

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::types::HealthResponse;
use crate::AppState;

/// Liveness probe
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        models: state.registry.len(),
        sessions: state.sessions.len(),
    })
}
