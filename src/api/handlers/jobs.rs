//! Job inspection and control endpoints

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::api::types::{ClearResponse, JobFilter, JobsQuery, ListResponse};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::queue::GenerationJob;
use crate::AppState;

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<JobsQuery>,
) -> Json<ListResponse<GenerationJob>> {
    let session = state.sessions.session(user.id());
    let jobs = match query.state {
        Some(JobFilter::Active) => session.queue.active_jobs(),
        Some(JobFilter::Completed) => session.queue.completed_jobs(),
        None => session.queue.jobs(),
    };
    Json(ListResponse::new(jobs))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<GenerationJob>> {
    state
        .sessions
        .session(user.id())
        .queue
        .job(&id)
        .map(Json)
        .ok_or(AppError::JobNotFound(id))
}

pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<GenerationJob>> {
    Ok(Json(state.sessions.session(user.id()).queue.cancel(&id)?))
}

pub async fn dismiss_job(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<GenerationJob>> {
    Ok(Json(state.sessions.session(user.id()).queue.dismiss(&id)?))
}

pub async fn clear_jobs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ClearResponse> {
    let removed = state.sessions.session(user.id()).queue.clear();
    Json(ClearResponse { removed })
}
