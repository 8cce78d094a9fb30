//! History endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::api::types::{HistoryAppendRequest, HistoryAppendResponse, HistoryQuery, ListResponse};
use crate::error::{AppError, Result};
use crate::history::HistoryEntry;
use crate::middleware::AuthUser;
use crate::AppState;

/// Entries of the authenticated user, newest first
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ListResponse<HistoryEntry>>> {
    let session = state.sessions.session(user.id());
    let entries = session.history.list(query.limit).await?;
    Ok(Json(ListResponse::new(entries)))
}

pub async fn append_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<HistoryAppendRequest>,
) -> Result<(StatusCode, Json<HistoryAppendResponse>)> {
    let entries = request.into_entries();
    if entries.is_empty() {
        return Err(AppError::InvalidRequest("No history items supplied".to_string()));
    }

    let session = state.sessions.session(user.id());
    let items = session.history.append(entries).await?;
    Ok((StatusCode::CREATED, Json(HistoryAppendResponse { items })))
}
