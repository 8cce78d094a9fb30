//! Token balance endpoint

use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::error::Result;
use crate::ledger::CacheSnapshot;
use crate::middleware::AuthUser;
use crate::AppState;

/// Refresh from the ledger and return the cached balance with its refresh time
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CacheSnapshot<u64>>> {
    let session = state.sessions.session(user.id());
    session.ledger.refresh().await?;
    Ok(Json(session.ledger.cached()))
}
