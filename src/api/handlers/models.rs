//! Model catalog endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::types::{CommonOptionsQuery, CommonOptionsResponse, ListResponse, OptionChoice};
use crate::error::{AppError, Result};
use crate::reconcile::{self, aspect, ParameterRole};
use crate::registry::ModelDescriptor;
use crate::AppState;

pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ListResponse<ModelDescriptor>> {
    Json(ListResponse::new(state.registry.all().to_vec()))
}

/// Canonical option values shared by every selected model
pub async fn common_options(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CommonOptionsQuery>,
) -> Result<Json<CommonOptionsResponse>> {
    let role = ParameterRole::parse(&query.role)
        .ok_or_else(|| AppError::InvalidRequest(format!("Unknown parameter role '{}'", query.role)))?;

    let ids: Vec<String> = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let options = reconcile::common_options(&state.registry, &ids, role);
    let choices = options
        .iter()
        .map(|value| OptionChoice {
            value: value.clone(),
            label: aspect::display_name(value),
            orientation: (role == ParameterRole::AspectRatio).then(|| aspect::orientation(value)),
        })
        .collect();

    Ok(Json(CommonOptionsResponse {
        role: query.role,
        options,
        choices,
        all_support: reconcile::all_support(&state.registry, &ids, role),
    }))
}
