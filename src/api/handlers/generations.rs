//! Submission and cost estimation endpoints

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::types::{EstimateRequest, EstimateResponse, GenerationRequest, GenerationResponse, ReferenceInput};
use crate::assets::{data_url, validate, AssetRejection, ReferenceSet, MULTI_REFERENCE_PARAM};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::queue::SubmitRequest;
use crate::registry::ModelRegistry;
use crate::AppState;

/// References go to the multi-image slot only when every selected model takes one
fn accepts_multiple(registry: &ModelRegistry, model_ids: &[String]) -> bool {
    !model_ids.is_empty()
        && model_ids.iter().all(|id| {
            registry
                .find_by_id(id)
                .map(|model| model.has_parameter(MULTI_REFERENCE_PARAM))
                .unwrap_or(false)
        })
}

/// Split references into a reference set and the files that were refused.
/// References are taken in request order; a single slot keeps the first valid one.
fn collect_references(
    inputs: Vec<ReferenceInput>,
    multi: bool,
    max_bytes: u64,
) -> (ReferenceSet, Vec<AssetRejection>) {
    let mut references = ReferenceSet::new();
    let mut rejected = Vec::new();

    for input in inputs {
        let slot_taken = !multi && !references.is_empty();
        match input {
            ReferenceInput::Hosted { url } => {
                if slot_taken {
                    debug!(url = %url, "Single reference slot already filled");
                    continue;
                }
                references.add_url(url, multi);
            }
            ReferenceInput::Inline { data_url, file_name } => {
                let asset = match data_url::to_local_asset(&data_url, file_name.as_deref()) {
                    Ok(asset) => asset,
                    Err(e) => {
                        let file_name = file_name.unwrap_or_else(|| "reference".to_string());
                        warn!(file = %file_name, error = %e, "Undecodable reference");
                        rejected.push(AssetRejection::NotAnImage { file_name });
                        continue;
                    }
                };
                if slot_taken {
                    if let Err(rejection) = validate(&asset, max_bytes) {
                        rejected.push(rejection);
                    }
                    continue;
                }
                rejected.extend(references.add_files(vec![asset], multi, max_bytes));
            }
        }
    }

    (references, rejected)
}

/// Admit a submission and fan it out to one job per model
pub async fn create_generation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<GenerationRequest>,
) -> Result<(StatusCode, Json<GenerationResponse>)> {
    let session = state.sessions.session(user.id());
    let supplied = request.references.len();
    let multi = accepts_multiple(&state.registry, &request.models);
    let max_bytes = state.sessions.factory().assets.max_file_bytes();

    let (references, rejected) = collect_references(request.references, multi, max_bytes);
    for rejection in &rejected {
        warn!(user = %user.id(), reason = %rejection, "Reference rejected");
    }
    if supplied > 0 && references.is_empty() {
        let reasons: Vec<String> = rejected.iter().map(ToString::to_string).collect();
        return Err(AppError::AssetRejected(reasons.join(" ")));
    }

    let submission = session
        .queue
        .submit(SubmitRequest {
            prompt: request.prompt,
            model_ids: request.models,
            inputs: request.inputs,
            references,
        })
        .await
        .map_err(|e| {
            if e.is_admission() {
                info!(user = %user.id(), error = %e, "Submission refused");
            } else {
                warn!(user = %user.id(), error = %e, "Submission failed");
            }
            e
        })?;

    info!(
        user = %user.id(),
        jobs = submission.jobs.len(),
        total_cost = submission.total_cost,
        "Submission accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerationResponse {
            jobs: submission.jobs,
            total_cost: submission.total_cost,
            rejected,
        }),
    ))
}

/// Price a submission without creating jobs
pub async fn estimate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>> {
    if request.models.is_empty() {
        return Err(AppError::InvalidRequest("At least one model is required".to_string()));
    }

    let session = state.sessions.session(user.id());
    let estimates = session
        .queue
        .estimate(&request.models, &request.inputs, request.has_references)?;
    let total = estimates.iter().map(|e| e.tokens).sum();

    Ok(Json(EstimateResponse { estimates, total }))
}
