//! Router assembly

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::api::handlers::{self, account, generations, history, jobs, models};
use crate::middleware::{AuthLayer, RateLimitLayer};
use crate::AppState;

/// Mount path for locally stored reference assets, taken from the URL prefix
fn local_asset_mount(url_prefix: &str) -> String {
    let path = reqwest::Url::parse(url_prefix)
        .map(|url| url.path().trim_end_matches('/').to_string())
        .unwrap_or_else(|_| url_prefix.trim_end_matches('/').to_string());
    if path.is_empty() {
        "/assets".to_string()
    } else {
        path
    }
}

/// Build the application router
pub async fn create_router(state: Arc<AppState>) -> Router {
    let settings = state.settings.read().await.clone();

    let auth = if settings.auth.enabled {
        AuthLayer::new(settings.auth.api_keys.clone())
    } else {
        AuthLayer::disabled()
    };

    let mut api = Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/models", get(models::list_models))
        .route("/v1/models/common-options", get(models::common_options))
        .route("/v1/estimate", post(generations::estimate))
        .route("/v1/generations", post(generations::create_generation))
        .route("/v1/jobs", get(jobs::list_jobs).delete(jobs::clear_jobs))
        .route("/v1/jobs/:id", get(jobs::get_job).delete(jobs::dismiss_job))
        .route("/v1/jobs/:id/cancel", post(jobs::cancel_job))
        .route("/v1/balance", get(account::balance))
        .route("/v1/history", get(history::list_history).post(history::append_history))
        .with_state(state);

    if settings.rate_limit.enabled {
        api = api.layer(RateLimitLayer::new(
            settings.rate_limit.requests_per_second,
            settings.rate_limit.burst_size,
        ));
    }
    // Outermost, so the rate limiter sees the resolved user
    api = api.layer(auth);

    if settings.assets.storage == "local" {
        let mount = local_asset_mount(&settings.assets.local_url_prefix);
        info!(mount = %mount, path = %settings.assets.local_path, "Serving local reference assets");
        api = api.nest_service(&mount, ServeDir::new(&settings.assets.local_path));
    }

    api.layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive())
}
