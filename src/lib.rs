//! Generation Studio
//!
//! Orchestrates asynchronous multi-model image generation: admission control
//! against a token balance, reference image uploads, fan-out to a queue-based
//! provider with refund-on-failure billing, and a per-user history of results.

pub mod api;
pub mod assets;
pub mod config;
pub mod error;
pub mod history;
pub mod ledger;
pub mod middleware;
pub mod provider;
pub mod queue;
pub mod reconcile;
pub mod registry;

pub use error::{AppError, Result};

use std::sync::Arc;
use tokio::sync::RwLock;

use queue::SessionRegistry;
use registry::ModelRegistry;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<RwLock<config::Settings>>,
    pub registry: Arc<ModelRegistry>,
    pub sessions: Arc<SessionRegistry>,
}
