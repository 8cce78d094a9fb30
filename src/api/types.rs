//! Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::assets::AssetRejection;
use crate::history::{HistoryEntry, NewHistoryEntry};
use crate::queue::{CostEstimate, GenerationJob};
use crate::reconcile::aspect::Orientation;

/// OpenAI-style list envelope
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub object: &'static str,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { object: "list", data }
    }
}

/// A reference image: hosted URL or inline data URL
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReferenceInput {
    Hosted {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        data_url: String,
        #[serde(default)]
        file_name: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub models: Vec<String>,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub references: Vec<ReferenceInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub jobs: Vec<GenerationJob>,
    pub total_cost: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<AssetRejection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub models: Vec<String>,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub has_references: bool,
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub estimates: Vec<CostEstimate>,
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommonOptionsQuery {
    /// Comma-separated model ids
    #[serde(default)]
    pub ids: String,
    pub role: String,
}

/// A shared option with its display metadata
#[derive(Debug, Serialize)]
pub struct OptionChoice {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonOptionsResponse {
    pub role: String,
    pub options: Vec<String>,
    pub choices: Vec<OptionChoice>,
    pub all_support: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobFilter {
    Active,
    Completed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsQuery {
    #[serde(default)]
    pub state: Option<JobFilter>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One entry or a batch under `items`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryAppendRequest {
    Batch { items: Vec<NewHistoryEntry> },
    Single(NewHistoryEntry),
}

impl HistoryAppendRequest {
    pub fn into_entries(self) -> Vec<NewHistoryEntry> {
        match self {
            HistoryAppendRequest::Batch { items } => items,
            HistoryAppendRequest::Single(entry) => vec![entry],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryAppendResponse {
    pub items: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models: usize,
    pub sessions: usize,
}
