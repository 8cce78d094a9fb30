//! Generation job record and lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::registry::ModelDescriptor;

/// Error message recorded when the user cancels a job
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Error message recorded when a provider succeeds without any output
pub const NO_IMAGES_MESSAGE: &str = "No images returned from model.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl JobStatus {
    /// Pending or running
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

/// One model invocation within a submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub id: String,
    pub prompt: String,
    /// Snapshot taken at submission
    pub model: ModelDescriptor,
    pub invocation_id: String,
    pub status: JobStatus,
    pub images: Vec<String>,
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    /// Exact provider input, fixed at submission
    pub resolved_inputs: Value,
    #[serde(skip)]
    pub cancel_token: Option<CancellationToken>,
}

impl GenerationJob {
    pub fn new(prompt: impl Into<String>, model: ModelDescriptor, invocation_id: impl Into<String>, resolved_inputs: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            model,
            invocation_id: invocation_id.into(),
            status: JobStatus::Pending,
            images: Vec::new(),
            error: None,
            logs: Vec::new(),
            elapsed_ms: 0,
            created_at: Utc::now(),
            started_at: None,
            resolved_inputs,
            cancel_token: Some(CancellationToken::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub(crate) fn start(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Running;
        self.started_at = Some(now);
    }

    pub(crate) fn complete(&mut self, images: Vec<String>) {
        self.status = JobStatus::Done;
        self.images = images;
        self.finish();
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.error = Some(message.into());
        self.finish();
    }

    /// Record elapsed time and drop the cancellation handle
    fn finish(&mut self) {
        self.tick(Utc::now());
        self.cancel_token = None;
    }

    pub(crate) fn tick(&mut self, now: DateTime<Utc>) {
        if let Some(started) = self.started_at {
            self.elapsed_ms = (now - started).num_milliseconds().max(0) as u64;
        }
    }
}
