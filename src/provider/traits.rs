//! Contract between the job queue and an image generation provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Fallback shown when a provider error carries no usable message
pub const DEFAULT_FAILURE_MESSAGE: &str = "Generation failed";

/// Provider status value that marks a progress event worth merging
pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";

/// One progress line emitted by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    #[serde(default)]
    pub message: Option<String>,
}

impl LogLine {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

/// Queue status update streamed while a request is processed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogLine>,
}

impl QueueUpdate {
    pub fn in_progress<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: Some(STATUS_IN_PROGRESS.to_string()),
            logs: messages.into_iter().map(LogLine::new).collect(),
        }
    }

    /// Non-empty log messages, only for `IN_PROGRESS` events
    pub fn relevant_messages(&self) -> Vec<String> {
        if self.status.as_deref() != Some(STATUS_IN_PROGRESS) {
            return Vec::new();
        }
        self.logs
            .iter()
            .filter_map(|line| line.message.clone())
            .filter(|message| !message.is_empty())
            .collect()
    }
}

/// Sender half handed to a provider for progress streaming
pub type ProgressSender = mpsc::UnboundedSender<QueueUpdate>;

/// A produced image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputImage {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedOutput {
    #[serde(default)]
    pub images: Vec<OutputImage>,
}

/// Successful provider result; images appear either at the top level or under `data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderOutput {
    #[serde(default)]
    pub images: Vec<OutputImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NestedOutput>,
}

impl ProviderOutput {
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            images: urls
                .into_iter()
                .map(|url| OutputImage {
                    url: url.into(),
                    content_type: None,
                })
                .collect(),
            data: None,
        }
    }

    /// Output URLs, preferring top-level images, skipping empty entries
    pub fn image_urls(&self) -> Vec<String> {
        let top: Vec<String> = collect_urls(&self.images);
        if !top.is_empty() {
            return top;
        }
        self.data
            .as_ref()
            .map(|nested| collect_urls(&nested.images))
            .unwrap_or_default()
    }
}

fn collect_urls(images: &[OutputImage]) -> Vec<String> {
    images
        .iter()
        .map(|image| image.url.clone())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Structured error payload returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Structured {
        #[serde(default)]
        detail: Option<serde_json::Value>,
        #[serde(default)]
        message: Option<String>,
    },
    Text(String),
}

/// Failure reported by a provider call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: Option<String>,
    pub body: Option<ErrorBody>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: Some(message.into()),
            body: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.body = Some(ErrorBody::Structured {
            detail: Some(serde_json::Value::String(detail.into())),
            message: None,
        });
        self
    }

    /// Build an error from a non-success HTTP response body
    pub fn from_response(status: u16, raw_body: &str) -> Self {
        let body = match serde_json::from_str::<ErrorBody>(raw_body) {
            Ok(parsed) => Some(parsed),
            Err(_) if !raw_body.trim().is_empty() => Some(ErrorBody::Text(raw_body.trim().to_string())),
            Err(_) => None,
        };
        let informative = match &body {
            Some(ErrorBody::Structured { detail, message }) => detail.is_some() || message.is_some(),
            Some(ErrorBody::Text(_)) => true,
            None => false,
        };
        Self {
            status: Some(status),
            message: (!informative).then(|| format!("Provider returned {}", status)),
            body,
        }
    }

    /// Best-effort human-readable message: structured detail first, then the
    /// error's own message, then the body's message or text, then a fixed default.
    pub fn user_message(&self) -> String {
        if let Some(ErrorBody::Structured { detail: Some(detail), .. }) = &self.body {
            match detail {
                serde_json::Value::String(s) if !s.is_empty() => return s.clone(),
                serde_json::Value::Null => {}
                serde_json::Value::String(_) => {}
                other => return other.to_string(),
            }
        }
        if let Some(message) = self.message.as_ref().filter(|m| !m.is_empty()) {
            return message.clone();
        }
        match &self.body {
            Some(ErrorBody::Structured { message: Some(m), .. }) if !m.is_empty() => m.clone(),
            Some(ErrorBody::Text(text)) if !text.is_empty() => text.clone(),
            _ => DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.user_message(), status),
            None => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Asynchronous image generation provider
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Submit a job and wait for its result, streaming progress through `progress`.
    /// Implementations must not block other submissions.
    async fn submit(
        &self,
        invocation_id: &str,
        input: serde_json::Value,
        progress: ProgressSender,
    ) -> Result<ProviderOutput, ProviderError>;
}
