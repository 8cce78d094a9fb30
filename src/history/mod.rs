//! Append-only per-user history of completed generations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// One recorded output image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "imageUrl")]
    pub url: String,
    pub prompt: String,
    pub invocation_id: String,
    pub timestamp: DateTime<Utc>,
}

/// An entry as submitted by a writer; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryEntry {
    #[serde(rename = "imageUrl")]
    pub url: String,
    pub prompt: String,
    #[serde(alias = "modelId")]
    pub invocation_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewHistoryEntry {
    pub fn new(url: impl Into<String>, prompt: impl Into<String>, invocation_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prompt: prompt.into(),
            invocation_id: invocation_id.into(),
            timestamp: None,
        }
    }

    /// Stamp with the write time when no timestamp was supplied
    pub fn into_entry(self, written_at: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4().to_string(),
            url: self.url,
            prompt: self.prompt,
            invocation_id: self.invocation_id,
            timestamp: self.timestamp.unwrap_or(written_at),
        }
    }
}

/// External persistence for history records
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, user: &str, entries: Vec<NewHistoryEntry>) -> Result<Vec<HistoryEntry>>;

    /// Newest first, at most `limit` entries
    async fn list(&self, user: &str, limit: usize) -> Result<Vec<HistoryEntry>>;
}

/// Process-local history store
#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: DashMap<String, Vec<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, user: &str, entries: Vec<NewHistoryEntry>) -> Result<Vec<HistoryEntry>> {
        let now = Utc::now();
        let stored: Vec<HistoryEntry> = entries.into_iter().map(|e| e.into_entry(now)).collect();
        self.entries
            .entry(user.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn list(&self, user: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let Some(entries) = self.entries.get(user) else {
            return Ok(Vec::new());
        };

        let mut listed = entries.clone();
        // Stable sort keeps later appends ahead of earlier ones on equal timestamps
        listed.reverse();
        listed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        listed.truncate(limit);
        Ok(listed)
    }
}

/// History of one user
#[derive(Clone)]
pub struct HistoryLog {
    user: String,
    store: Arc<dyn HistoryStore>,
    default_limit: usize,
}

impl HistoryLog {
    pub fn new(user: impl Into<String>, store: Arc<dyn HistoryStore>, default_limit: usize) -> Self {
        Self {
            user: user.into(),
            store,
            default_limit,
        }
    }

    /// Append without any idempotency guarantee
    pub async fn append(&self, entries: Vec<NewHistoryEntry>) -> Result<Vec<HistoryEntry>> {
        let count = entries.len();
        let stored = self.store.append(&self.user, entries).await?;
        debug!(user = %self.user, count = count, "History appended");
        Ok(stored)
    }

    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        self.store
            .list(&self.user, limit.unwrap_or(self.default_limit))
            .await
    }
}
