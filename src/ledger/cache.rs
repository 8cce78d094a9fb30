//! Read cache for values whose source of truth lives elsewhere

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// A cached value and when it was last read from its source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot<T> {
    pub value: Option<T>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl<T> CacheSnapshot<T> {
    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }
}

/// Explicitly refreshed cache. Nothing reconciles it behind the caller's back,
/// so readers must assume it can lag the authoritative value.
#[derive(Debug)]
pub struct Cache<T> {
    inner: RwLock<CacheSnapshot<T>>,
}

impl<T: Clone> Cache<T> {
    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(CacheSnapshot {
                value: None,
                last_refreshed: None,
            }),
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot<T> {
        self.inner.read().clone()
    }

    pub fn value(&self) -> Option<T> {
        self.inner.read().value.clone()
    }

    /// Last write wins
    pub fn store(&self, value: T) {
        *self.inner.write() = CacheSnapshot {
            value: Some(value),
            last_refreshed: Some(Utc::now()),
        };
    }
}

impl<T: Clone> Default for Cache<T> {
    fn default() -> Self {
        Self::empty()
    }
}
