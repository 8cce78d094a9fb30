//! Per-user view of the token balance

use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::ledger::cache::{Cache, CacheSnapshot};
use crate::ledger::store::TokenLedger;

/// Cached balance for one user. Used for advisory admission checks and display;
/// the ledger itself remains the only source of truth.
pub struct LedgerClient {
    user: String,
    ledger: Arc<TokenLedger>,
    cache: Cache<u64>,
}

impl LedgerClient {
    pub fn new(user: impl Into<String>, ledger: Arc<TokenLedger>) -> Self {
        Self {
            user: user.into(),
            ledger,
            cache: Cache::empty(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The possibly stale cached balance
    pub fn cached(&self) -> CacheSnapshot<u64> {
        self.cache.snapshot()
    }

    /// Read the authoritative balance into the cache
    pub async fn refresh(&self) -> Result<u64> {
        let balance = self.ledger.balance(&self.user).await?;
        self.cache.store(balance);
        debug!(user = %self.user, balance = balance, "Balance refreshed");
        Ok(balance)
    }
}
