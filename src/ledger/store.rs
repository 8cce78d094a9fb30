//! Authoritative per-user token balances

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{AppError, Result};

/// External persistence for balances: one integer per user
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// `None` when the user has no balance recorded yet
    async fn read(&self, user: &str) -> Result<Option<u64>>;

    async fn write(&self, user: &str, balance: u64) -> Result<()>;
}

/// Process-local balance store
#[derive(Default)]
pub struct InMemoryBalanceStore {
    balances: DashMap<String, u64>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn read(&self, user: &str) -> Result<Option<u64>> {
        Ok(self.balances.get(user).map(|b| *b))
    }

    async fn write(&self, user: &str, balance: u64) -> Result<()> {
        self.balances.insert(user.to_string(), balance);
        Ok(())
    }
}

/// The trust-boundary ledger. All debits and refunds go through here.
pub struct TokenLedger {
    store: Arc<dyn BalanceStore>,
    starting_balance: u64,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TokenLedger {
    pub fn new(store: Arc<dyn BalanceStore>, starting_balance: u64) -> Self {
        Self {
            store,
            starting_balance,
            user_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, user: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Current balance; first use bootstraps the starting allotment
    pub async fn balance(&self, user: &str) -> Result<u64> {
        Ok(self.store.read(user).await?.unwrap_or(self.starting_balance))
    }

    /// Atomically check and debit `amount`, returning the new balance
    pub async fn try_debit(&self, user: &str, amount: u64) -> Result<u64> {
        let lock = self.lock_for(user);
        let _guard = lock.lock().await;

        let balance = self.balance(user).await?;
        if balance < amount {
            return Err(AppError::InsufficientTokens {
                required: amount,
                available: balance,
            });
        }

        let remaining = balance - amount;
        self.store.write(user, remaining).await?;
        info!(user = %user, amount = amount, balance = remaining, "Tokens debited");
        Ok(remaining)
    }

    /// Add `amount` back, returning the new balance
    pub async fn credit(&self, user: &str, amount: u64) -> Result<u64> {
        let lock = self.lock_for(user);
        let _guard = lock.lock().await;

        let balance = self.balance(user).await?;
        let updated = balance.saturating_add(amount);
        self.store.write(user, updated).await?;
        info!(user = %user, amount = amount, balance = updated, "Tokens credited");
        Ok(updated)
    }
}
