//! Token ledger - pricing, authoritative balances and the billing boundary

pub mod cache;
pub mod client;
pub mod metered;
pub mod pricing;
pub mod store;

pub use cache::{Cache, CacheSnapshot};
pub use client::LedgerClient;
pub use metered::MeteredProvider;
pub use pricing::{output_count, Pricing, FALLBACK_COST};
pub use store::{BalanceStore, InMemoryBalanceStore, TokenLedger};
