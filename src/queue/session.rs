//! Per-user sessions

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::assets::ReferenceAssetManager;
use crate::history::{HistoryLog, HistoryStore};
use crate::ledger::{LedgerClient, MeteredProvider, Pricing, TokenLedger};
use crate::provider::ProviderGateway;
use crate::queue::job_queue::{JobQueue, QueueConfig, QueueServices};
use crate::registry::ModelRegistry;

/// Everything one authenticated user works with
pub struct Session {
    pub user: String,
    pub queue: JobQueue,
    pub ledger: Arc<LedgerClient>,
    pub history: HistoryLog,
}

/// Shared collaborators from which sessions are assembled
#[derive(Clone)]
pub struct SessionFactory {
    pub registry: Arc<ModelRegistry>,
    /// Unmetered provider; each session wraps it in its own billing boundary
    pub provider: Arc<dyn ProviderGateway>,
    pub token_ledger: Arc<TokenLedger>,
    pub history_store: Arc<dyn HistoryStore>,
    pub assets: Arc<ReferenceAssetManager>,
    pub pricing: Pricing,
    pub queue_config: QueueConfig,
    pub history_limit: usize,
}

impl SessionFactory {
    pub fn create(&self, user: &str) -> Session {
        let ledger = Arc::new(LedgerClient::new(user, self.token_ledger.clone()));
        let history = HistoryLog::new(user, self.history_store.clone(), self.history_limit);
        let metered: Arc<dyn ProviderGateway> = Arc::new(MeteredProvider::new(
            self.provider.clone(),
            self.token_ledger.clone(),
            self.pricing,
            self.registry.clone(),
            user,
        ));

        let queue = JobQueue::new(
            self.queue_config.clone(),
            QueueServices {
                registry: self.registry.clone(),
                provider: metered,
                assets: self.assets.clone(),
                ledger: ledger.clone(),
                history: history.clone(),
                pricing: self.pricing,
            },
        );

        Session {
            user: user.to_string(),
            queue,
            ledger,
            history,
        }
    }
}

/// Sessions keyed by user, created on first use
pub struct SessionRegistry {
    factory: SessionFactory,
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            sessions: DashMap::new(),
        }
    }

    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    pub fn session(&self, user: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.get(user) {
            return session.clone();
        }

        self.sessions
            .entry(user.to_string())
            .or_insert_with(|| {
                info!(user = %user, "Session created");
                Arc::new(self.factory.create(user))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
