//! Billing boundary around a provider gateway

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::ledger::pricing::Pricing;
use crate::ledger::store::TokenLedger;
use crate::provider::{ProgressSender, ProviderError, ProviderGateway, ProviderOutput};
use crate::registry::ModelRegistry;

/// Debits the user's balance before every provider call and refunds it if the
/// call fails. The debit stands only for calls that returned a result.
pub struct MeteredProvider {
    inner: Arc<dyn ProviderGateway>,
    ledger: Arc<TokenLedger>,
    pricing: Pricing,
    registry: Arc<ModelRegistry>,
    user: String,
}

impl MeteredProvider {
    pub fn new(
        inner: Arc<dyn ProviderGateway>,
        ledger: Arc<TokenLedger>,
        pricing: Pricing,
        registry: Arc<ModelRegistry>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            ledger,
            pricing,
            registry,
            user: user.into(),
        }
    }

    fn price(&self, invocation_id: &str, input: &Value) -> Result<u64, ProviderError> {
        let model = self.registry.find_by_invocation_id(invocation_id).ok_or_else(|| {
            ProviderError::new(format!("Unknown model: {}", invocation_id)).with_status(404)
        })?;
        let empty = Map::new();
        let inputs = input.as_object().unwrap_or(&empty);
        Ok(self.pricing.estimate_cost(model, inputs))
    }
}

#[async_trait]
impl ProviderGateway for MeteredProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn submit(
        &self,
        invocation_id: &str,
        input: Value,
        progress: ProgressSender,
    ) -> Result<ProviderOutput, ProviderError> {
        let cost = self.price(invocation_id, &input)?;

        match self.ledger.try_debit(&self.user, cost).await {
            Ok(_) => {}
            Err(AppError::InsufficientTokens { required, available }) => {
                warn!(
                    user = %self.user,
                    invocation_id = %invocation_id,
                    required = required,
                    available = available,
                    "Provider call refused"
                );
                return Err(ProviderError::new("Insufficient tokens").with_status(402));
            }
            Err(e) => {
                error!(user = %self.user, error = %e, "Balance debit failed");
                return Err(ProviderError::new(e.to_string()).with_status(500));
            }
        }

        let result = self.inner.submit(invocation_id, input, progress).await;

        if let Err(provider_error) = &result {
            match self.ledger.credit(&self.user, cost).await {
                Ok(balance) => info!(
                    user = %self.user,
                    invocation_id = %invocation_id,
                    refunded = cost,
                    balance = balance,
                    reason = %provider_error,
                    "Tokens refunded"
                ),
                Err(e) => error!(
                    user = %self.user,
                    invocation_id = %invocation_id,
                    amount = cost,
                    error = %e,
                    "Refund failed"
                ),
            }
        }

        result
    }
}
