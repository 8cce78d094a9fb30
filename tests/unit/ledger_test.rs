//! Unit tests for pricing, the authoritative ledger and the billing boundary

#[path = "../common/mod.rs"]
mod common;

use common::*;
use gen_studio::ledger::{
    InMemoryBalanceStore, LedgerClient, MeteredProvider, Pricing, TokenLedger, FALLBACK_COST,
};
use gen_studio::provider::{ProviderError, ProviderGateway};
use gen_studio::registry::{ModelDescriptor, ModelKind, ModelRegistry};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

fn model(base: Option<f64>) -> ModelDescriptor {
    ModelDescriptor {
        id: "acme/painter".to_string(),
        edit_id: None,
        name: "Painter".to_string(),
        kind: ModelKind::TextToImage,
        description: String::new(),
        base_price_cost: base,
        parameters: vec![],
    }
}

fn inputs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn ledger(starting: u64) -> Arc<TokenLedger> {
    Arc::new(TokenLedger::new(Arc::new(InMemoryBalanceStore::new()), starting))
}

fn metered(provider: Arc<ScriptedProvider>, ledger: Arc<TokenLedger>) -> MeteredProvider {
    MeteredProvider::new(
        provider,
        ledger,
        Pricing::default(),
        Arc::new(ModelRegistry::builtin()),
        USER,
    )
}

#[test]
fn test_cost_estimate_is_deterministic() {
    let pricing = Pricing::default();
    let priced = model(Some(0.008));
    let three = inputs(json!({"num_images": 3}));

    assert_eq!(pricing.estimate_cost(&priced, &three), 3);
    assert_eq!(pricing.estimate_cost(&priced, &three), pricing.estimate_cost(&priced, &three));
    assert_eq!(pricing.estimate_cost(&model(None), &three), FALLBACK_COST);
    assert!(pricing.estimate_cost(&model(Some(0.0001)), &Map::new()) >= 1);
}

#[test]
fn test_pricing_follows_billing_config() {
    let config = gen_studio::config::BillingConfig {
        markup_factor: 2.0,
        usd_per_token: 0.001,
        starting_balance: 10,
    };
    let pricing = Pricing::from(&config);
    assert_eq!(pricing.estimate_cost(&model(Some(0.004)), &Map::new()), 8);
}

#[tokio::test]
async fn test_refund_invariant_across_outcomes() {
    let provider = ScriptedProvider::new();
    provider.script(NANO_BANANA, Script::images(&["https://cdn.test/ok.png"]));
    provider.script(NANO_BANANA_PRO, Script::fail(ProviderError::new("boom")));
    let ledger = ledger(100);
    let gateway = metered(provider.clone(), ledger.clone());
    let pricing = Pricing::default();
    let registry = ModelRegistry::builtin();

    let calls: Vec<(&str, Value)> = vec![
        (NANO_BANANA, json!({"prompt": "a", "num_images": 4})),
        (NANO_BANANA_PRO, json!({"prompt": "b", "num_images": 2})),
        (NANO_BANANA, json!({"prompt": "c"})),
        (NANO_BANANA_PRO, json!({"prompt": "d"})),
    ];

    let mut successful_cost = 0;
    for (invocation_id, input) in calls {
        let cost = pricing.estimate_cost(
            registry.find_by_invocation_id(invocation_id).unwrap(),
            input.as_object().unwrap(),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        if gateway.submit(invocation_id, input, tx).await.is_ok() {
            successful_cost += cost;
        }
    }

    assert_eq!(ledger.balance(USER).await.unwrap(), 100 - successful_cost);
    assert_eq!(provider.call_count(), 4);
}

#[tokio::test]
async fn test_concurrent_failures_restore_balance() {
    let provider = ScriptedProvider::new();
    provider.script(NANO_BANANA, Script::fail(ProviderError::new("boom")));
    let ledger = ledger(5);
    let gateway = Arc::new(metered(provider, ledger.clone()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            let (tx, _rx) = mpsc::unbounded_channel();
            gateway.submit(NANO_BANANA, json!({"prompt": "fox"}), tx).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }

    assert_eq!(ledger.balance(USER).await.unwrap(), 5);
}

#[tokio::test]
async fn test_edit_invocations_are_priced_by_their_model() {
    let provider = ScriptedProvider::new();
    provider.script("fal-ai/gpt-image-1.5/edit", Script::images(&["https://cdn.test/x.png"]));
    let ledger = ledger(100);
    let gateway = metered(provider, ledger.clone());

    let (tx, _rx) = mpsc::unbounded_channel();
    gateway
        .submit("fal-ai/gpt-image-1.5/edit", json!({"prompt": "fox"}), tx)
        .await
        .unwrap();

    // 0.02 * 1.2 / 0.01 = 2.4
    assert_eq!(ledger.balance(USER).await.unwrap(), 97);
}

#[tokio::test]
async fn test_unknown_invocation_is_not_charged() {
    let provider = ScriptedProvider::new();
    let ledger = ledger(100);
    let gateway = metered(provider.clone(), ledger.clone());

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = gateway.submit("acme/unknown", json!({}), tx).await.unwrap_err();

    assert_eq!(err.status, Some(404));
    assert_eq!(provider.call_count(), 0);
    assert_eq!(ledger.balance(USER).await.unwrap(), 100);
}

#[tokio::test]
async fn test_client_cache_is_only_updated_by_refresh() {
    let ledger = ledger(100);
    let client = LedgerClient::new(USER, ledger.clone());

    assert!(client.cached().value.is_none());
    assert!(client.cached().last_refreshed.is_none());

    assert_ok!(client.refresh().await);
    assert_ok!(ledger.try_debit(USER, 10).await);

    assert_eq!(client.cached().value, Some(100));
    assert_eq!(ledger.balance(USER).await.unwrap(), 90);

    assert_ok!(client.refresh().await);
    assert_eq!(client.cached().value, Some(90));
    assert_err!(ledger.try_debit(USER, 91).await);
}
