//! Main entry point for the generation studio gateway

use gen_studio::{
    api,
    assets::{AssetUploader, LocalAssetStore, ReferenceAssetManager},
    config::Settings,
    history::InMemoryHistoryStore,
    ledger::{InMemoryBalanceStore, Pricing, TokenLedger},
    provider::HttpProvider,
    queue::{QueueConfig, SessionFactory, SessionRegistry},
    registry::ModelRegistry,
    AppState,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if settings.logging.format == "pretty" {
        registry.with(fmt::layer()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;

    init_tracing(&settings);
    info!("Starting generation studio");
    info!(
        "Loaded configuration: server={}:{}",
        settings.server.host, settings.server.port
    );

    let registry = Arc::new(match &settings.registry.catalog_path {
        Some(path) => ModelRegistry::from_yaml_file(path)?,
        None => ModelRegistry::builtin(),
    });
    info!(models = registry.len(), "Model registry ready");

    let provider = Arc::new(HttpProvider::new(settings.provider.clone())?);

    let uploader: Arc<dyn AssetUploader> = if settings.assets.storage == "local" {
        let store = LocalAssetStore::new(&settings.assets.local_path, &settings.assets.local_url_prefix);
        store.ensure_storage_dir().await?;
        Arc::new(store)
    } else {
        provider.clone()
    };

    let factory = SessionFactory {
        registry: registry.clone(),
        provider,
        token_ledger: Arc::new(TokenLedger::new(
            Arc::new(InMemoryBalanceStore::new()),
            settings.billing.starting_balance,
        )),
        history_store: Arc::new(InMemoryHistoryStore::new()),
        assets: Arc::new(ReferenceAssetManager::from_config(uploader, &settings.assets)),
        pricing: Pricing::from(&settings.billing),
        queue_config: QueueConfig::from(&settings.queue),
        history_limit: settings.history.default_limit,
    };

    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let app_state = Arc::new(AppState {
        settings: Arc::new(RwLock::new(settings)),
        registry,
        sessions: Arc::new(SessionRegistry::new(factory)),
    });

    // Build the router
    let app = api::routes::create_router(app_state).await;

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
