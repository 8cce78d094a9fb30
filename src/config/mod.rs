//! Configuration loading and validation

pub mod settings;

pub use settings::{
    ApiKeyConfig, AssetConfig, AuthConfig, BillingConfig, HistoryConfig, LoggingConfig,
    ProviderConfig, QueueSettings, RateLimitConfig, RegistryConfig, ServerConfig, Settings,
};
