//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

/// An API key and the user it authenticates as
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyConfig {
    pub key: String,
    pub user_id: String,
}

fn default_true() -> bool {
    true
}

/// Per-user rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_rps() -> u32 {
    20
}

fn default_burst() -> u32 {
    40
}

/// Job queue limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueSettings {
    #[serde(default = "default_max_parallel_jobs")]
    pub max_parallel_jobs: usize,
    #[serde(default = "default_elapsed_tick_ms")]
    pub elapsed_tick_ms: u64,
}

fn default_max_parallel_jobs() -> usize {
    5
}

fn default_elapsed_tick_ms() -> u64 {
    50
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_parallel_jobs: default_max_parallel_jobs(),
            elapsed_tick_ms: default_elapsed_tick_ms(),
        }
    }
}

/// Token pricing and balance bootstrap
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingConfig {
    #[serde(default = "default_markup_factor")]
    pub markup_factor: f64,
    #[serde(default = "default_usd_per_token")]
    pub usd_per_token: f64,
    #[serde(default = "default_starting_balance")]
    pub starting_balance: u64,
}

fn default_markup_factor() -> f64 {
    1.2
}

fn default_usd_per_token() -> f64 {
    0.01
}

fn default_starting_balance() -> u64 {
    100
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            markup_factor: default_markup_factor(),
            usd_per_token: default_usd_per_token(),
            starting_balance: default_starting_balance(),
        }
    }
}

/// Reference asset validation and storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_upload_attempts")]
    pub upload_attempts: u32,
    #[serde(default = "default_upload_backoff_ms")]
    pub upload_backoff_ms: u64,
    /// "provider" uploads through the provider's storage API, "local" writes to disk
    #[serde(default = "default_asset_storage")]
    pub storage: String,
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default = "default_local_url_prefix")]
    pub local_url_prefix: String,
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_upload_attempts() -> u32 {
    3
}

fn default_upload_backoff_ms() -> u64 {
    300
}

fn default_asset_storage() -> String {
    "provider".to_string()
}

fn default_local_path() -> String {
    "./reference_assets".to_string()
}

fn default_local_url_prefix() -> String {
    "http://localhost:8080/assets".to_string()
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            upload_attempts: default_upload_attempts(),
            upload_backoff_ms: default_upload_backoff_ms(),
            storage: default_asset_storage(),
            local_path: default_local_path(),
            local_url_prefix: default_local_url_prefix(),
        }
    }
}

/// Provider gateway configuration, injected into the provider client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_queue_url")]
    pub queue_url: String,
    #[serde(default = "default_storage_url")]
    pub storage_url: String,
    #[serde(default)]
    pub api_key: String,
    /// When set, every provider request goes through this proxy
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
}

fn default_queue_url() -> String {
    "https://queue.fal.run".to_string()
}

fn default_storage_url() -> String {
    "https://rest.alpha.fal.ai".to_string()
}

fn default_poll_interval() -> u64 {
    500
}

fn default_timeout() -> u64 {
    60000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            queue_url: default_queue_url(),
            storage_url: default_storage_url(),
            api_key: String::new(),
            proxy_url: None,
            poll_interval_ms: default_poll_interval(),
            request_timeout_ms: default_timeout(),
        }
    }
}

/// History listing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_limit")]
    pub default_limit: usize,
}

fn default_history_limit() -> usize {
    50
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_history_limit(),
        }
    }
}

/// Model catalog source
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// YAML catalog replacing the built-in models
    #[serde(default)]
    pub catalog_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("auth.enabled", true)?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_second", default_rps() as i64)?
            .set_default("rate_limit.burst_size", default_burst() as i64)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (prefixed with GEN_STUDIO_)
            .add_source(
                Environment::with_prefix("GEN_STUDIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        for entry in &self.auth.api_keys {
            if entry.key.is_empty() || entry.user_id.is_empty() {
                return Err(invalid("API key entries need both a key and a user_id"));
            }
        }

        if self.queue.max_parallel_jobs == 0 {
            return Err(invalid("queue.max_parallel_jobs must be at least 1"));
        }

        if self.queue.elapsed_tick_ms == 0 {
            return Err(invalid("queue.elapsed_tick_ms must be at least 1"));
        }

        if self.provider.poll_interval_ms == 0 {
            return Err(invalid("provider.poll_interval_ms must be at least 1"));
        }

        if self.billing.markup_factor <= 0.0 || self.billing.usd_per_token <= 0.0 {
            return Err(invalid("billing.markup_factor and billing.usd_per_token must be positive"));
        }

        if self.assets.upload_attempts == 0 {
            return Err(invalid("assets.upload_attempts must be at least 1"));
        }

        if !["provider", "local"].contains(&self.assets.storage.as_str()) {
            return Err(invalid(&format!(
                "Invalid asset storage '{}'. Must be 'provider' or 'local'",
                self.assets.storage
            )));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            auth: AuthConfig {
                enabled: true,
                api_keys: vec![],
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: default_rps(),
                burst_size: default_burst(),
            },
            queue: QueueSettings::default(),
            billing: BillingConfig::default(),
            assets: AssetConfig::default(),
            provider: ProviderConfig::default(),
            history: HistoryConfig::default(),
            registry: RegistryConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
