use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_env_parsed};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::services::AutoSaveConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreConfig,
    pub storage: StorageConfig,
    pub autosave: AutoSaveSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub local_path: String,
    /// Base for public logo URLs; derived from the port when unset.
    pub public_base_url: Option<String>,
    pub logo_max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoSaveSettings {
    pub debounce_ms: u64,
    pub max_attempts: u32,
}

impl AutoSaveSettings {
    pub fn to_config(&self) -> AutoSaveConfig {
        AutoSaveConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            max_attempts: self.max_attempts,
            ..AutoSaveConfig::default()
        }
    }
}

impl InvoiceConfig {
    pub fn load() -> Result<Self, AppError> {
        // Common config handles .env and the APP__ prefix.
        let common_config = core_config::Config::load()?;
        let is_prod = core_config::is_production();

        let backend: StoreBackend = get_env("STORE_BACKEND", Some("memory"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let database_url = match backend {
            StoreBackend::Postgres => Some(get_env("DATABASE_URL", None, is_prod)?),
            StoreBackend::Memory => env::var("DATABASE_URL").ok(),
        };

        Ok(InvoiceConfig {
            common: common_config,
            service_name: get_env("SERVICE_NAME", Some("invoice-manager"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            store: StoreConfig {
                backend,
                database_url,
                max_connections: get_env_parsed("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: get_env_parsed("DATABASE_MIN_CONNECTIONS", 1)?,
            },
            storage: StorageConfig {
                local_path: get_env("STORAGE_LOCAL_PATH", Some("storage/logos"), is_prod)?,
                public_base_url: env::var("PUBLIC_BASE_URL").ok(),
                logo_max_bytes: get_env_parsed("LOGO_MAX_BYTES", 5 * 1024 * 1024)?,
            },
            autosave: AutoSaveSettings {
                debounce_ms: get_env_parsed("AUTOSAVE_DEBOUNCE_MS", 2000)?,
                max_attempts: get_env_parsed("AUTOSAVE_MAX_ATTEMPTS", 3)?,
            },
        })
    }

    /// Base URL logos are served from for a server bound to `port`.
    pub fn public_base_url(&self, port: u16) -> String {
        self.storage
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", port))
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}
