//! Validated application configuration

use super::error::ConfigError;
use super::provider::ModelProviderConfig;
use std::path::{Path, PathBuf};

/// Platform connection settings.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    pub credentials_path: PathBuf,
    pub cooldown_path: PathBuf,
}

/// Application configuration after validation. Loaded from
/// `config/talaria.toml`; built-in defaults apply when the file is
/// absent.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub platform: PlatformConfig,
    pub default_provider: String,
    pub providers: Vec<ModelProviderConfig>,
    pub system_prompt: Option<String>,
    pub max_rounds: usize,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    pub fn provider(&self, id: &str) -> Option<&ModelProviderConfig> {
        self.providers.iter().find(|provider| provider.id == id)
    }

    /// Provider selected for this run: the explicit override when given,
    /// otherwise the configured default.
    pub fn select_provider(&self, id: Option<&str>) -> Result<&ModelProviderConfig, ConfigError> {
        let id = id.unwrap_or(&self.default_provider);
        self.provider(id)
            .ok_or_else(|| ConfigError::ProviderNotFound(id.to_string()))
    }
}
