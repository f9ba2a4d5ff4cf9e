//! Configuration loading and validation
//!
//! Reads `config/talaria.toml` into raw structs, then validates into
//! [`AppConfig`]. A missing file falls back to built-in defaults; a
//! malformed file is a startup error.

use super::app::{AppConfig, PlatformConfig};
use super::error::ConfigError;
use super::provider::{ModelProviderConfig, ProviderFamily, RawProviderConfig};
use crate::constants::{
    CONFIG_PATH, COOLDOWN_PATH, CREDENTIALS_PATH, DEFAULT_MAX_ROUNDS, DEFAULT_PLATFORM_BASE_URL,
    ENV_PATH,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, info};

static ENV_LOADER: Once = Once::new();

/// Load `config/.env` once per process so `${VAR}` references resolve.
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| match dotenvy::from_filename(ENV_PATH) {
        Ok(_) => info!(path = ENV_PATH, "Loaded environment overrides"),
        Err(_) => debug!(path = ENV_PATH, "No environment file found"),
    });
}

#[derive(Debug, Default, Deserialize)]
struct RawAppConfig {
    #[serde(default)]
    platform: RawPlatformConfig,
    #[serde(default)]
    agent: RawAgentConfig,
    #[serde(default)]
    default_provider: Option<String>,
    #[serde(default)]
    providers: Vec<RawProviderConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlatformConfig {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    credentials_path: Option<String>,
    #[serde(default)]
    cooldown_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAgentConfig {
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    max_rounds: Option<usize>,
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    let path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    let raw = match std::fs::read_to_string(path) {
        Ok(contents) => {
            toml::from_str::<RawAppConfig>(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "Config file not found, using built-in defaults");
            RawAppConfig::default()
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    validate_and_build(raw)
}

fn validate_and_build(raw: RawAppConfig) -> Result<AppConfig, ConfigError> {
    let providers = if raw.providers.is_empty() {
        default_providers()
    } else {
        raw.providers
            .into_iter()
            .map(ModelProviderConfig::from_raw)
            .collect::<Result<Vec<_>, _>>()?
    };

    let default_provider = raw
        .default_provider
        .unwrap_or_else(|| providers[0].id.clone());
    if !providers.iter().any(|entry| entry.id == default_provider) {
        return Err(ConfigError::DefaultProviderNotFound(default_provider));
    }

    let platform = PlatformConfig {
        base_url: raw
            .platform
            .base_url
            .unwrap_or_else(|| DEFAULT_PLATFORM_BASE_URL.to_string()),
        credentials_path: expand_path(
            raw.platform
                .credentials_path
                .as_deref()
                .unwrap_or(CREDENTIALS_PATH),
        ),
        cooldown_path: expand_path(
            raw.platform
                .cooldown_path
                .as_deref()
                .unwrap_or(COOLDOWN_PATH),
        ),
    };

    Ok(AppConfig {
        platform,
        default_provider,
        providers,
        system_prompt: raw.agent.system_prompt,
        max_rounds: raw.agent.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS),
    })
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn default_providers() -> Vec<ModelProviderConfig> {
    vec![
        ModelProviderConfig {
            id: "anthropic".to_string(),
            family: ProviderFamily::Anthropic,
            endpoint: "https://api.anthropic.com".to_string(),
            api_key: Some("${ANTHROPIC_API_KEY}".to_string()),
            model: "claude-sonnet-4-20250514".to_string(),
        },
        ModelProviderConfig {
            id: "openai".to_string(),
            family: ProviderFamily::OpenAi,
            endpoint: "https://api.openai.com".to_string(),
            api_key: Some("${OPENAI_API_KEY}".to_string()),
            model: "gpt-4o-mini".to_string(),
        },
    ]
}
