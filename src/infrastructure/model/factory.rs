//! Provider construction from configuration

use super::clients::{AnthropicClient, OpenAiClient};
use super::traits::ModelProvider;
use crate::config::{ModelProviderConfig, ProviderFamily};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &ModelProviderConfig) -> Arc<dyn ModelProvider> {
        let api_key = resolve_api_key(config);
        info!(
            provider = %config.id,
            family = config.family.as_str(),
            model = %config.model,
            key_present = api_key.is_some(),
            "Building model provider"
        );
        match config.family {
            ProviderFamily::Anthropic => Arc::new(AnthropicClient::new(
                &config.id,
                &config.endpoint,
                api_key,
                &config.model,
            )),
            ProviderFamily::OpenAi => Arc::new(OpenAiClient::new(
                &config.id,
                &config.endpoint,
                api_key,
                &config.model,
            )),
        }
    }
}

/// Literal keys pass through; `${VAR_NAME}` references resolve from the
/// environment. An unset variable resolves to no key, which fails at
/// call time rather than here.
fn resolve_api_key(config: &ModelProviderConfig) -> Option<String> {
    let raw = config.api_key.as_deref()?;
    if let Some(variable) = raw.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        match std::env::var(variable) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => {
                warn!(provider = %config.id, variable, "API key variable is not set");
                None
            }
        }
    } else if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
