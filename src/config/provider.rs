//! Model provider configuration

use super::error::ConfigError;
use serde::Deserialize;

/// Wire protocol family a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// Message-blocks protocol: one response message listing content blocks.
    Anthropic,
    /// Delta-chunks protocol: SSE stream of incremental deltas.
    OpenAi,
}

impl ProviderFamily {
    /// Parse a family label from config.
    ///
    /// ```
    /// use talaria::config::ProviderFamily;
    ///
    /// assert_eq!(ProviderFamily::parse("Anthropic"), Some(ProviderFamily::Anthropic));
    /// assert_eq!(ProviderFamily::parse("openai"), Some(ProviderFamily::OpenAi));
    /// assert_eq!(ProviderFamily::parse("mystery"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("anthropic") || value.eq_ignore_ascii_case("claude") {
            Some(ProviderFamily::Anthropic)
        } else if value.eq_ignore_ascii_case("openai")
            || value.eq_ignore_ascii_case("openai-compatible")
        {
            Some(ProviderFamily::OpenAi)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderFamily::Anthropic => "anthropic",
            ProviderFamily::OpenAi => "openai",
        }
    }
}

/// One validated model provider entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProviderConfig {
    pub id: String,
    pub family: ProviderFamily,
    pub endpoint: String,
    /// Literal key, or `${VAR_NAME}` resolved from the environment at
    /// provider construction time.
    pub api_key: Option<String>,
    pub model: String,
}

/// Raw `[[providers]]` entry before validation.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct RawProviderConfig {
    pub id: String,
    #[serde(rename = "type", default)]
    pub family: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ModelProviderConfig {
    pub(super) fn from_raw(raw: RawProviderConfig) -> Result<Self, ConfigError> {
        let family = match raw.family.as_deref() {
            None => ProviderFamily::OpenAi,
            Some(label) => ProviderFamily::parse(label)
                .ok_or_else(|| ConfigError::UnknownFamily(raw.id.clone(), label.to_string()))?,
        };
        let endpoint = raw
            .endpoint
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEndpoint(raw.id.clone()))?;
        let model = raw
            .model
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingModel(raw.id.clone()))?;
        Ok(Self {
            id: raw.id,
            family,
            endpoint,
            api_key: raw.api_key,
            model,
        })
    }
}
