//! Shared model-layer types and errors

use crate::domain::conversation::Turn;
use serde_json::{Value, json};
use thiserror::Error;

/// Capability description advertised to the model.
#[derive(Debug, Clone)]
pub struct CapabilityAdvert {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// One inference round's input: the system prompt, the capability
/// catalog, and the conversation so far.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub system_prompt: Option<String>,
    pub capabilities: Vec<CapabilityAdvert>,
    pub turns: Vec<Turn>,
}

/// Capability call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub id: String,
    pub name: String,
    pub input: Value,
    /// Set when the wire arguments did not parse. The invocation must
    /// then fail without dispatch so the model can correct itself.
    pub argument_error: Option<String>,
}

impl InvocationRequest {
    pub fn valid(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
            argument_error: None,
        }
    }

    pub fn malformed(
        id: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input: json!({}),
            argument_error: Some(reason.into()),
        }
    }
}

/// Neutral event emitted by every provider family. The orchestration
/// loop consumes only this shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    TextDelta(String),
    Invocation(InvocationRequest),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' has no usable API key")]
    MissingApiKey { provider: String },

    #[error("request to provider '{provider}' failed: {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider '{provider}' returned HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("stream from provider '{provider}' failed: {message}")]
    Stream { provider: String, message: String },

    #[error("provider '{provider}' returned an unexpected response: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl ModelError {
    pub fn missing_api_key(provider: &str) -> Self {
        Self::MissingApiKey {
            provider: provider.to_string(),
        }
    }

    pub fn http(provider: &str, source: reqwest::Error) -> Self {
        Self::Http {
            provider: provider.to_string(),
            source,
        }
    }

    pub fn api(provider: &str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn stream(provider: &str, message: impl Into<String>) -> Self {
        Self::Stream {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ModelError::MissingApiKey { provider } => format!(
                "Provider '{provider}' has no API key. Set it in the config file or the environment."
            ),
            ModelError::Http { provider, .. } => {
                format!("Could not reach provider '{provider}'. Check the endpoint and your connection.")
            }
            ModelError::Api {
                provider, status, ..
            } => format!("Provider '{provider}' rejected the request (HTTP {status})."),
            ModelError::Stream { provider, .. } => {
                format!("The response stream from provider '{provider}' broke off early.")
            }
            ModelError::InvalidResponse { provider, .. } => {
                format!("Provider '{provider}' sent a response this client could not interpret.")
            }
        }
    }
}
