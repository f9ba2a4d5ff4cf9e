//! Capability registry
//!
//! Name-indexed dispatch table. Every dispatch returns a JSON object
//! with a `success` flag so handler failures flow back to the model as
//! data instead of aborting the orchestration round.

use super::contract::{InputContract, ValidatedInput};
use crate::infrastructure::model::CapabilityAdvert;
use crate::infrastructure::platform::TransportError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Failure produced by a capability handler.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("cooldown for {action} still active, {wait} left")]
    Cooldown { action: &'static str, wait: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{message}")]
    Failed {
        message: String,
        hint: Option<String>,
    },
}

impl CapabilityError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            hint: None,
        }
    }

    pub fn failed_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CapabilityError::Cooldown { action, wait } => {
                format!("The {action} cooldown is still active. Try again in {wait}.")
            }
            CapabilityError::Transport(error) => error.user_message(),
            CapabilityError::Failed { message, .. } => message.clone(),
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            CapabilityError::Cooldown { wait, .. } => Some(format!("wait {wait} and retry")),
            CapabilityError::Transport(error) => error.hint(),
            CapabilityError::Failed { hint, .. } => hint.clone(),
        }
    }
}

/// One named operation the model may invoke.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn contract(&self) -> &InputContract;

    /// Runs with input that already passed the contract. The returned
    /// object is merged under `success: true`.
    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError>;
}

/// Immutable once built; lookups are case-insensitive on the name.
#[derive(Default)]
pub struct CapabilityRegistry {
    index: HashMap<String, Arc<dyn Capability>>,
    order: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        let name = capability.name();
        self.order.push(name.to_string());
        self.index.insert(name.to_lowercase(), capability);
        self
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Catalog advertised to model providers, in registration order.
    pub fn adverts(&self) -> Vec<CapabilityAdvert> {
        self.order
            .iter()
            .filter_map(|name| self.index.get(&name.to_lowercase()))
            .map(|capability| CapabilityAdvert {
                name: capability.name().to_string(),
                description: capability.description().to_string(),
                schema: capability.contract().json_schema(),
            })
            .collect()
    }

    /// Dispatch one invocation. Unknown names, contract violations, and
    /// handler failures all come back as `success: false` payloads; the
    /// caller never has to abort on them.
    pub async fn dispatch(&self, name: &str, input: &Value) -> Value {
        let Some(capability) = self.index.get(&name.to_lowercase()) else {
            warn!(capability = name, "Unknown capability requested");
            return failure(
                format!("unknown capability '{name}'"),
                Some(format!("available capabilities: {}", self.order.join(", "))),
            );
        };

        match capability.contract().validate(input) {
            Err(violations) => {
                warn!(capability = name, ?violations, "Input rejected by contract");
                failure(
                    format!("invalid input: {}", violations.join("; ")),
                    Some("fix the listed fields and retry".to_string()),
                )
            }
            Ok(valid) => match capability.execute(valid).await {
                Ok(payload) => {
                    info!(capability = name, "Capability executed");
                    success(payload)
                }
                Err(error) => {
                    warn!(capability = name, error = %error, "Capability failed");
                    failure(error.user_message(), error.hint())
                }
            },
        }
    }
}

fn success(payload: Value) -> Value {
    let mut object = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    object.insert("success".to_string(), Value::Bool(true));
    Value::Object(object)
}

fn failure(message: impl Into<String>, hint: Option<String>) -> Value {
    let mut object = Map::new();
    object.insert("success".to_string(), Value::Bool(false));
    object.insert("error".to_string(), Value::String(message.into()));
    if let Some(hint) = hint {
        object.insert("hint".to_string(), Value::String(hint));
    }
    Value::Object(object)
}
