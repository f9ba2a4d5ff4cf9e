//! Shared HTTP plumbing for provider clients

use crate::infrastructure::model::types::ModelError;
use reqwest::Client;

/// Common state carried by every HTTP-backed provider.
pub struct HttpProviderBase {
    pub id: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub http: Client,
}

impl HttpProviderBase {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            http: Client::new(),
        }
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// Key resolution already happened at construction; an empty or
    /// absent key fails here, at call time, with a user-facing error.
    pub fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ModelError::missing_api_key(&self.id))
    }
}
