//! HTTP execution against the platform with bounded linear retry
//!
//! Every capability goes through [`PlatformTransport::execute`]. The
//! transport resolves the credential, attaches the bearer token, and
//! classifies the response: success stamps `last_active`, rate limits
//! and client errors settle immediately, server and network faults
//! retry with a linear backoff before giving up.

use super::error::TransportError;
use crate::constants::{TRANSPORT_BASE_DELAY_MS, TRANSPORT_MAX_ATTEMPTS};
use crate::infrastructure::credentials::CredentialStore;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Successful platform call with its diagnostic metadata.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub payload: Value,
    pub endpoint: String,
    pub attempts: u32,
    pub identity: String,
}

pub struct PlatformTransport {
    base_url: String,
    http: Client,
    credentials: Arc<CredentialStore>,
    max_attempts: u32,
    base_delay: Duration,
}

impl PlatformTransport {
    pub fn new(base_url: impl Into<String>, credentials: Arc<CredentialStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: Client::new(),
            credentials,
            max_attempts: TRANSPORT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(TRANSPORT_BASE_DELAY_MS),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub async fn get(
        &self,
        endpoint: &str,
        identity: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.execute(Method::GET, endpoint, &[], None, identity)
            .await
    }

    pub async fn get_with_query(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        identity: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.execute(Method::GET, endpoint, query, None, identity)
            .await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        identity: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.execute(Method::POST, endpoint, &[], Some(body), identity)
            .await
    }

    pub async fn delete(
        &self,
        endpoint: &str,
        identity: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.execute(Method::DELETE, endpoint, &[], None, identity)
            .await
    }

    pub async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        identity: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let secret = self
            .credentials
            .active_secret(identity)
            .ok_or(TransportError::NoCredential)?;
        let identity_name = match identity {
            Some(name) => name.to_string(),
            None => self
                .credentials
                .active_identity()
                .map(|resolved| resolved.name)
                .unwrap_or_default(),
        };

        let url = self.build_url(endpoint);
        let mut attempt = 1u32;
        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&secret)
                .header(CONTENT_TYPE, "application/json");
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        self.credentials.touch_last_active(identity);
                        let payload = response.json::<Value>().await.unwrap_or(Value::Null);
                        debug!(endpoint, attempts = attempt, identity = %identity_name, "Platform call succeeded");
                        return Ok(TransportResponse {
                            payload,
                            endpoint: endpoint.to_string(),
                            attempts: attempt,
                            identity: identity_name,
                        });
                    }

                    let payload = response.json::<Value>().await.unwrap_or(Value::Null);
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        warn!(endpoint, "Platform rate limit hit");
                        return Err(rate_limited(endpoint, &payload));
                    }
                    if status.is_client_error() {
                        return Err(TransportError::Client {
                            endpoint: endpoint.to_string(),
                            status: status.as_u16(),
                            message: error_message(&payload, status),
                            hint: error_hint(&payload),
                        });
                    }

                    if attempt >= self.max_attempts {
                        return Err(TransportError::Server {
                            endpoint: endpoint.to_string(),
                            status: status.as_u16(),
                            message: error_message(&payload, status),
                            attempts: attempt,
                        });
                    }
                    warn!(endpoint, status = status.as_u16(), attempt, "Server error, retrying");
                }
                Err(source) => {
                    if attempt >= self.max_attempts {
                        return Err(TransportError::Network {
                            endpoint: endpoint.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                    warn!(endpoint, attempt, error = %source, "Network failure, retrying");
                }
            }

            tokio::time::sleep(self.base_delay * attempt).await;
            attempt += 1;
        }
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

fn error_message(payload: &Value, status: StatusCode) -> String {
    payload
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn error_hint(payload: &Value) -> Option<String> {
    payload
        .get("hint")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn rate_limited(endpoint: &str, payload: &Value) -> TransportError {
    let retry_after_secs = payload
        .get("retry_after_seconds")
        .and_then(Value::as_u64)
        .or_else(|| {
            payload
                .get("retry_after_minutes")
                .and_then(Value::as_u64)
                .map(|minutes| minutes * 60)
        });
    let daily_remaining = payload.get("daily_remaining").and_then(Value::as_i64);
    TransportError::RateLimited {
        endpoint: endpoint.to_string(),
        retry_after_secs,
        daily_remaining,
    }
}
