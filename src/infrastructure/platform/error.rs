//! Platform transport error taxonomy
//!
//! Retry handling happens inside the transport; by the time one of
//! these surfaces, the call is settled. `user_message` and `hint` feed
//! the structured failure payloads handed back to the model.

use crate::constants::CREDENTIALS_PATH;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no active credential available")]
    NoCredential,

    #[error("rate limited by the platform on {endpoint}")]
    RateLimited {
        endpoint: String,
        retry_after_secs: Option<u64>,
        daily_remaining: Option<i64>,
    },

    #[error("platform rejected {endpoint} ({status}): {message}")]
    Client {
        endpoint: String,
        status: u16,
        message: String,
        hint: Option<String>,
    },

    #[error("platform server error on {endpoint} ({status}) after {attempts} attempts: {message}")]
    Server {
        endpoint: String,
        status: u16,
        message: String,
        attempts: u32,
    },

    #[error("network failure reaching {endpoint} after {attempts} attempts")]
    Network {
        endpoint: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// True for failures worth retrying through the degraded search
    /// fallback: the platform itself is at fault, not the request.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            TransportError::Server { .. } | TransportError::Network { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            TransportError::NoCredential => format!(
                "No active agent credential. Add an agent to {CREDENTIALS_PATH} or mark one as active."
            ),
            TransportError::RateLimited {
                retry_after_secs,
                daily_remaining,
                ..
            } => {
                let mut message = match retry_after_secs {
                    Some(secs) => format!(
                        "The platform rate limit was hit. Try again in {}.",
                        human_wait_secs(*secs)
                    ),
                    None => "The platform rate limit was hit. Try again later.".to_string(),
                };
                if let Some(remaining) = daily_remaining {
                    message.push_str(&format!(" {remaining} actions remain today."));
                }
                message
            }
            TransportError::Client {
                status, message, ..
            } => format!("The platform rejected the request (HTTP {status}): {message}"),
            TransportError::Server {
                status, attempts, ..
            } => format!(
                "The platform is having trouble (HTTP {status}); gave up after {attempts} attempts."
            ),
            TransportError::Network { attempts, .. } => {
                format!("Could not reach the platform after {attempts} attempts.")
            }
        }
    }

    /// Remediation hint for structured failure payloads, when one exists.
    pub fn hint(&self) -> Option<String> {
        match self {
            TransportError::NoCredential => Some(format!(
                "add an agent entry to {CREDENTIALS_PATH} and set it active"
            )),
            TransportError::RateLimited {
                retry_after_secs, ..
            } => Some(match retry_after_secs {
                Some(secs) => format!("wait {} before retrying", human_wait_secs(*secs)),
                None => "wait before retrying".to_string(),
            }),
            TransportError::Client { hint, .. } => hint.clone(),
            TransportError::Server { .. } | TransportError::Network { .. } => None,
        }
    }
}

/// Human-readable wait phrase from whole seconds.
pub(crate) fn human_wait_secs(secs: u64) -> String {
    if secs >= 60 {
        let minutes = secs.div_ceil(60);
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{minutes} minutes")
        }
    } else if secs == 1 {
        "1 second".to_string()
    } else {
        format!("{secs} seconds")
    }
}
