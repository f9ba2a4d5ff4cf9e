//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("default provider '{0}' is not defined in [[providers]]")]
    DefaultProviderNotFound(String),

    #[error("provider '{0}' is not defined in [[providers]]")]
    ProviderNotFound(String),

    #[error("provider '{0}' is missing an endpoint")]
    MissingEndpoint(String),

    #[error("provider '{0}' is missing a model")]
    MissingModel(String),

    #[error("provider '{0}' has unknown family '{1}'")]
    UnknownFamily(String, String),
}
