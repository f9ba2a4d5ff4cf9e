//! Configuration loading, validation, and provider entries

pub mod app;
pub mod error;
pub mod loader;
pub mod provider;

pub use app::{AppConfig, PlatformConfig};
pub use error::ConfigError;
pub use loader::ensure_env_loaded;
pub use provider::{ModelProviderConfig, ProviderFamily};
