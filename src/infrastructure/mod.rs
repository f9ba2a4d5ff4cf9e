//! Infrastructure adapters: persisted state, platform HTTP, model providers

pub mod cooldown;
pub mod credentials;
pub mod model;
pub mod platform;
