//! Model provider abstraction and wire clients

pub mod adapter;
pub mod clients;
pub mod factory;
pub mod traits;
pub mod types;

pub use factory::ProviderFactory;
pub use traits::{ModelEventStream, ModelProvider};
pub use types::{CapabilityAdvert, InvocationRequest, ModelError, ModelEvent, TurnRequest};
