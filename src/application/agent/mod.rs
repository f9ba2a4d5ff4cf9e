//! Conversation loop between the model and the capability layer

mod events;
mod models;
mod runner;


pub use events::{AgentEvent, ChatOutcome};
pub use models::AgentOptions;
pub use runner::Agent;
