//! Core domain types shared across layers

pub mod conversation;
pub mod platform;

pub use conversation::{Conversation, Turn, TurnBlock, TurnRole};
pub use platform::{AgentProfile, Comment, FeedPost, VoteDirection};
