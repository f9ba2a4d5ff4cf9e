//! Wire clients for each provider family

pub mod anthropic;
pub mod base;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
