//! Provider seam

use super::types::{ModelError, ModelEvent, TurnRequest};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Ordered events for one model turn.
pub type ModelEventStream = Pin<Box<dyn Stream<Item = Result<ModelEvent, ModelError>> + Send>>;

/// A model backend able to run one inference turn.
///
/// Implementations translate their own wire protocol into the neutral
/// [`ModelEvent`] sequence, so the orchestration loop behaves
/// identically whichever family is configured.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn stream_turn(&self, request: TurnRequest) -> Result<ModelEventStream, ModelError>;
}
