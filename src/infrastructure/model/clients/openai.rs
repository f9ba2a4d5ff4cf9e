//! Delta-chunks provider family
//!
//! SSE stream of incremental deltas. Text forwards as it arrives; tool
//! calls accumulate per index until the stream finishes, then parse and
//! emit. Malformed accumulated arguments become an invocation-level
//! protocol error rather than killing the turn.

use super::base::HttpProviderBase;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::{ModelEventStream, ModelProvider};
use crate::infrastructure::model::types::{InvocationRequest, ModelError, ModelEvent, TurnRequest};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

const EVENT_BUFFER: usize = 32;

pub struct OpenAiClient {
    base: HttpProviderBase,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base: HttpProviderBase::new(id, endpoint, api_key),
            model: model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: FunctionDelta,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// One tool call being assembled across chunks.
#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl PendingCall {
    fn absorb(&mut self, delta: ToolCallDelta) {
        if let Some(id) = delta.id {
            self.id = Some(id);
        }
        if let Some(name) = delta.function.name {
            self.name.push_str(&name);
        }
        if let Some(arguments) = delta.function.arguments {
            self.arguments.push_str(&arguments);
        }
    }

    /// Missing wire ids get a generated one so invocation/outcome
    /// pairing still holds downstream.
    fn into_invocation(self) -> InvocationRequest {
        let id = self
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.arguments.trim().is_empty() {
            return InvocationRequest::valid(id, self.name, json!({}));
        }
        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(input) => InvocationRequest::valid(id, self.name, input),
            Err(error) => InvocationRequest::malformed(
                id,
                self.name,
                format!("arguments were not valid JSON: {error}"),
            ),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn stream_turn(&self, request: TurnRequest) -> Result<ModelEventStream, ModelError> {
        let api_key = self.base.require_api_key()?.to_string();

        let mut body = json!({
            "model": self.model,
            "stream": true,
            "messages": MessageAdapter::to_openai_messages(
                request.system_prompt.as_deref(),
                &request.turns,
            ),
        });
        if !request.capabilities.is_empty() {
            body["tools"] = Value::Array(MessageAdapter::to_openai_tools(&request.capabilities));
        }

        let builder = self
            .base
            .http
            .post(self.base.build_url("v1/chat/completions"))
            .bearer_auth(api_key)
            .json(&body);
        let source = EventSource::new(builder)
            .map_err(|error| ModelError::stream(&self.base.id, error.to_string()))?;

        let provider = self.base.id.clone();
        let (events, receiver) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(provider, source, events));
        Ok(Box::pin(ReceiverStream::new(receiver)))
    }
}

/// Drives the SSE connection until `[DONE]`, a finish reason, or a
/// failure, then flushes accumulated tool calls in index order.
async fn pump_events(
    provider: String,
    mut source: EventSource,
    events: mpsc::Sender<Result<ModelEvent, ModelError>>,
) {
    let mut pending: BTreeMap<usize, PendingCall> = BTreeMap::new();
    let mut finished = false;

    while let Some(event) = source.next().await {
        match event {
            Ok(Event::Open) => {}
            Ok(Event::Message(message)) => {
                if message.data.trim() == "[DONE]" {
                    break;
                }
                let chunk: StreamChunk = match serde_json::from_str(&message.data) {
                    Ok(chunk) => chunk,
                    Err(error) => {
                        warn!(provider = %provider, %error, "Skipping malformed stream chunk");
                        continue;
                    }
                };
                for choice in chunk.choices {
                    if let Some(text) = choice.delta.content {
                        if !text.is_empty()
                            && events.send(Ok(ModelEvent::TextDelta(text))).await.is_err()
                        {
                            return;
                        }
                    }
                    for delta in choice.delta.tool_calls {
                        pending.entry(delta.index).or_default().absorb(delta);
                    }
                    if choice.finish_reason.is_some() {
                        finished = true;
                    }
                }
                if finished {
                    break;
                }
            }
            Err(reqwest_eventsource::Error::StreamEnded) => break,
            Err(reqwest_eventsource::Error::InvalidStatusCode(status, _response)) => {
                let _ = events
                    .send(Err(ModelError::api(
                        &provider,
                        status.as_u16(),
                        "streaming request rejected",
                    )))
                    .await;
                return;
            }
            Err(reqwest_eventsource::Error::Transport(source)) => {
                let _ = events.send(Err(ModelError::http(&provider, source))).await;
                return;
            }
            Err(error) => {
                let _ = events
                    .send(Err(ModelError::stream(&provider, error.to_string())))
                    .await;
                return;
            }
        }
    }

    for (_, call) in pending {
        if events
            .send(Ok(ModelEvent::Invocation(call.into_invocation())))
            .await
            .is_err()
        {
            return;
        }
    }
}
