//! Message-blocks provider family
//!
//! One POST per turn; the whole response arrives as a single message
//! listing content blocks, which are replayed as the neutral event
//! sequence.

use super::base::HttpProviderBase;
use crate::constants::{ANTHROPIC_VERSION, DEFAULT_MAX_TOKENS};
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::{ModelEventStream, ModelProvider};
use crate::infrastructure::model::types::{InvocationRequest, ModelError, ModelEvent, TurnRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

pub struct AnthropicClient {
    base: HttpProviderBase,
    model: String,
}

impl AnthropicClient {
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
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[async_trait]
impl ModelProvider for AnthropicClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn stream_turn(&self, request: TurnRequest) -> Result<ModelEventStream, ModelError> {
        let api_key = self.base.require_api_key()?.to_string();

        let mut body = json!({
            "model": self.model,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "messages": MessageAdapter::to_anthropic_messages(&request.turns),
        });
        if let Some(system) = request.system_prompt.as_deref() {
            body["system"] = json!(system);
        }
        if !request.capabilities.is_empty() {
            body["tools"] = Value::Array(MessageAdapter::to_anthropic_tools(&request.capabilities));
        }

        let response = self
            .base
            .http
            .post(self.base.build_url("v1/messages"))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|source| ModelError::http(&self.base.id, source))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::api(
                &self.base.id,
                status.as_u16(),
                api_error_detail(&detail),
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|source| ModelError::invalid_response(&self.base.id, source.to_string()))?;
        debug!(provider = %self.base.id, stop_reason = ?parsed.stop_reason, "Model turn completed");
        Ok(events_from_response(parsed))
    }
}

/// The whole turn arrived at once; replay its blocks in order.
fn events_from_response(response: MessagesResponse) -> ModelEventStream {
    let events: Vec<Result<ModelEvent, ModelError>> = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(Ok(ModelEvent::TextDelta(text))),
            ContentBlock::ToolUse { id, name, input } => Some(Ok(ModelEvent::Invocation(
                InvocationRequest::valid(id, name, input),
            ))),
            ContentBlock::Unknown => None,
        })
        .collect();
    Box::pin(tokio_stream::iter(events))
}

/// API error bodies nest the message under `error.message`; fall back
/// to the raw body, truncated.
fn api_error_detail(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(message) = parsed
            .pointer("/error/message")
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error detail".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn blocks_replay_in_order_and_unknown_blocks_are_skipped() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "thinking", "thinking": "internal"},
                {"type": "tool_use", "id": "toolu_1", "name": "get_feed", "input": {"limit": 5}},
            ],
            "stop_reason": "tool_use",
        }))
        .unwrap();

        let events: Vec<_> = events_from_response(response).collect().await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &ModelEvent::TextDelta("Let me check.".into())
        );
        match events[1].as_ref().unwrap() {
            ModelEvent::Invocation(invocation) => {
                assert_eq!(invocation.id, "toolu_1");
                assert_eq!(invocation.name, "get_feed");
                assert_eq!(invocation.input, json!({"limit": 5}));
                assert!(invocation.argument_error.is_none());
            }
            other => panic!("expected invocation, got {other:?}"),
        }
    }

    #[test]
    fn error_detail_prefers_the_nested_message() {
        let body = r#"{"type": "error", "error": {"type": "invalid_request_error", "message": "max_tokens required"}}"#;
        assert_eq!(api_error_detail(body), "max_tokens required");
        assert_eq!(api_error_detail("plain failure"), "plain failure");
        assert_eq!(api_error_detail("  "), "no error detail");
    }
}
