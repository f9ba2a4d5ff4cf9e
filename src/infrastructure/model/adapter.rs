//! Conversation adapters
//!
//! Pure rendering of the neutral history into each provider family's
//! wire format. No I/O here; clients call these when building request
//! bodies.

use super::types::CapabilityAdvert;
use crate::domain::conversation::{Turn, TurnBlock, TurnRole};
use serde_json::{Value, json};

pub struct MessageAdapter;

impl MessageAdapter {
    /// Message-blocks format: each turn is one message whose content is
    /// a block list. Capability outcomes travel as `tool_result` blocks
    /// inside a user message, paired by `tool_use_id`.
    pub fn to_anthropic_messages(turns: &[Turn]) -> Vec<Value> {
        turns
            .iter()
            .map(|turn| {
                let content: Vec<Value> = turn
                    .blocks
                    .iter()
                    .map(|block| match block {
                        TurnBlock::Text { text } => json!({"type": "text", "text": text}),
                        TurnBlock::Invocation { id, name, input } => {
                            json!({"type": "tool_use", "id": id, "name": name, "input": input})
                        }
                        TurnBlock::Outcome { id, output, .. } => json!({
                            "type": "tool_result",
                            "tool_use_id": id,
                            "content": output.to_string(),
                        }),
                    })
                    .collect();
                json!({"role": turn.role.as_str(), "content": content})
            })
            .collect()
    }

    pub fn to_anthropic_tools(capabilities: &[CapabilityAdvert]) -> Vec<Value> {
        capabilities
            .iter()
            .map(|capability| {
                json!({
                    "name": capability.name,
                    "description": capability.description,
                    "input_schema": capability.schema,
                })
            })
            .collect()
    }

    /// Delta-chunks format: the system prompt is a leading message,
    /// assistant invocations become `tool_calls` entries with stringified
    /// arguments, and outcomes become `role: "tool"` messages keyed by
    /// `tool_call_id`.
    pub fn to_openai_messages(system_prompt: Option<&str>, turns: &[Turn]) -> Vec<Value> {
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        for turn in turns {
            match turn.role {
                TurnRole::Assistant => {
                    let mut text = String::new();
                    let mut tool_calls = Vec::new();
                    for block in &turn.blocks {
                        match block {
                            TurnBlock::Text { text: fragment } => text.push_str(fragment),
                            TurnBlock::Invocation { id, name, input } => tool_calls.push(json!({
                                "id": id,
                                "type": "function",
                                "function": {"name": name, "arguments": input.to_string()},
                            })),
                            TurnBlock::Outcome { .. } => {}
                        }
                    }
                    let mut message = json!({"role": "assistant"});
                    message["content"] = if text.is_empty() {
                        Value::Null
                    } else {
                        Value::String(text)
                    };
                    if !tool_calls.is_empty() {
                        message["tool_calls"] = Value::Array(tool_calls);
                    }
                    messages.push(message);
                }
                TurnRole::User => {
                    for block in &turn.blocks {
                        match block {
                            TurnBlock::Text { text } => {
                                messages.push(json!({"role": "user", "content": text}));
                            }
                            TurnBlock::Outcome { id, name, output } => messages.push(json!({
                                "role": "tool",
                                "tool_call_id": id,
                                "name": name,
                                "content": output.to_string(),
                            })),
                            TurnBlock::Invocation { .. } => {}
                        }
                    }
                }
            }
        }
        messages
    }

    pub fn to_openai_tools(capabilities: &[CapabilityAdvert]) -> Vec<Value> {
        capabilities
            .iter()
            .map(|capability| {
                json!({
                    "type": "function",
                    "function": {
                        "name": capability.name,
                        "description": capability.description,
                        "parameters": capability.schema,
                    },
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Turn> {
        vec![
            Turn::user_text("find something"),
            Turn::assistant(vec![
                TurnBlock::Text {
                    text: "Searching.".into(),
                },
                TurnBlock::Invocation {
                    id: "inv-1".into(),
                    name: "search_posts".into(),
                    input: json!({"query": "rust"}),
                },
            ]),
            Turn {
                role: TurnRole::User,
                blocks: vec![TurnBlock::Outcome {
                    id: "inv-1".into(),
                    name: "search_posts".into(),
                    output: json!({"success": true}),
                }],
            },
        ]
    }

    #[test]
    fn anthropic_pairs_tool_result_by_id() {
        let messages = MessageAdapter::to_anthropic_messages(&history());

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"][1]["type"], "tool_use");
        assert_eq!(messages[1]["content"][1]["id"], "inv-1");
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["tool_use_id"], "inv-1");
    }

    #[test]
    fn openai_flattens_blocks_into_typed_messages() {
        let messages = MessageAdapter::to_openai_messages(Some("be brief"), &history());

        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["content"], "Searching.");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["name"],
            "search_posts"
        );
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"query":"rust"}"#
        );
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "inv-1");
    }

    #[test]
    fn assistant_without_text_sends_null_content() {
        let turns = vec![Turn::assistant(vec![TurnBlock::Invocation {
            id: "inv-1".into(),
            name: "get_feed".into(),
            input: json!({}),
        }])];
        let messages = MessageAdapter::to_openai_messages(None, &turns);
        assert!(messages[0]["content"].is_null());
    }

    #[test]
    fn tool_catalogs_follow_each_wire_shape() {
        let adverts = vec![CapabilityAdvert {
            name: "echo".into(),
            description: "Echo text back".into(),
            schema: json!({"type": "object", "properties": {}}),
        }];

        let anthropic = MessageAdapter::to_anthropic_tools(&adverts);
        assert_eq!(anthropic[0]["name"], "echo");
        assert!(anthropic[0]["input_schema"].is_object());

        let openai = MessageAdapter::to_openai_tools(&adverts);
        assert_eq!(openai[0]["type"], "function");
        assert_eq!(openai[0]["function"]["name"], "echo");
        assert!(openai[0]["function"]["parameters"].is_object());
    }
}
