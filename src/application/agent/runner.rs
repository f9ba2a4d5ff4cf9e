use super::events::{AgentEvent, ChatOutcome};
use super::models::AgentOptions;
use crate::application::capabilities::CapabilityRegistry;
use crate::domain::conversation::{Conversation, Turn, TurnBlock};
use crate::infrastructure::model::{InvocationRequest, ModelEvent, ModelProvider, TurnRequest};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 32;

const DEFAULT_SYSTEM_PROMPT: &str = "You are Talaria, a personal assistant for the AgoraNet \
social platform. You can read the feed, search and analyze posts, and publish content on \
behalf of your operator. Use the available capabilities whenever a request needs live data \
or a platform action, and answer directly when it does not. Posting and commenting are rate \
limited; when a capability reports a cooldown, tell the operator how long to wait instead of \
retrying.";

/// Drives the conversation loop between the model provider and the
/// capability registry. One instance owns one conversation history;
/// concurrent chats on the same instance serialize on it.
pub struct Agent {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<CapabilityRegistry>,
    conversation: Arc<Mutex<Conversation>>,
    options: AgentOptions,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<CapabilityRegistry>,
        options: AgentOptions,
    ) -> Self {
        Self {
            provider,
            registry,
            conversation: Arc::new(Mutex::new(Conversation::new())),
            options,
        }
    }

    /// Drops the accumulated history. The next chat starts fresh.
    pub async fn reset(&self) {
        self.conversation.lock().await.clear();
        info!("Conversation history cleared");
    }

    /// Starts a chat run and returns its event stream. The run makes
    /// progress on its own; dropping the stream abandons it after the
    /// in-flight capability settles.
    pub fn chat(&self, message: impl Into<String>) -> ReceiverStream<AgentEvent> {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let worker = ChatWorker {
            provider: self.provider.clone(),
            registry: self.registry.clone(),
            conversation: self.conversation.clone(),
            options: self.options.clone(),
            sender,
        };
        let message = message.into();
        tokio::spawn(async move { worker.run(message).await });
        ReceiverStream::new(receiver)
    }
}

struct ChatWorker {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<CapabilityRegistry>,
    conversation: Arc<Mutex<Conversation>>,
    options: AgentOptions,
    sender: mpsc::Sender<AgentEvent>,
}

impl ChatWorker {
    async fn run(self, message: String) {
        // Held for the whole run so overlapping chats cannot interleave
        // their turns.
        let mut conversation = self.conversation.lock().await;
        conversation.push_user_text(message);

        let system_prompt = self
            .options
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        for round in 1..=self.options.max_rounds {
            let request = TurnRequest {
                system_prompt: Some(system_prompt.clone()),
                capabilities: self.registry.adverts(),
                turns: conversation.turns().to_vec(),
            };

            debug!(round, provider = self.provider.id(), "Submitting turn");
            let mut stream = match self.provider.stream_turn(request).await {
                Ok(stream) => stream,
                Err(error) => {
                    warn!(round, error = %error, "Model turn failed to start");
                    self.emit(AgentEvent::Error {
                        message: error.user_message(),
                    })
                    .await;
                    return;
                }
            };

            let mut text = String::new();
            let mut invocations: Vec<InvocationRequest> = Vec::new();
            while let Some(event) = stream.next().await {
                match event {
                    Ok(ModelEvent::TextDelta(delta)) => {
                        text.push_str(&delta);
                        // Already-forwarded text stands even if the turn
                        // later fails.
                        if !self.emit(AgentEvent::Text { text: delta }).await {
                            return;
                        }
                    }
                    Ok(ModelEvent::Invocation(invocation)) => invocations.push(invocation),
                    Err(error) => {
                        warn!(round, error = %error, "Model stream broke mid-turn");
                        self.emit(AgentEvent::Error {
                            message: error.user_message(),
                        })
                        .await;
                        return;
                    }
                }
            }

            conversation.push(assistant_turn(text, &invocations));

            if invocations.is_empty() {
                info!(round, "Chat run completed");
                self.emit(AgentEvent::Done {
                    outcome: ChatOutcome::Completed,
                })
                .await;
                return;
            }

            let mut outcomes = Vec::with_capacity(invocations.len());
            let mut abandoned = false;
            for invocation in invocations {
                if abandoned {
                    outcomes.push(settled_outcome(&invocation, abandoned_output()));
                    continue;
                }
                if !self
                    .emit(AgentEvent::CapabilityStart {
                        id: invocation.id.clone(),
                        name: invocation.name.clone(),
                        input: invocation.input.clone(),
                    })
                    .await
                {
                    abandoned = true;
                    outcomes.push(settled_outcome(&invocation, abandoned_output()));
                    continue;
                }

                let output = self.resolve(&invocation).await;
                let delivered = self
                    .emit(AgentEvent::CapabilityEnd {
                        id: invocation.id.clone(),
                        name: invocation.name.clone(),
                        output: output.clone(),
                    })
                    .await;
                outcomes.push(settled_outcome(&invocation, output));
                if !delivered {
                    abandoned = true;
                }
            }

            // Outcomes land in the history even on abandonment so every
            // recorded invocation stays settled.
            conversation.push_outcomes(outcomes);
            if abandoned {
                debug!(round, "Chat run abandoned by its consumer");
                return;
            }
        }

        info!(
            max_rounds = self.options.max_rounds,
            "Chat run stopped at the round limit"
        );
        self.emit(AgentEvent::Done {
            outcome: ChatOutcome::TurnLimitReached,
        })
        .await;
    }

    /// Produces the outcome payload for one invocation. Calls that
    /// arrived with unparseable arguments are answered without touching
    /// the registry.
    async fn resolve(&self, invocation: &InvocationRequest) -> Value {
        if let Some(reason) = &invocation.argument_error {
            warn!(
                capability = %invocation.name,
                reason = %reason,
                "Invocation arrived with unparseable arguments"
            );
            return json!({
                "success": false,
                "error": format!("capability arguments could not be parsed: {reason}"),
                "hint": "resend the call with valid JSON arguments",
            });
        }
        self.registry
            .dispatch(&invocation.name, &invocation.input)
            .await
    }

    /// False means the receiver is gone and the run should wind down.
    async fn emit(&self, event: AgentEvent) -> bool {
        if self.sender.send(event).await.is_err() {
            debug!("Event receiver dropped");
            return false;
        }
        true
    }
}

fn assistant_turn(text: String, invocations: &[InvocationRequest]) -> Turn {
    let mut blocks = Vec::new();
    if !text.is_empty() {
        blocks.push(TurnBlock::Text { text });
    }
    for invocation in invocations {
        blocks.push(TurnBlock::Invocation {
            id: invocation.id.clone(),
            name: invocation.name.clone(),
            input: invocation.input.clone(),
        });
    }
    Turn::assistant(blocks)
}

fn settled_outcome(invocation: &InvocationRequest, output: Value) -> TurnBlock {
    TurnBlock::Outcome {
        id: invocation.id.clone(),
        name: invocation.name.clone(),
        output,
    }
}

fn abandoned_output() -> Value {
    json!({
        "success": false,
        "error": "the call was abandoned before this capability ran",
    })
}
