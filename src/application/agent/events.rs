use serde::Serialize;
use serde_json::Value;

/// How a chat run ended when it ended on its own terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatOutcome {
    /// The model produced a turn with no capability calls.
    Completed,
    /// The round limit was hit while the model still wanted to act.
    TurnLimitReached,
}

/// One item on the event stream a chat run produces. Exactly one
/// terminal event closes every run that is not abandoned by its
/// consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    Text {
        text: String,
    },
    CapabilityStart {
        id: String,
        name: String,
        input: Value,
    },
    CapabilityEnd {
        id: String,
        name: String,
        output: Value,
    },
    Done {
        outcome: ChatOutcome,
    },
    Error {
        message: String,
    },
}

impl AgentEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done { .. } | AgentEvent::Error { .. })
    }
}
