//! Conversation history as an ordered sequence of turns
//!
//! The history is provider-neutral: model clients render it into their
//! own wire format, and the orchestration loop appends to it without
//! knowing which provider is active.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One piece of a turn's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnBlock {
    Text {
        text: String,
    },
    /// Capability call requested by the model.
    Invocation {
        id: String,
        name: String,
        input: Value,
    },
    /// Result paired with an earlier invocation through `id`.
    Outcome {
        id: String,
        name: String,
        output: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub blocks: Vec<TurnBlock>,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            blocks: vec![TurnBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant(blocks: Vec<TurnBlock>) -> Self {
        Self {
            role: TurnRole::Assistant,
            blocks,
        }
    }
}

/// Ordered history owned by one orchestration loop.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::user_text(text));
    }

    /// Append capability outcomes as one user-role turn so the next
    /// inference round sees them paired with their invocations.
    pub fn push_outcomes(&mut self, outcomes: Vec<TurnBlock>) {
        if outcomes.is_empty() {
            return;
        }
        self.turns.push(Turn {
            role: TurnRole::User,
            blocks: outcomes,
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// True when every invocation in the history has a later outcome
    /// carrying the same id.
    pub fn is_settled(&self) -> bool {
        let mut pending: Vec<&str> = Vec::new();
        for turn in &self.turns {
            for block in &turn.blocks {
                match block {
                    TurnBlock::Invocation { id, .. } => pending.push(id),
                    TurnBlock::Outcome { id, .. } => pending.retain(|open| open != id),
                    TurnBlock::Text { .. } => {}
                }
            }
        }
        pending.is_empty()
    }
}
