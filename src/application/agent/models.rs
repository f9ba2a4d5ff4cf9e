use crate::constants::DEFAULT_MAX_ROUNDS;

/// Tunables for a chat run.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub system_prompt: Option<String>,
    pub max_rounds: usize,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl AgentOptions {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Rounds below one are clamped up so a run can always make at
    /// least one model call.
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }
}
