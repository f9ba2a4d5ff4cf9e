//! Line-oriented JSON front end on stdin/stdout
//!
//! Each input line is one request; each output line is one JSON event.
//! A chat request replays the agent's event stream verbatim, so a
//! driving process sees text deltas and capability activity as they
//! happen.

use crate::application::agent::{Agent, AgentEvent};
use crate::application::capabilities::CapabilityRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize stdio response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One request line. `reset` wins over `capability`, which wins over
/// `prompt`.
#[derive(Debug, Deserialize)]
struct StdioRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    capability: Option<String>,
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    reset: bool,
}

pub async fn run(agent: Arc<Agent>, registry: Arc<CapabilityRegistry>) -> Result<(), StdioError> {
    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("Received stdio line");

        match serde_json::from_str::<StdioRequest>(&line) {
            Ok(request) => handle(&agent, &registry, request, &mut stdout).await?,
            Err(error) => {
                error!(%error, "Failed to parse stdio input line");
                write_line(
                    &mut stdout,
                    &error_event(format!("invalid request JSON: {error}")),
                )
                .await?;
            }
        }
    }

    stdout.flush().await?;
    Ok(())
}

async fn handle(
    agent: &Agent,
    registry: &CapabilityRegistry,
    request: StdioRequest,
    stdout: &mut io::Stdout,
) -> Result<(), StdioError> {
    if request.reset {
        agent.reset().await;
        write_line(stdout, &json!({"event": "reset"})).await?;
        return Ok(());
    }

    if let Some(name) = request.capability {
        info!(capability = %name, "Dispatching stdio capability request");
        let input = request.input.unwrap_or(Value::Null);
        let output = registry.dispatch(&name, &input).await;
        write_line(
            stdout,
            &json!({"event": "capability", "name": name, "output": output}),
        )
        .await?;
        return Ok(());
    }

    let Some(prompt) = request.prompt.filter(|prompt| !prompt.trim().is_empty()) else {
        write_line(
            stdout,
            &error_event("request needs a prompt, a capability, or reset"),
        )
        .await?;
        return Ok(());
    };

    info!("Processing stdio chat request");
    let mut events = agent.chat(prompt);
    while let Some(event) = events.next().await {
        write_line(stdout, &event).await?;
    }
    Ok(())
}

fn error_event(message: impl Into<String>) -> AgentEvent {
    AgentEvent::Error {
        message: message.into(),
    }
}

async fn write_line<T: Serialize>(stdout: &mut io::Stdout, payload: &T) -> Result<(), StdioError> {
    let mut line = serde_json::to_vec(payload)?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    stdout.flush().await?;
    Ok(())
}
