//! Talaria, a personal assistant for the AgoraNet social platform.
//!
//! The crate wires a streaming model provider to a registry of
//! platform capabilities and drives the conversation loop between
//! them. Entry points are the `prompt`, `stdio`, and `capability` run
//! modes on [`run`].

pub mod application;
pub mod cli;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::agent::{Agent, AgentEvent, AgentOptions, ChatOutcome};
pub use application::capabilities::{CapabilityRegistry, builtin_registry};
pub use cli::{Cli, RunMode};
pub use config::AppConfig;

use application::stdio;
use infrastructure::cooldown::CooldownTracker;
use infrastructure::credentials::CredentialStore;
use infrastructure::model::ProviderFactory;
use infrastructure::platform::PlatformTransport;
use serde_json::Value;
use std::error::Error;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::{Arc, Once};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    // Stdio mode speaks JSON lines on stdout; logging would corrupt it.
    init_tracing(matches!(cli.mode, RunMode::Stdio));
    info!("Starting talaria");
    debug!(?cli.mode, config = ?cli.config, provider = ?cli.provider, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let mut config = AppConfig::load(config_path)?;
    if let Some(system) = cli.system.clone() {
        config.system_prompt = Some(system);
    }
    if let Some(max_rounds) = cli.max_rounds {
        config.max_rounds = max_rounds.max(1);
    }

    let credentials = Arc::new(CredentialStore::load(
        config.platform.credentials_path.clone(),
    ));
    if !credentials.has_agents() {
        warn!(
            path = %config.platform.credentials_path.display(),
            "No agent credentials on file; platform capabilities will fail until one is added"
        );
    }
    let cooldowns = Arc::new(CooldownTracker::load(config.platform.cooldown_path.clone()));
    let transport = Arc::new(PlatformTransport::new(
        config.platform.base_url.clone(),
        credentials.clone(),
    ));
    let registry = Arc::new(builtin_registry(transport, cooldowns, credentials));

    let provider_config = config.select_provider(cli.provider.as_deref())?;
    let provider = ProviderFactory::create(provider_config);
    let options = AgentOptions {
        system_prompt: config.system_prompt.clone(),
        max_rounds: config.max_rounds,
    };
    let agent = Arc::new(Agent::new(provider, registry.clone(), options));

    info!(mode = ?cli.mode, "Running in selected mode");
    match cli.mode {
        RunMode::Prompt => run_prompt(&cli, &agent).await?,
        RunMode::Stdio => stdio::run(agent, registry).await?,
        RunMode::Capability => run_capability(&cli, &registry).await?,
    }
    info!("Execution finished");
    Ok(())
}

async fn run_prompt(cli: &Cli, agent: &Agent) -> Result<(), Box<dyn Error>> {
    let prompt = load_prompt(cli)?;
    info!("Dispatching single prompt");

    let mut events = agent.chat(prompt);
    while let Some(event) = events.next().await {
        match event {
            AgentEvent::Text { text } => {
                print!("{text}");
                let _ = io::stdout().flush();
            }
            AgentEvent::CapabilityStart { name, .. } => {
                eprintln!("[{name} started]");
            }
            AgentEvent::CapabilityEnd { name, output, .. } => {
                let success = output
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                eprintln!("[{name} finished, success: {success}]");
            }
            AgentEvent::Done {
                outcome: ChatOutcome::Completed,
            } => {
                println!();
            }
            AgentEvent::Done {
                outcome: ChatOutcome::TurnLimitReached,
            } => {
                println!();
                eprintln!("Stopped at the round limit before reaching a final answer.");
            }
            AgentEvent::Error { message } => {
                println!();
                return Err(message.into());
            }
        }
    }
    Ok(())
}

async fn run_capability(cli: &Cli, registry: &CapabilityRegistry) -> Result<(), Box<dyn Error>> {
    let Some(name) = cli.capability.as_deref() else {
        return Err("capability mode requires --capability".into());
    };
    let input = match cli.input.as_deref() {
        Some(raw) => serde_json::from_str::<Value>(raw)?,
        None => Value::Null,
    };

    info!(capability = name, "Dispatching capability from the command line");
    let output = registry.dispatch(name, &input).await;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_prompt(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if !cli.prompt.is_empty() {
        return Ok(cli.prompt.join(" ").trim().to_string());
    }

    info!("Reading prompt from standard input");
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    let prompt = buffer.trim().to_string();
    if prompt.is_empty() {
        return Err("prompt required via arguments or stdin".into());
    }
    Ok(prompt)
}

fn init_tracing(quiet: bool) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = if quiet {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
