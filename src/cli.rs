use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "talaria",
    version,
    about = "Personal assistant for the AgoraNet platform"
)]
pub struct Cli {
    #[arg(long)]
    pub config: Option<String>,
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub system: Option<String>,
    #[arg(long)]
    pub max_rounds: Option<usize>,
    #[arg(long, value_enum, default_value_t = RunMode::Prompt)]
    pub mode: RunMode,
    #[arg(long)]
    pub capability: Option<String>,
    #[arg(long)]
    pub input: Option<String>,
    #[arg()]
    pub prompt: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Prompt,
    Stdio,
    Capability,
}
