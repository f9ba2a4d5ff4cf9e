use clap::Parser;
use talaria::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    talaria::run(Cli::parse()).await
}
