use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use weather_assistant::{AppState, AssistantConfig, OpenAiDecider, telemetry, web};

/// Answers questions, or looks up the current time and weather
#[derive(Debug, Parser)]
#[command(name = "weather-assistant", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides the configuration
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AssistantConfig::load_from_path(cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let _telemetry = telemetry::init(&config.logging)?;
    tracing::info!(
        "Starting weather-assistant {} with model {}",
        weather_assistant::VERSION,
        config.model.model
    );

    let api_key = config.model.resolve_api_key()?;
    let decider = Arc::new(OpenAiDecider::new(&config.model, api_key)?);
    let state = AppState::from_config(&config, decider)?;

    web::run(&config.server, state).await
}
