use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use forum_publisher::cli::{self, Cli};
use forum_publisher::config::Settings;
use forum_publisher::platform::{FsPlatformBridge, PublisherConfigUpdate};
use forum_publisher::publish::HttpPublishService;
use forum_publisher::state::AppState;
use forum_publisher::storage::create_state_store;
use forum_publisher::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;

    // Initialize tracing
    init_tracing(&settings.logging)?;
    tracing::debug!("Configuration loaded");

    // Wire the state to its capabilities
    let store = create_state_store(&settings.storage);
    let platform = Arc::new(FsPlatformBridge::from_settings(&settings.storage));
    let service = Arc::new(
        HttpPublishService::from_settings(&settings.api)
            .context("Failed to create publisher client")?,
    );

    let mut state = AppState::load(store, platform, service).with_publisher_override(
        PublisherConfigUpdate {
            api_url: Some(settings.api.url.clone()).filter(|u| !u.trim().is_empty()),
            api_key: settings.api.key.clone().filter(|k| !k.is_empty()),
        },
    );

    match cli::execute(cli.command, &mut state).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.report());
            Ok(ExitCode::FAILURE)
        }
    }
}
