//! PipeSpec Gateway - Main entry point.

use anyhow::Result;
use pipespec_common::config::{config_dir, Config};
use pipespec_common::config_loader::check_modular_files;
use pipespec_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.observability.log_level, &config.observability.log_format);

    tracing::info!("PipeSpec Gateway v{}", env!("CARGO_PKG_VERSION"));

    let dir = config_dir();
    for (file, present) in check_modular_files(Some(dir.clone())) {
        if present {
            tracing::info!(dir = %dir.display(), file = %file, "Config file loaded");
        } else {
            tracing::debug!(dir = %dir.display(), file = %file, "Config file absent, using defaults");
        }
    }

    // Start the webhook server
    pipespec_gateway::start_server(&config).await
}
