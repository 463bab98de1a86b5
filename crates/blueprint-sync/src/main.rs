use anyhow::{Context, Result};
use blueprint_sync::logging::init_logging;
use blueprint_sync::SyncConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = SyncConfig::load().context("Failed to load configuration")?;

    init_logging(&config.log_filter, config.json_logs).context("Failed to initialize logging")?;

    blueprint_sync::run(config).await.context("Session error")?;

    Ok(())
}
