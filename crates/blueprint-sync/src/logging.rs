//! Logging setup for the session binary

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over `filter`. With `json` set, events are
/// written as JSON lines; otherwise in the pretty human format.
pub fn init_logging(filter: &str, json: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    }
    .context("Failed to set global default subscriber")?;

    info!(
        log_format = if json { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}
