use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use daylog::{critical, debug, info, warning, DaylogLayer, Logger, LoggerOptions};

fn main() -> Result<()> {
    // Optional first argument: config file to read instead of the default
    let mut options = LoggerOptions::new();
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        options = options.config_path(path);
    }

    let _guard = daylog::init(options).context("Failed to start logger")?;

    // Library code that uses tracing ends up in the same files; RUST_LOG
    // narrows which of its events are forwarded
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(DaylogLayer::global().with_filter(filter))
        .try_init()
        .context("Failed to install tracing bridge")?;

    let logger = Logger::instance();
    let path = logger
        .log_file_path()
        .context("Logger stopped before it was used")?;

    info!("Logging to: {}", path.display());
    debug!("Debug output is only persisted at log_level 0");
    warning!("This is a warning");
    critical!("This is a critical message");
    tracing::info!(source = "tracing", "Forwarded through the tracing bridge");

    logger.flush().context("Failed to flush logger")?;
    Ok(())
}
