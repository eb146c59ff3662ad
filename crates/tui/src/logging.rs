use std::{fs::OpenOptions, sync::Mutex};

use crate::{config::AppConfig, error::Result};

const LOG_FILE: &str = "kudi.log";

/// Sends `tracing` output to `<cache_dir>/kudi.log`; the terminal belongs to
/// the UI.
pub fn init(config: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(&config.cache_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.cache_dir.join(LOG_FILE))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter(&config.log_level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn filter(level: &str) -> String {
    format!("kudi={level},client={level},engine={level}")
}
