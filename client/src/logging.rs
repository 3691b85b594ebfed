//! Tracing bootstrap for the terminal client.

use std::{
    env,
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,client=debug";

/// Initialize the global tracing subscriber, appending to `log_file`.
///
/// The terminal hosts the UI, so nothing is written to stdout.
///
/// Precedence:
/// 1) `RUST_LOG`
/// 2) `CHAT_ROOMS_LOG`
/// 3) internal default filter
pub fn init(log_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed opening log file {}", log_file.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_env_filter(filter_from_env())
        .try_init();

    Ok(())
}

fn filter_from_env() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if let Some(filter) = env::var("CHAT_ROOMS_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
    {
        return filter;
    }

    EnvFilter::new(DEFAULT_FILTER)
}
