use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::session_log::logs_dir;

const DEFAULT_FILTER: &str = "puraluce=info,puraluce_core=info,warn";

/// Routes `tracing` output to `<data_dir>/puraluce/logs/trace.log`.
/// The terminal belongs to the UI, so nothing is written to stdout.
/// `RUST_LOG` overrides the default filter.
pub fn init() -> Result<()> {
    let log_dir = logs_dir().context("Could not resolve a log directory")?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "trace.log");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .context("tracing subscriber already installed")?;

    tracing::info!(log_dir = %log_dir.display(), "Studio Pura Luce starting");
    Ok(())
}
