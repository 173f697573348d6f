//! Logging module - structured logging for the context core
//!
//! Uses tracing + tracing-subscriber + tracing-appender for structured
//! logging with daily file rotation to ~/.cortex/logs/

use anyhow::Result;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable controlling the log filter (same syntax as RUST_LOG).
pub const LOG_ENV_VAR: &str = "CORTEX_LOG";

/// Initialize the logging system with file-based JSON output and daily rotation
///
/// - Logs to ~/.cortex/logs/cortex-YYYY-MM-DD
/// - Daily rotation
/// - JSON format for machine parsing
/// - File-only (no stdout) to avoid interfering with the embedding process
/// - Supports CORTEX_LOG env var or verbose flag for debug mode
///
/// # Arguments
/// * `verbose` - Enable debug-level logging when true
pub fn init_logging(verbose: bool) -> Result<()> {
    // Create log directory ~/.cortex/logs/
    let log_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".cortex")
        .join("logs");

    std::fs::create_dir_all(&log_dir)?;

    // Daily file rotation: cortex-2026-08-01, cortex-2026-08-02, ...
    let file_appender = rolling::daily(log_dir, "cortex");

    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().json().with_writer(file_appender))
        .with(env_filter)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_basic() {
        // Note: Can only init once per process, so tests may interfere
        // This is a basic smoke test - we just verify it doesn't panic
        let _result = init_logging(false);

        // May fail if already initialized, which is okay
        // The fact we reached here means no panic occurred
    }
}
