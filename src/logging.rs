// src/logging.rs

//! Logging setup for the binaries using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PROCPIPE_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info` (`warn` for the watchdog sidecar, whose stderr is
//!    the user's terminal)
//!
//! Logs are sent to STDERR so that stdout carries nothing but child output.
//! The library itself never installs a subscriber.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "PROCPIPE_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    install(resolve_level(
        cli_level,
        std::env::var(LOG_ENV).ok().as_deref(),
        tracing::Level::INFO,
    ))
}

/// Logging for `procpipe-watchdog`: quiet unless `PROCPIPE_LOG` asks for more.
pub fn init_sidecar_logging() -> Result<()> {
    install(resolve_level(
        None,
        std::env::var(LOG_ENV).ok().as_deref(),
        tracing::Level::WARN,
    ))
}

fn install(level: tracing::Level) -> Result<()> {
    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    Ok(())
}

fn resolve_level(
    cli_level: Option<LogLevel>,
    env: Option<&str>,
    default: tracing::Level,
) -> tracing::Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => env.and_then(parse_level_str).unwrap_or(default),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: tracing::Level = tracing::Level::INFO;

    #[test]
    fn cli_flag_beats_env() {
        assert_eq!(
            resolve_level(Some(LogLevel::Trace), Some("error"), INFO),
            tracing::Level::TRACE
        );
    }

    #[test]
    fn env_then_default() {
        assert_eq!(resolve_level(None, Some(" Warning "), INFO), tracing::Level::WARN);
        assert_eq!(resolve_level(None, Some("loud"), INFO), INFO);
        assert_eq!(resolve_level(None, None, INFO), INFO);
    }

    #[test]
    fn sidecar_defaults_to_warn_but_honours_env() {
        let warn = tracing::Level::WARN;
        assert_eq!(resolve_level(None, None, warn), warn);
        assert_eq!(resolve_level(None, Some("debug"), warn), tracing::Level::DEBUG);
    }
}
