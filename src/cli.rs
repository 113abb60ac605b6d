// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::supervise::watchdog::DEFAULT_INTERVAL;

/// Command-line arguments for `procpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procpipe",
    version,
    about = "Run a command, or a pipeline of commands, with signal forwarding and orphan protection.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML). Ignored when a command is given
    /// after `--`.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipeline, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Don't copy the pipeline's output to our own stdout/stderr.
    #[arg(long)]
    pub quiet: bool,

    /// Exit with status 1 if the command after `--` fails.
    #[arg(long)]
    pub exit_on_failure: bool,

    /// Run this single command instead of a pipeline file.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Command-line arguments for `procpipe-watchdog`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procpipe-watchdog",
    version,
    about = "Kill CHILD_PID once PARENT_PID no longer exists."
)]
pub struct WatchdogArgs {
    pub parent_pid: i32,

    pub child_pid: i32,

    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_INTERVAL.as_millis() as u64)]
    pub interval_ms: u64,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_command_is_collected() {
        let args = CliArgs::parse_from(["procpipe", "--quiet", "--", "ls", "-la", "/tmp"]);
        assert!(args.quiet);
        assert_eq!(args.command, vec!["ls", "-la", "/tmp"]);
        assert_eq!(args.config, PathBuf::from("Procpipe.toml"));
        assert_eq!(args.config, default_config_path());
    }

    #[test]
    fn watchdog_takes_two_pids() {
        let args = WatchdogArgs::parse_from(["procpipe-watchdog", "10", "20"]);
        assert_eq!((args.parent_pid, args.child_pid), (10, 20));
        assert_eq!(args.interval_ms, 1000);
    }
}
