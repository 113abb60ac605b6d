// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Recoverable failures (spawning, waiting, configuration) flow through
//! [`ProcpipeError`]. Conditions that the scripting API treats as fatal go
//! through [`fatal`], which never returns.

use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ProcpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to spawn '{command}': {source}")]
    SpawnError {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProcpipeError>;

/// Print a single diagnostic line and terminate the host process with status 1.
pub fn fatal(msg: impl AsRef<str>) -> ! {
    let msg = msg.as_ref();
    error!(message = %msg, "fatal");
    eprintln!("{msg}");
    std::process::exit(1);
}
