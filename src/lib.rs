// src/lib.rs

//! Supervised subprocesses and pipelines for scripts.
//!
//! ```no_run
//! use procpipe::{Pipeline, Supervisor, SupervisorConfig, TaskSpec};
//!
//! # async fn demo() -> procpipe::errors::Result<()> {
//! let sup = Supervisor::new(SupervisorConfig::default())?;
//!
//! let out = sup
//!     .run_for_output(
//!         Pipeline::new(TaskSpec::new("printf").arg("b\na\n")).pipe(TaskSpec::new("sort")),
//!     )
//!     .await?;
//! assert_eq!(out.stdout, "a\nb\n");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod stream;
pub mod supervise;
pub mod task;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::{ConfigSection, PipelineFile, load_and_validate};

pub use engine::{
    CapturedOutput, PipelineHandle, PipelineStatus, Supervisor, SupervisorConfig, WatchdogMode,
};
pub use task::{Pipeline, TaskSpec};
pub use types::{Chunk, StreamKind};

/// High-level entry point used by `main.rs`.
///
/// Runs either the command given after `--` or the pipeline file, and
/// returns the exit code the process should end with: the source stage's
/// status, squeezed into `0..=255`.
pub async fn run(args: CliArgs) -> Result<i32> {
    let (section, pipeline) = if args.command.is_empty() {
        let config_path = args.config.clone();
        let file = load_and_validate(&config_path)
            .with_context(|| format!("loading pipeline file {}", config_path.display()))?;

        if args.dry_run {
            print_dry_run(&file);
            return Ok(0);
        }

        let base = config_root_dir(&config_path);
        (file.config.clone(), file.to_pipeline(&base))
    } else {
        let (cmd, rest) = args
            .command
            .split_first()
            .context("empty command after `--`")?;
        let spec = TaskSpec::new(cmd)
            .args(rest.iter().cloned())
            .exit_on_failure(args.exit_on_failure);

        if args.dry_run {
            println!("procpipe dry-run");
            println!("  {spec}");
            if spec.is_exit_on_failure() {
                println!("      exit_on_failure: true");
            }
            return Ok(0);
        }

        (ConfigSection::default(), Pipeline::new(spec))
    };

    let supervisor = Supervisor::new(section.supervisor_config())?;
    debug!(
        watchdog = ?supervisor.watchdog_path(),
        forward_signals = supervisor.config().forward_signals,
        "supervisor built"
    );
    let print_output = section.print_output && !args.quiet;

    let status = supervisor.run(pipeline, print_output).await?;
    debug!(status, "pipeline finished");

    Ok(exit_code_for(status))
}

/// Directory that relative stage `dir`s are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "ci/Procpipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Procpipe.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn exit_code_for(status: i32) -> i32 {
    if (0..=255).contains(&status) { status } else { 1 }
}

/// Simple dry-run output: print settings and stages.
fn print_dry_run(file: &PipelineFile) {
    let cfg = &file.config;
    println!("procpipe dry-run");
    println!("  config.print_output = {}", cfg.print_output);
    println!("  config.forward_signals = {}", cfg.forward_signals);
    println!("  config.reraise_signals = {}", cfg.reraise_signals);
    println!("  config.watchdog = {}", cfg.watchdog);
    if let Some(ref path) = cfg.watchdog_path {
        println!("  config.watchdog_path = {}", path.display());
    }
    println!("  config.env_program = {}", cfg.env_program.display());
    println!();

    println!("stages ({}):", file.stage_count());
    for (idx, stage) in file.stages().enumerate() {
        println!("  {idx}. {}", stage.cmd);
        if !stage.args.is_empty() {
            println!("      args: {:?}", stage.args);
        }
        if !stage.env.is_empty() {
            println!("      env: {:?}", stage.env);
        }
        if let Some(ref dir) = stage.dir {
            println!("      dir: {}", dir.display());
        }
        if stage.exit_on_failure {
            println!("      exit_on_failure: true");
        }
    }

    debug!("dry-run complete (no execution)");
}
