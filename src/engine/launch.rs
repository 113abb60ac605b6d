// src/engine/launch.rs

//! Spawning and supervising the stages of a pipeline.
//!
//! Per stage:
//! - the command runs through the env launcher in its own process group,
//!   with all three standard streams piped;
//! - two pumps and one dispatcher move its output to its route;
//! - the PID is registered and a watchdog sidecar is started;
//! - a monitor task runs the termination chain once the process exits.
//!
//! Stages are spawned from last to first so each upstream can be given its
//! downstream's stdin as route.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::Supervisor;
use crate::engine::handle::{PipelineHandle, StageHandle};
use crate::errors::{ProcpipeError, Result, fatal};
use crate::stream::{Route, spawn_dispatcher, spawn_pump};
use crate::supervise::ChildRegistry;
use crate::supervise::watchdog::{spawn_sidecar, stop_sidecar};
use crate::task::{Pipeline, TaskSpec};
use crate::types::{StreamKind, status_code};

const CHUNK_CHANNEL: usize = 64;

/// Launch every stage of `pipeline`.
///
/// Logs the rendered pipeline once, then spawns. Must be called from within a
/// tokio runtime. On a spawn error, stages already started are left to finish
/// on their own (their stdin is closed) and the error is returned.
pub(crate) fn launch(sup: &Supervisor, pipeline: Pipeline) -> Result<PipelineHandle> {
    sup.action_log.action(&pipeline.to_string());

    let Pipeline { stages, sinks } = pipeline;
    let mut sinks = Some(sinks);
    let mut downstream_stdin: Option<ChildStdin> = None;
    let mut handles = Vec::with_capacity(stages.len());

    for (index, spec) in stages.into_iter().enumerate().rev() {
        let route = match downstream_stdin.take() {
            Some(stdin) => Route::Forward(stdin),
            None => Route::Sinks(sinks.take().unwrap_or_default()),
        };

        let (handle, stdin) = spawn_stage(sup, index, spec, route)?;
        downstream_stdin = stdin;
        handles.push(handle);
    }

    // What is left is the source's stdin; nobody writes to it.
    drop(downstream_stdin);

    handles.reverse();
    Ok(PipelineHandle::new(handles))
}

fn spawn_stage(
    sup: &Supervisor,
    index: usize,
    spec: TaskSpec,
    route: Route,
) -> Result<(StageHandle, Option<ChildStdin>)> {
    let dir = match spec.working_dir.clone() {
        Some(dir) => dir,
        None => sup.resolver.current_dir()?,
    };

    let mut cmd = Command::new(&sup.config.env_program);
    cmd.args(spec.launcher_args(sup.config.unbuffered_token.as_deref()))
        .current_dir(&dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| ProcpipeError::SpawnError {
        command: spec.command.clone(),
        source,
    })?;

    let Some(pid) = child.id() else {
        return Err(ProcpipeError::ConfigError(format!(
            "'{}' exited before its pid could be read",
            spec.command
        )));
    };

    sup.registry.register(pid);
    let sidecar = sup.watchdog.as_deref().and_then(|path| {
        spawn_sidecar(path, pid)
            .map_err(|err| warn!(pid, error = %err, "running without watchdog sidecar"))
            .ok()
    });

    info!(
        stage = index,
        pid,
        command = %spec.command,
        dir = %dir.display(),
        "spawned process"
    );

    let stdin = child.stdin.take();
    let (tx, rx) = mpsc::channel(CHUNK_CHANNEL);
    if let Some(out) = child.stdout.take() {
        spawn_pump(out, StreamKind::Stdout, tx.clone());
    }
    if let Some(err) = child.stderr.take() {
        spawn_pump(err, StreamKind::Stderr, tx.clone());
    }
    drop(tx);
    let dispatcher = spawn_dispatcher(rx, route, spec.command.clone());

    let monitor = tokio::spawn(supervise_child(Termination {
        child,
        pid,
        command: spec.command.clone(),
        exit_on_failure: spec.exit_on_failure,
        dispatcher,
        sidecar,
        registry: Arc::clone(&sup.registry),
    }));

    Ok((StageHandle::new(spec.command, pid, monitor), stdin))
}

/// Everything the termination chain of one process needs.
struct Termination {
    child: Child,
    pid: u32,
    command: String,
    exit_on_failure: bool,
    dispatcher: JoinHandle<()>,
    sidecar: Option<Child>,
    registry: Arc<dyn ChildRegistry>,
}

/// Wait for exit, then run the termination chain in its fixed order:
/// output shutdown, failure policy, deregistration.
async fn supervise_child(t: Termination) -> Result<i32> {
    let Termination {
        mut child,
        pid,
        command,
        exit_on_failure,
        dispatcher,
        sidecar,
        registry,
    } = t;

    let waited = child.wait().await;

    // Output first: every chunk and both sentinels are delivered (and the
    // next stage's stdin closed) before anything else reacts to the exit.
    if let Err(err) = dispatcher.await {
        warn!(pid, command = %command, error = %err, "output dispatcher failed");
    }

    let status = waited.map(status_code);
    match &status {
        Ok(code) => info!(pid, command = %command, status = code, "process exited"),
        Err(err) => warn!(pid, command = %command, error = %err, "waiting for process failed"),
    }

    if let Ok(code) = status {
        if exit_on_failure && code != 0 {
            fatal(format!("Error: {command} failed with exit code {code}"));
        }
    }

    registry.deregister(pid);
    if let Some(sidecar) = sidecar {
        stop_sidecar(sidecar).await;
    }
    debug!(pid, "termination chain complete");

    Ok(status?)
}
