// src/supervise/watchdog.rs

//! Parent-liveness watchdog.
//!
//! For every child the supervisor spawns one `procpipe-watchdog` sidecar with
//! `(host pid, child pid)`. The sidecar polls the host; if the host is gone
//! (for example killed with SIGKILL, which the signal forwarder cannot see)
//! it SIGKILLs the child and exits.
//!
//! This module holds both halves: [`watch_parent`] is the sidecar's loop and
//! [`spawn_sidecar`] / [`locate_watchdog`] are used by the host.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::{ProcpipeError, Result};

/// File name of the sidecar executable.
pub const WATCHDOG_BIN: &str = "procpipe-watchdog";

/// Environment variable overriding the sidecar location.
pub const WATCHDOG_ENV: &str = "PROCPIPE_WATCHDOG";

/// Default poll interval of the sidecar.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Why [`watch_parent`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The parent disappeared; the child was sent SIGKILL.
    ParentGone,
    /// The child exited on its own; nothing left to guard.
    ChildGone,
}

/// Zero-signal liveness probe.
pub fn is_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Poll `parent` every `interval` until it or `child` disappears.
pub fn watch_parent(parent: i32, child: i32, interval: Duration) -> WatchOutcome {
    loop {
        std::thread::sleep(interval);

        if !is_alive(parent) {
            if let Err(err) = kill(Pid::from_raw(child), Signal::SIGKILL) {
                debug!(child, error = %err, "child already gone when parent died");
            } else {
                info!(parent, child, "parent gone; killed child");
            }
            return WatchOutcome::ParentGone;
        }

        if !is_alive(child) {
            debug!(parent, child, "child gone; watchdog exiting");
            return WatchOutcome::ChildGone;
        }
    }
}

/// Find the sidecar executable.
///
/// Lookup order: `explicit`, then `$PROCPIPE_WATCHDOG`, then a
/// `procpipe-watchdog` next to the current executable (or one directory up,
/// which is where cargo puts binaries relative to test executables in
/// `deps/`).
pub fn locate_watchdog(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(WATCHDOG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    [Some(dir), dir.parent()]
        .into_iter()
        .flatten()
        .map(|d| d.join(WATCHDOG_BIN))
        .find(|candidate| candidate.is_file())
}

/// Launch a sidecar guarding `child_pid` on behalf of this process.
pub fn spawn_sidecar(watchdog: &Path, child_pid: u32) -> Result<Child> {
    let parent_pid = std::process::id();

    let sidecar = Command::new(watchdog)
        .arg(parent_pid.to_string())
        .arg(child_pid.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| ProcpipeError::SpawnError {
            command: watchdog.display().to_string(),
            source,
        })?;

    debug!(
        parent = parent_pid,
        child = child_pid,
        sidecar = ?sidecar.id(),
        "watchdog sidecar started"
    );
    Ok(sidecar)
}

/// Stop a sidecar whose child has finished.
pub async fn stop_sidecar(mut sidecar: Child) {
    if let Err(err) = sidecar.start_kill() {
        warn!(error = %err, "failed to stop watchdog sidecar");
        return;
    }
    let _ = sidecar.wait().await;
}
