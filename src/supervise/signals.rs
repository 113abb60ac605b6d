// src/supervise/signals.rs

//! Terminal-signal forwarding to tracked children.
//!
//! Children are started in their own process group, so a Ctrl-C on the
//! terminal (or a `kill` aimed at the host) never reaches them directly. The
//! forwarder listens for the terminal signals through tokio's signal API and,
//! from an ordinary task, relays each one to every PID in the registry.
//!
//! With `reraise` enabled the host then restores the default disposition and
//! raises the signal on itself, so it still dies the way the sender intended.
//! Without it the host survives only while it has children to hand the signal
//! to. SIGKILL cannot be observed at all; the watchdog sidecar covers that
//! case.
//!
//! Dropping the forwarder restores the default disposition of every
//! forwarded signal. tokio installs its OS handler once per process, so a
//! forwarder installed after that point cannot intercept those signals again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self as nix_signal, SigHandler, Signal};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{ProcpipeError, Result};
use crate::supervise::registry::ChildRegistry;

/// Signals relayed to children.
pub const FORWARDED_SIGNALS: [Signal; 6] = [
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGABRT,
    Signal::SIGALRM,
    Signal::SIGTERM,
];

static DEFAULTS_RESTORED: AtomicBool = AtomicBool::new(false);

/// Handle to the listener tasks. Dropping it stops forwarding.
#[derive(Debug)]
pub struct SignalForwarder {
    listeners: Vec<JoinHandle<()>>,
}

impl SignalForwarder {
    /// Start listening for [`FORWARDED_SIGNALS`] and ignore SIGPIPE.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install(registry: Arc<dyn ChildRegistry>, reraise: bool) -> Result<Self> {
        ignore_sigpipe()?;
        if DEFAULTS_RESTORED.load(Ordering::Relaxed) {
            warn!("an earlier forwarder restored default signal handling; signals will not be forwarded");
        }

        let mut listeners = Vec::with_capacity(FORWARDED_SIGNALS.len());
        for sig in FORWARDED_SIGNALS {
            let mut stream = signal(SignalKind::from_raw(sig as i32))?;
            let registry = Arc::clone(&registry);

            listeners.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    let tracked = registry.snapshot().len();
                    let count = forward_signal(sig, registry.as_ref());
                    info!(signal = %sig, children = count, "forwarded signal to children");

                    if reraise || tracked == 0 {
                        reraise_default(sig);
                        // Only reached when the default action does not
                        // terminate the process.
                        return;
                    }
                }
            }));
        }

        debug!(signals = ?FORWARDED_SIGNALS, reraise, "signal forwarding installed");
        Ok(Self { listeners })
    }
}

impl Drop for SignalForwarder {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
        restore_defaults();
    }
}

// Without this the tokio handler stays installed and swallows the signals.
fn restore_defaults() {
    for sig in FORWARDED_SIGNALS {
        // SAFETY: restoring SIG_DFL does not run any code in signal context.
        if let Err(err) = unsafe { nix_signal::signal(sig, SigHandler::SigDfl) } {
            warn!(signal = %sig, error = %err, "failed to restore default signal disposition");
        }
    }
    DEFAULTS_RESTORED.store(true, Ordering::Relaxed);
    debug!("default signal dispositions restored");
}

/// Send `sig` to every PID currently in `registry`.
///
/// Works on a snapshot; PIDs that have already exited are skipped. Returns
/// how many children were signalled successfully.
pub fn forward_signal(sig: Signal, registry: &dyn ChildRegistry) -> usize {
    let mut delivered = 0;
    for pid in registry.snapshot() {
        match nix_signal::kill(Pid::from_raw(pid as i32), sig) {
            Ok(()) => delivered += 1,
            Err(err) => debug!(pid, signal = %sig, error = %err, "child not signalled"),
        }
    }
    delivered
}

/// Make broken pipes surface as `EPIPE` write errors instead of killing us.
pub fn ignore_sigpipe() -> Result<()> {
    // SAFETY: installing SIG_IGN does not run any code in signal context.
    unsafe { nix_signal::signal(Signal::SIGPIPE, SigHandler::SigIgn) }
        .map(|_| ())
        .map_err(|errno| ProcpipeError::IoError(errno.into()))
}

fn reraise_default(sig: Signal) {
    // SAFETY: restoring SIG_DFL does not run any code in signal context.
    if let Err(err) = unsafe { nix_signal::signal(sig, SigHandler::SigDfl) } {
        warn!(signal = %sig, error = %err, "failed to restore default signal disposition");
        return;
    }
    if let Err(err) = nix_signal::raise(sig) {
        warn!(signal = %sig, error = %err, "failed to re-raise signal");
    }
}
