// src/engine/action_log.rs

use std::fmt::Debug;

use tracing::info;

/// Sink for one-line, human-readable descriptions of what the host is doing.
///
/// The supervisor writes one line per top-level launch naming the whole
/// pipeline, before anything is spawned.
pub trait ActionLog: Send + Sync + Debug {
    fn action(&self, line: &str);
}

/// Default action log: an `info` event under the `procpipe::action` target.
#[derive(Debug, Clone, Default)]
pub struct TracingActionLog;

impl ActionLog for TracingActionLog {
    fn action(&self, line: &str) {
        info!(target: "procpipe::action", "{line}");
    }
}
