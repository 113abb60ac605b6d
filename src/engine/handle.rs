// src/engine/handle.rs

use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::{ProcpipeError, Result};

/// One launched stage.
#[derive(Debug)]
pub(crate) struct StageHandle {
    command: String,
    pid: u32,
    monitor: JoinHandle<Result<i32>>,
}

impl StageHandle {
    pub(crate) fn new(command: String, pid: u32, monitor: JoinHandle<Result<i32>>) -> Self {
        Self {
            command,
            pid,
            monitor,
        }
    }
}

/// A running pipeline.
///
/// Dropping the handle does not stop anything: every stage is owned by its
/// own monitor task and runs its termination chain regardless.
#[derive(Debug)]
pub struct PipelineHandle {
    stages: Vec<StageHandle>,
}

impl PipelineHandle {
    pub(crate) fn new(stages: Vec<StageHandle>) -> Self {
        Self { stages }
    }

    /// PIDs of the stages, source first.
    pub fn pids(&self) -> Vec<u32> {
        self.stages.iter().map(|s| s.pid).collect()
    }

    /// Wait until every stage has exited and finished its termination chain.
    pub async fn wait(self) -> Result<PipelineStatus> {
        let mut statuses = Vec::with_capacity(self.stages.len());
        let mut first_err = None;

        for stage in self.stages {
            let res = match stage.monitor.await {
                Ok(res) => res,
                Err(join_err) => Err(ProcpipeError::Other(join_err.into())),
            };
            match res {
                Ok(code) => statuses.push(code),
                Err(err) => {
                    debug!(command = %stage.command, pid = stage.pid, error = %err, "stage failed");
                    statuses.push(-1);
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(PipelineStatus { statuses }),
        }
    }

    /// Run `completion` with the source status once the pipeline finished.
    ///
    /// Returns immediately; `completion` runs on a tokio worker. It is not
    /// called if waiting fails.
    pub fn on_complete<F>(self, completion: F) -> JoinHandle<Result<PipelineStatus>>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        tokio::spawn(async move {
            let status = self.wait().await?;
            completion(status.source());
            Ok(status)
        })
    }
}

/// Exit statuses of every stage, source first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    statuses: Vec<i32>,
}

impl PipelineStatus {
    /// Status of the first stage. This is what `run` reports.
    pub fn source(&self) -> i32 {
        self.statuses[0]
    }

    /// Status of the last stage.
    pub fn last(&self) -> i32 {
        self.statuses[self.statuses.len() - 1]
    }

    pub fn stages(&self) -> &[i32] {
        &self.statuses
    }

    pub fn success(&self) -> bool {
        self.statuses.iter().all(|&s| s == 0)
    }
}
