// src/engine/mod.rs

//! Orchestration context.
//!
//! A [`Supervisor`] is built once at startup and owns everything launches
//! share: the live-child registry, the signal forwarder, the action log, the
//! path resolver and the launch settings. Tasks borrow it to run.
//!
//! - [`launch`] spawns pipelines and runs each child's termination chain.
//! - [`handle`] is what callers get back from a non-blocking launch.
//! - [`action_log`] is the one-line "what are we doing" log.

pub mod action_log;
pub mod handle;
pub mod launch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{Result, fatal};
use crate::fs::{PathResolver, RealPathResolver, working_dir_for};
use crate::stream::{CaptureSink, Captured, PrintSink};
use crate::supervise::watchdog::locate_watchdog;
use crate::supervise::{ChildRegistry, SharedRegistry, SignalForwarder};
use crate::task::{Pipeline, TaskSpec};

pub use action_log::{ActionLog, TracingActionLog};
pub use handle::{PipelineHandle, PipelineStatus};

/// Default launcher; running through `env` gives `$PATH` lookup.
pub const DEFAULT_ENV_PROGRAM: &str = "/usr/bin/env";

/// Leading `env` assignment asking the child runtime for unbuffered stdio.
pub const DEFAULT_UNBUFFERED_TOKEN: &str = "NSUnbufferedIO=YES";

/// How children get a watchdog sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatchdogMode {
    /// Look the sidecar up (see [`locate_watchdog`]); run without one if
    /// it cannot be found.
    #[default]
    Auto,
    /// Use this executable.
    Path(PathBuf),
    /// Never start sidecars.
    Disabled,
}

/// Launch settings shared by every task of a supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub env_program: PathBuf,
    pub unbuffered_token: Option<String>,
    pub forward_signals: bool,
    /// After forwarding, die by the same signal. When off the host still
    /// dies by it if no child was running.
    pub reraise_signals: bool,
    pub watchdog: WatchdogMode,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            env_program: PathBuf::from(DEFAULT_ENV_PROGRAM),
            unbuffered_token: Some(DEFAULT_UNBUFFERED_TOKEN.to_string()),
            forward_signals: true,
            reraise_signals: true,
            watchdog: WatchdogMode::Auto,
        }
    }
}

/// Result of [`Supervisor::run_for_output`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// The orchestration context.
#[derive(Debug)]
pub struct Supervisor {
    pub(crate) config: SupervisorConfig,
    pub(crate) registry: Arc<dyn ChildRegistry>,
    pub(crate) action_log: Arc<dyn ActionLog>,
    pub(crate) resolver: Arc<dyn PathResolver>,
    pub(crate) watchdog: Option<PathBuf>,
    _forwarder: Option<SignalForwarder>,
}

impl Supervisor {
    /// Supervisor with the default registry, action log and resolver.
    ///
    /// Must be called from within a tokio runtime when signal forwarding is
    /// enabled.
    pub fn new(config: SupervisorConfig) -> Result<Self> {
        SupervisorBuilder::new(config).build()
    }

    pub fn builder(config: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(config)
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Resolved sidecar executable, if any.
    pub fn watchdog_path(&self) -> Option<&Path> {
        self.watchdog.as_deref()
    }

    /// A task that runs in the current directory as of now.
    pub fn task(&self, command: impl Into<String>) -> Result<TaskSpec> {
        let cwd = self.resolver.current_dir()?;
        Ok(TaskSpec::new(command).working_dir(cwd))
    }

    /// A task that runs in `path`, or in its parent if `path` is not a
    /// directory.
    pub fn task_at(&self, path: impl AsRef<Path>, command: impl Into<String>) -> Result<TaskSpec> {
        let dir = working_dir_for(self.resolver.as_ref(), path.as_ref())?;
        Ok(TaskSpec::new(command).working_dir(dir))
    }

    /// Launch without waiting.
    pub fn spawn(&self, pipeline: impl Into<Pipeline>, print_output: bool) -> Result<PipelineHandle> {
        let mut pipeline = pipeline.into();
        if print_output {
            pipeline = pipeline.output(PrintSink);
        }
        launch::launch(self, pipeline)
    }

    /// Run to completion and return the source stage's exit status.
    pub async fn run(&self, pipeline: impl Into<Pipeline>, print_output: bool) -> Result<i32> {
        let status = self.spawn(pipeline, print_output)?.wait().await?;
        Ok(status.source())
    }

    /// Run to completion, capturing the output of the last stage as text.
    ///
    /// Output that is not valid UTF-8 terminates the host; use a raw
    /// [`OutputSink`](crate::stream::OutputSink) for binary output.
    pub async fn run_for_output(&self, pipeline: impl Into<Pipeline>) -> Result<CapturedOutput> {
        let capture = CaptureSink::new();
        let pipeline = pipeline.into().output(capture.clone());
        let command = pipeline.source().command().to_string();

        let status = self.run(pipeline, false).await?;

        let Captured { stdout, stderr } = capture.take();
        let decode = |bytes: Vec<u8>| {
            String::from_utf8(bytes)
                .unwrap_or_else(|_| fatal(format!("Failed to read output from command {command}")))
        };

        Ok(CapturedOutput {
            status,
            stdout: decode(stdout),
            stderr: decode(stderr),
        })
    }

    /// Launch and return immediately; `completion` gets the source status.
    pub fn run_async<F>(
        &self,
        pipeline: impl Into<Pipeline>,
        print_output: bool,
        completion: F,
    ) -> Result<JoinHandle<Result<PipelineStatus>>>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        Ok(self.spawn(pipeline, print_output)?.on_complete(completion))
    }
}

/// Assembles a [`Supervisor`] with injectable collaborators.
#[derive(Debug)]
pub struct SupervisorBuilder {
    config: SupervisorConfig,
    registry: Option<Arc<dyn ChildRegistry>>,
    action_log: Option<Arc<dyn ActionLog>>,
    resolver: Option<Arc<dyn PathResolver>>,
}

impl SupervisorBuilder {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            registry: None,
            action_log: None,
            resolver: None,
        }
    }

    pub fn registry(mut self, registry: Arc<dyn ChildRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn action_log(mut self, log: Arc<dyn ActionLog>) -> Self {
        self.action_log = Some(log);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<Supervisor> {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(SharedRegistry::new()) as Arc<dyn ChildRegistry>);

        let forwarder = if self.config.forward_signals {
            Some(SignalForwarder::install(
                Arc::clone(&registry),
                self.config.reraise_signals,
            )?)
        } else {
            None
        };

        let watchdog = match &self.config.watchdog {
            WatchdogMode::Disabled => None,
            WatchdogMode::Path(path) => Some(path.clone()),
            WatchdogMode::Auto => {
                let found = locate_watchdog(None);
                if found.is_none() {
                    warn!("procpipe-watchdog not found; children will not be guarded against host death");
                }
                found
            }
        };
        debug!(watchdog = ?watchdog, "supervisor ready");

        Ok(Supervisor {
            config: self.config,
            registry,
            action_log: self
                .action_log
                .unwrap_or_else(|| Arc::new(TracingActionLog) as Arc<dyn ActionLog>),
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(RealPathResolver) as Arc<dyn PathResolver>),
            watchdog,
            _forwarder: forwarder,
        })
    }
}
