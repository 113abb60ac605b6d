// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::{
    DEFAULT_ENV_PROGRAM, DEFAULT_UNBUFFERED_TOKEN, SupervisorConfig, WatchdogMode,
};
use crate::task::{Pipeline, TaskSpec};

/// Top-level pipeline file as read from TOML.
///
/// ```toml
/// [config]
/// print_output = true
/// watchdog = true
///
/// [[stage]]
/// cmd = "printf"
/// args = ["b\na\n"]
///
/// [[stage]]
/// cmd = "sort"
/// exit_on_failure = true
/// ```
///
/// Only `[[stage]]` is required. This is the unvalidated form; see
/// [`PipelineFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Stages in pipe order.
    #[serde(default)]
    pub stage: Vec<StageConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Copy the last stage's output to our stdout/stderr.
    #[serde(default = "default_true")]
    pub print_output: bool,

    /// Relay terminal signals to children.
    #[serde(default = "default_true")]
    pub forward_signals: bool,

    /// After relaying a signal, die by it. When off the host still dies by
    /// it if no child was running.
    #[serde(default = "default_true")]
    pub reraise_signals: bool,

    /// Start a watchdog sidecar per child.
    #[serde(default = "default_true")]
    pub watchdog: bool,

    /// Explicit sidecar executable; looked up when absent.
    #[serde(default)]
    pub watchdog_path: Option<PathBuf>,

    #[serde(default = "default_env_program")]
    pub env_program: PathBuf,

    /// Leading `env` assignment; an empty string disables it.
    #[serde(default = "default_unbuffered_token")]
    pub unbuffered_token: String,
}

fn default_true() -> bool {
    true
}

fn default_env_program() -> PathBuf {
    PathBuf::from(DEFAULT_ENV_PROGRAM)
}

fn default_unbuffered_token() -> String {
    DEFAULT_UNBUFFERED_TOKEN.to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            print_output: true,
            forward_signals: true,
            reraise_signals: true,
            watchdog: true,
            watchdog_path: None,
            env_program: default_env_program(),
            unbuffered_token: default_unbuffered_token(),
        }
    }
}

impl ConfigSection {
    pub fn supervisor_config(&self) -> SupervisorConfig {
        let watchdog = match (self.watchdog, &self.watchdog_path) {
            (false, _) => WatchdogMode::Disabled,
            (true, Some(path)) => WatchdogMode::Path(path.clone()),
            (true, None) => WatchdogMode::Auto,
        };

        SupervisorConfig {
            env_program: self.env_program.clone(),
            unbuffered_token: Some(self.unbuffered_token.clone()).filter(|t| !t.is_empty()),
            forward_signals: self.forward_signals,
            reraise_signals: self.reraise_signals,
            watchdog,
        }
    }
}

/// One `[[stage]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Command name, looked up on `$PATH`.
    pub cmd: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory; relative paths are resolved against the
    /// directory of the pipeline file.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub exit_on_failure: bool,
}

impl StageConfig {
    pub fn to_spec(&self, base_dir: &Path) -> TaskSpec {
        let mut spec = TaskSpec::new(&self.cmd)
            .args(self.args.iter().cloned())
            .envs(self.env.clone())
            .exit_on_failure(self.exit_on_failure);

        if let Some(dir) = &self.dir {
            spec = spec.working_dir(base_dir.join(dir));
        }
        spec
    }
}

/// A validated pipeline file: at least one stage, all of them well formed.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub config: ConfigSection,
    source: StageConfig,
    rest: Vec<StageConfig>,
}

impl PipelineFile {
    /// Only [`validate`](super::validate) should call this.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        source: StageConfig,
        rest: Vec<StageConfig>,
    ) -> Self {
        Self {
            config,
            source,
            rest,
        }
    }

    /// Stages in pipe order.
    pub fn stages(&self) -> impl Iterator<Item = &StageConfig> {
        std::iter::once(&self.source).chain(self.rest.iter())
    }

    pub fn stage_count(&self) -> usize {
        1 + self.rest.len()
    }

    /// Build the pipeline; relative stage directories hang off `base_dir`.
    pub fn to_pipeline(&self, base_dir: &Path) -> Pipeline {
        self.rest
            .iter()
            .map(|s| s.to_spec(base_dir))
            .fold(Pipeline::new(self.source.to_spec(base_dir)), Pipeline::pipe)
    }
}
