// src/task/spec.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration for one child process.
///
/// A plain value: build it, then hand it to a [`Pipeline`](super::Pipeline).
/// Launching consumes it, so a spec can only ever run once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub(crate) command: String,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) args: Vec<String>,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) exit_on_failure: bool,
}

impl TaskSpec {
    /// A task running `command`, looked up on `$PATH`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            args: Vec::new(),
            env: BTreeMap::new(),
            exit_on_failure: false,
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable for the child. Later values win.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Terminate the host with status 1 if this task exits non-zero.
    pub fn exit_on_failure(mut self, exit: bool) -> Self {
        self.exit_on_failure = exit;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn get_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn get_working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn is_exit_on_failure(&self) -> bool {
        self.exit_on_failure
    }

    /// Arguments handed to the env launcher:
    /// `[token] KEY=VALUE... command args...`.
    pub fn launcher_args(&self, unbuffered_token: Option<&str>) -> Vec<String> {
        let mut out = Vec::with_capacity(1 + self.env.len() + 1 + self.args.len());
        out.extend(unbuffered_token.map(str::to_string));
        out.extend(self.env.iter().map(|(k, v)| format!("{k}={v}")));
        out.push(self.command.clone());
        out.extend(self.args.iter().cloned());
        out
    }
}

/// Human-readable rendering used in the action log.
impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={}", quote(v)))
            .chain(std::iter::once(quote(&self.command)))
            .chain(self.args.iter().map(|a| quote(a)));

        for (i, word) in words.enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&word)?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '\'' | '"' | '|' | '\\' | '$' | '`'));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
