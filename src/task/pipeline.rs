// src/task/pipeline.rs

use std::fmt;
use std::io::Write;

use crate::stream::sink::{OutputSink, WriterSink};
use crate::task::spec::TaskSpec;
use crate::types::Chunk;

/// A linear chain of tasks plus the consumers of its output.
///
/// Stage `i`'s stdout and stderr are both fed into stage `i + 1`'s stdin.
/// Sinks registered with [`output`](Self::output) observe the *last* stage:
/// piping a task somewhere moves "its" output to the destination.
///
/// Only a whole pipeline can be launched, so a stage that is the destination
/// of a pipe can never be started on its own.
pub struct Pipeline {
    pub(crate) stages: Vec<TaskSpec>,
    pub(crate) sinks: Vec<Box<dyn OutputSink>>,
}

impl Pipeline {
    pub fn new(first: TaskSpec) -> Self {
        Self {
            stages: vec![first],
            sinks: Vec::new(),
        }
    }

    /// Append `next` to the end of the chain.
    ///
    /// Calling this repeatedly extends the chain: `a.pipe(b).pipe(c)` runs
    /// `a | b | c`.
    pub fn pipe(mut self, next: TaskSpec) -> Self {
        self.stages.push(next);
        self
    }

    /// Register a consumer for the pipeline's output.
    pub fn output(mut self, sink: impl OutputSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Register a closure as consumer.
    pub fn output_fn<F>(self, f: F) -> Self
    where
        F: FnMut(&Chunk) + Send + 'static,
    {
        self.output(f)
    }

    /// Write both output streams into `writer`, closing it after both end.
    pub fn output_to<W>(self, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        self.output(WriterSink::new(writer))
    }

    pub fn stages(&self) -> &[TaskSpec] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false: a pipeline has at least one stage.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The source stage.
    pub fn source(&self) -> &TaskSpec {
        &self.stages[0]
    }
}

impl From<TaskSpec> for Pipeline {
    fn from(spec: TaskSpec) -> Self {
        Pipeline::new(spec)
    }
}

/// `a | b | c`, as written to the action log.
impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_pipe_builds_linear_chain() {
        let p = Pipeline::new(TaskSpec::new("a"))
            .pipe(TaskSpec::new("b"))
            .pipe(TaskSpec::new("c"));

        let names: Vec<_> = p.stages().iter().map(TaskSpec::command).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(p.source().command(), "a");
    }

    #[test]
    fn renders_with_pipe_symbols() {
        let p = Pipeline::new(TaskSpec::new("printf").arg("x\ny"))
            .pipe(TaskSpec::new("sort").arg("-r"))
            .pipe(TaskSpec::new("head").env("LC_ALL", "C"));

        assert_eq!(p.to_string(), "printf 'x\ny' | sort -r | LC_ALL=C head");
    }
}
