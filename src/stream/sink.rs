// src/stream/sink.rs

//! Output consumers.
//!
//! A sink sees every chunk of both streams, including the two end-of-stream
//! sentinels, in the order the dispatcher receives them. Sinks are called
//! from the dispatcher task, one at a time, in registration order.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::types::{Chunk, StreamKind};

/// Receives child output.
pub trait OutputSink: Send {
    fn deliver(&mut self, chunk: &Chunk);
}

impl<F> OutputSink for F
where
    F: FnMut(&Chunk) + Send,
{
    fn deliver(&mut self, chunk: &Chunk) {
        self(chunk)
    }
}

/// Copies stdout chunks to our stdout and stderr chunks to our stderr.
#[derive(Debug, Default)]
pub struct PrintSink;

impl OutputSink for PrintSink {
    fn deliver(&mut self, chunk: &Chunk) {
        if chunk.is_end() {
            return;
        }

        let res = match chunk.stream {
            StreamKind::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(&chunk.data).and_then(|_| out.flush())
            }
            StreamKind::Stderr => std::io::stderr().lock().write_all(&chunk.data),
        };

        if let Err(err) = res {
            warn!(stream = %chunk.stream, error = %err, "failed to print child output");
        }
    }
}

/// Bytes accumulated by a [`CaptureSink`].
#[derive(Debug, Default, Clone)]
pub struct Captured {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Accumulates both streams into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    buf: Arc<Mutex<Captured>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything captured so far, leaving the buffer empty.
    pub fn take(&self) -> Captured {
        let mut guard = self.buf.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *guard)
    }
}

impl OutputSink for CaptureSink {
    fn deliver(&mut self, chunk: &Chunk) {
        let mut guard = self.buf.lock().unwrap_or_else(|p| p.into_inner());
        match chunk.stream {
            StreamKind::Stdout => guard.stdout.extend_from_slice(&chunk.data),
            StreamKind::Stderr => guard.stderr.extend_from_slice(&chunk.data),
        }
    }
}

/// Writes both streams into one writer, dropping it once both streams ended.
pub struct WriterSink<W: Write + Send> {
    writer: Option<W>,
    ended: u8,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            ended: 0,
        }
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn deliver(&mut self, chunk: &Chunk) {
        if chunk.is_end() {
            self.ended += 1;
            if self.ended == 2 {
                if let Some(mut w) = self.writer.take() {
                    let _ = w.flush();
                }
            }
            return;
        }

        if let Some(w) = self.writer.as_mut() {
            if let Err(err) = w.write_all(&chunk.data) {
                warn!(error = %err, "output writer failed; dropping it");
                self.writer = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedVec(Arc<Mutex<Vec<u8>>>, Arc<Mutex<bool>>);

    impl Write for SharedVec {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Drop for SharedVec {
        fn drop(&mut self) {
            *self.1.lock().unwrap() = true;
        }
    }

    #[test]
    fn capture_splits_streams() {
        let mut sink = CaptureSink::new();
        let handle = sink.clone();

        sink.deliver(&Chunk::new(StreamKind::Stdout, b"out".to_vec()));
        sink.deliver(&Chunk::new(StreamKind::Stderr, b"err".to_vec()));
        sink.deliver(&Chunk::end(StreamKind::Stdout));

        let got = handle.take();
        assert_eq!(got.stdout, b"out");
        assert_eq!(got.stderr, b"err");
    }

    #[test]
    fn writer_closes_only_after_both_sentinels() {
        let target = SharedVec::default();
        let data = Arc::clone(&target.0);
        let closed = Arc::clone(&target.1);
        let mut sink = WriterSink::new(target);

        sink.deliver(&Chunk::new(StreamKind::Stdout, b"a".to_vec()));
        sink.deliver(&Chunk::end(StreamKind::Stdout));
        sink.deliver(&Chunk::new(StreamKind::Stderr, b"b".to_vec()));
        assert!(!*closed.lock().unwrap());

        sink.deliver(&Chunk::end(StreamKind::Stderr));
        assert!(*closed.lock().unwrap());
        assert_eq!(*data.lock().unwrap(), b"ab");
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |c: &Chunk| seen.push(c.is_end());
            sink.deliver(&Chunk::end(StreamKind::Stdout));
        }
        assert_eq!(seen, vec![true]);
    }
}
