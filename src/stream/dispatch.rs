// src/stream/dispatch.rs

//! Delivery of pumped chunks to their destination.
//!
//! Both pumps of a process feed one channel and a single dispatcher task owns
//! the destination, so deliveries never overlap and a process's sinks are
//! never touched from two tasks at once. The dispatcher finishes once both
//! pumps have sent their sentinel and dropped their senders.

use std::fmt;
use std::io::ErrorKind;

use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::stream::sink::OutputSink;
use crate::types::Chunk;

/// Where the output of one process goes.
pub enum Route {
    /// Hand every chunk to each sink, in order.
    Sinks(Vec<Box<dyn OutputSink>>),
    /// Write every chunk of both streams into the next stage's stdin.
    Forward(ChildStdin),
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Sinks(sinks) => write!(f, "Route::Sinks({})", sinks.len()),
            Route::Forward(_) => f.write_str("Route::Forward"),
        }
    }
}

/// Spawn the dispatcher for one process.
pub fn spawn_dispatcher(rx: mpsc::Receiver<Chunk>, route: Route, label: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        match route {
            Route::Sinks(sinks) => deliver_to_sinks(rx, sinks).await,
            Route::Forward(stdin) => forward_to_stdin(rx, stdin, &label).await,
        }
        debug!(command = %label, "output dispatch finished");
    })
}

async fn deliver_to_sinks(mut rx: mpsc::Receiver<Chunk>, mut sinks: Vec<Box<dyn OutputSink>>) {
    while let Some(chunk) = rx.recv().await {
        for sink in sinks.iter_mut() {
            sink.deliver(&chunk);
        }
    }
}

async fn forward_to_stdin(mut rx: mpsc::Receiver<Chunk>, stdin: ChildStdin, label: &str) {
    let mut stdin = Some(stdin);
    let mut ended = 0;

    while let Some(chunk) = rx.recv().await {
        if chunk.is_end() {
            ended += 1;
            if ended == 2 {
                // Closing our end is what lets the next stage see EOF.
                stdin = None;
            }
            continue;
        }

        let Some(writer) = stdin.as_mut() else {
            continue;
        };

        if let Err(err) = writer.write_all(&chunk.data).await {
            if err.kind() == ErrorKind::BrokenPipe {
                debug!(command = %label, "next stage closed its input; dropping further output");
            } else {
                warn!(command = %label, error = %err, "forwarding to next stage failed");
            }
            stdin = None;
        }
    }
}
