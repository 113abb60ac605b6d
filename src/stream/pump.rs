// src/stream/pump.rs

//! Per-stream reader task.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::types::{Chunk, StreamKind};

const READ_BUF: usize = 8 * 1024;

/// Spawn a task that drains `reader` into `tx`.
///
/// Every successful read is sent as soon as it completes. When the stream
/// reaches EOF (or a read fails) exactly one empty sentinel chunk is sent and
/// the task ends.
pub fn spawn_pump<R>(mut reader: R, stream: StreamKind, tx: mpsc::Sender<Chunk>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUF];
        let mut total = 0usize;

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    total += n;
                    if tx.send(Chunk::new(stream, buf[..n].to_vec())).await.is_err() {
                        // Dispatcher is gone; keep draining so the child never
                        // blocks on a full pipe.
                        trace!(%stream, "dispatcher closed; discarding output");
                    }
                }
                Err(err) => {
                    warn!(%stream, error = %err, "read from child failed; ending stream");
                    break;
                }
            }
        }

        trace!(%stream, bytes = total, "stream reached end");
        let _ = tx.send(Chunk::end(stream)).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_data_then_one_sentinel() {
        let (tx, mut rx) = mpsc::channel(8);
        let data: &'static [u8] = b"hello world";

        spawn_pump(data, StreamKind::Stdout, tx).await.unwrap();

        let mut chunks = Vec::new();
        while let Some(c) = rx.recv().await {
            chunks.push(c);
        }

        let (last, body) = chunks.split_last().unwrap();
        assert!(last.is_end());
        assert!(body.iter().all(|c| !c.is_end()));
        let joined: Vec<u8> = body.iter().flat_map(|c| c.data.clone()).collect();
        assert_eq!(joined, data);
    }

    #[tokio::test]
    async fn empty_stream_yields_only_sentinel() {
        let (tx, mut rx) = mpsc::channel(8);
        let data: &'static [u8] = b"";

        spawn_pump(data, StreamKind::Stderr, tx).await.unwrap();

        assert_eq!(rx.recv().await, Some(Chunk::end(StreamKind::Stderr)));
        assert_eq!(rx.recv().await, None);
    }
}
