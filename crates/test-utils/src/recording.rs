// crates/test-utils/src/recording.rs

//! Recording fakes for the supervisor's collaborators.

use std::sync::{Arc, Mutex};

use procpipe::engine::ActionLog;
use procpipe::stream::OutputSink;
use procpipe::supervise::ChildRegistry;
use procpipe::types::{Chunk, StreamKind};

/// One call made on a [`RecordingRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    Register(u32),
    Deregister(u32),
}

/// Registry that keeps every call in order and tracks the live set.
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    events: Mutex<Vec<RegistryEvent>>,
}

impl RecordingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn registered(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RegistryEvent::Register(pid) => Some(pid),
                RegistryEvent::Deregister(_) => None,
            })
            .collect()
    }
}

impl ChildRegistry for RecordingRegistry {
    fn register(&self, pid: u32) {
        self.events.lock().unwrap().push(RegistryEvent::Register(pid));
    }

    fn deregister(&self, pid: u32) {
        self.events
            .lock()
            .unwrap()
            .push(RegistryEvent::Deregister(pid));
    }

    fn snapshot(&self) -> Vec<u32> {
        let mut live = Vec::new();
        for event in self.events() {
            match event {
                RegistryEvent::Register(pid) => live.push(pid),
                RegistryEvent::Deregister(pid) => live.retain(|p| *p != pid),
            }
        }
        live
    }
}

/// Action log that keeps every line.
#[derive(Debug, Default)]
pub struct RecordingActionLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingActionLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ActionLog for RecordingActionLog {
    fn action(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Sink that keeps every chunk it sees, sentinels included.
#[derive(Debug, Clone, Default)]
pub struct ChunkRecorder {
    chunks: Arc<Mutex<Vec<Chunk>>>,
}

impl ChunkRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> Vec<Chunk> {
        self.chunks.lock().unwrap().clone()
    }

    /// Concatenated payload of one stream.
    pub fn bytes(&self, stream: StreamKind) -> Vec<u8> {
        self.chunks()
            .into_iter()
            .filter(|c| c.stream == stream)
            .flat_map(|c| c.data)
            .collect()
    }

    pub fn sentinels(&self, stream: StreamKind) -> usize {
        self.chunks()
            .iter()
            .filter(|c| c.stream == stream && c.is_end())
            .count()
    }
}

impl OutputSink for ChunkRecorder {
    fn deliver(&mut self, chunk: &Chunk) {
        self.chunks.lock().unwrap().push(chunk.clone());
    }
}
