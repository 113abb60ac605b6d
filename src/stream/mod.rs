// src/stream/mod.rs

//! Child output streaming.
//!
//! - [`pump`] reads one pipe of a child and turns it into [`Chunk`]s.
//! - [`dispatch`] hands the chunks of a process to its [`dispatch::Route`].
//! - [`sink`] holds the consumer trait and the stock consumers.
//!
//! [`Chunk`]: crate::types::Chunk

pub mod dispatch;
pub mod pump;
pub mod sink;

pub use dispatch::{Route, spawn_dispatcher};
pub use pump::spawn_pump;
pub use sink::{CaptureSink, Captured, OutputSink, PrintSink, WriterSink};
