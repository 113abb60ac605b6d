// src/task/mod.rs

//! Describing work to run.
//!
//! A [`TaskSpec`] configures one process; a [`Pipeline`] chains one or more
//! of them and owns the output consumers. Nothing in here touches the OS:
//! launching happens in [`crate::engine`].

pub mod pipeline;
pub mod spec;

pub use pipeline::Pipeline;
pub use spec::TaskSpec;
