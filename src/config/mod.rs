// src/config/mod.rs

//! Pipeline files for the `procpipe` launcher.
//!
//! - TOML data model (`model.rs`).
//! - Loading from disk (`loader.rs`).
//! - Validation into a [`PipelineFile`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigSection, PipelineFile, RawPipelineFile, StageConfig};
