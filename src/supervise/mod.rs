// src/supervise/mod.rs

//! Liveness supervision of spawned children.
//!
//! - [`registry`] tracks which child PIDs are currently running.
//! - [`signals`] relays terminal signals to those PIDs.
//! - [`watchdog`] covers the case where the host dies without running any
//!   handler at all.

pub mod registry;
pub mod signals;
pub mod watchdog;

pub use registry::{ChildRegistry, SharedRegistry};
pub use signals::{SignalForwarder, forward_signal};
pub use watchdog::{WatchOutcome, locate_watchdog, watch_parent};
