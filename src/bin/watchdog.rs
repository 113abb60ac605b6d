// src/bin/watchdog.rs

use std::time::Duration;

use clap::Parser;
use procpipe::cli::WatchdogArgs;
use procpipe::logging;
use procpipe::supervise::watch_parent;

fn main() {
    let args = WatchdogArgs::parse();
    if let Err(err) = logging::init_sidecar_logging() {
        eprintln!("procpipe-watchdog: {err:?}");
    }

    watch_parent(
        args.parent_pid,
        args.child_pid,
        Duration::from_millis(args.interval_ms),
    );
}
