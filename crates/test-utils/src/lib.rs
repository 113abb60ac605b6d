pub mod recording;

use std::sync::{Arc, Once};

use procpipe::engine::{ActionLog, SupervisorBuilder};
use procpipe::supervise::ChildRegistry;
use procpipe::{Supervisor, SupervisorConfig, WatchdogMode};
use tracing_subscriber::{EnvFilter, fmt};

pub use recording::{ChunkRecorder, RecordingActionLog, RecordingRegistry, RegistryEvent};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Settings for in-process tests: no signal handlers, no sidecars.
pub fn quiet_config() -> SupervisorConfig {
    SupervisorConfig {
        forward_signals: false,
        reraise_signals: false,
        watchdog: WatchdogMode::Disabled,
        ..SupervisorConfig::default()
    }
}

/// Supervisor wired to recording fakes.
pub struct TestSupervisor {
    pub supervisor: Supervisor,
    pub registry: Arc<RecordingRegistry>,
    pub actions: Arc<RecordingActionLog>,
}

pub fn test_supervisor() -> TestSupervisor {
    test_supervisor_with(Supervisor::builder(quiet_config()))
}

/// Same as [`test_supervisor`] but starting from a caller-prepared builder.
pub fn test_supervisor_with(builder: SupervisorBuilder) -> TestSupervisor {
    let registry = RecordingRegistry::new();
    let actions = RecordingActionLog::new();

    let supervisor = builder
        .registry(Arc::clone(&registry) as Arc<dyn ChildRegistry>)
        .action_log(Arc::clone(&actions) as Arc<dyn ActionLog>)
        .build()
        .expect("building test supervisor");

    TestSupervisor {
        supervisor,
        registry,
        actions,
    }
}
