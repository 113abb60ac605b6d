// tests/config_errors.rs

use std::io::Write;
use std::path::Path;

use procpipe::config::load_and_validate;
use procpipe::errors::ProcpipeError;
use procpipe_test_utils::{init_tracing, test_supervisor, with_timeout};
use tempfile::NamedTempFile;

fn write_config(src: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{src}").unwrap();
    file
}

#[test]
fn missing_stages_is_a_config_error() {
    let file = write_config(
        r#"
[config]
print_output = false
"#,
    );

    match load_and_validate(file.path()) {
        Err(ProcpipeError::ConfigError(msg)) => assert!(msg.contains("[[stage]]")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn blank_command_names_the_stage() {
    let file = write_config(
        r#"
[[stage]]
cmd = "printf"

[[stage]]
cmd = "   "
"#,
    );

    match load_and_validate(file.path()) {
        Err(ProcpipeError::ConfigError(msg)) => assert!(msg.contains("stage 1"), "{msg}"),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn env_key_with_equals_is_rejected() {
    let file = write_config(
        r#"
[[stage]]
cmd = "env"
env = { "A=B" = "1" }
"#,
    );

    match load_and_validate(file.path()) {
        Err(ProcpipeError::ConfigError(msg)) => assert!(msg.contains("A=B"), "{msg}"),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unbuffered_token_must_be_an_assignment() {
    let file = write_config(
        r#"
[config]
unbuffered_token = "foo"

[[stage]]
cmd = "true"
"#,
    );

    match load_and_validate(file.path()) {
        Err(ProcpipeError::ConfigError(msg)) => {
            assert!(msg.contains("unbuffered_token"), "{msg}");
            assert!(msg.contains("foo"), "{msg}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_stage_field_is_a_toml_error() {
    let file = write_config(
        r#"
[[stage]]
cmd = "echo"
shell = true
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(ProcpipeError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Procpipe.toml"));
    assert!(matches!(result, Err(ProcpipeError::IoError(_))));
}

#[test]
fn settings_map_onto_supervisor_config() {
    let file = write_config(
        r#"
[config]
watchdog_path = "/opt/bin/procpipe-watchdog"
forward_signals = false
unbuffered_token = ""

[[stage]]
cmd = "true"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap().config.supervisor_config();
    assert!(!cfg.forward_signals);
    assert!(cfg.reraise_signals);
    assert_eq!(cfg.unbuffered_token, None);
    assert_eq!(
        cfg.watchdog,
        procpipe::WatchdogMode::Path("/opt/bin/procpipe-watchdog".into())
    );
}

#[tokio::test]
async fn loaded_pipeline_runs_relative_to_base_dir() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("data")).unwrap();
    std::fs::write(dir.path().join("data/words.txt"), "pear\napple\n").unwrap();

    let config_path = dir.path().join("Procpipe.toml");
    std::fs::write(
        &config_path,
        r#"
[[stage]]
cmd = "cat"
args = ["words.txt"]
dir = "data"

[[stage]]
cmd = "sort"
env = { LC_ALL = "C" }
"#,
    )
    .unwrap();

    let file = load_and_validate(&config_path).unwrap();
    assert_eq!(file.stage_count(), 2);

    let pipeline = file.to_pipeline(dir.path());
    assert_eq!(
        pipeline.source().get_working_dir(),
        Some(Path::new(&dir.path().join("data")))
    );

    let t = test_supervisor();
    let out = with_timeout(t.supervisor.run_for_output(pipeline)).await.unwrap();
    assert_eq!(out.stdout, "apple\npear\n");
}
