// tests/cli_behaviour.rs
//
// Drives the real `procpipe` binary. Linux only: process liveness is read
// from /proc so zombies count as gone.
#![cfg(target_os = "linux")]

use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;

const PROCPIPE: &str = env!("CARGO_BIN_EXE_procpipe");
const WATCHDOG: &str = env!("CARGO_BIN_EXE_procpipe-watchdog");

fn procpipe(args: &[&str]) -> Output {
    Command::new(PROCPIPE)
        .args(args)
        .env("PROCPIPE_LOG", "warn")
        .env("PROCPIPE_WATCHDOG", WATCHDOG)
        .output()
        .expect("running procpipe")
}

fn process_gone(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Err(_) => true,
        // The state letter follows the parenthesised command name.
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
    }
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    cond()
}

fn read_pid(path: &Path) -> i32 {
    assert!(
        wait_until(Duration::from_secs(5), || {
            std::fs::read_to_string(path)
                .map(|s| s.trim().parse::<i32>().is_ok())
                .unwrap_or(false)
        }),
        "child never wrote its pid"
    );
    std::fs::read_to_string(path).unwrap().trim().parse().unwrap()
}

#[test]
fn command_output_is_passed_through() {
    let out = procpipe(&["--", "sh", "-c", "printf hi; printf err >&2"]);

    assert_eq!(out.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "hi");
    assert!(String::from_utf8_lossy(&out.stderr).contains("err"));
}

#[test]
fn quiet_suppresses_child_output() {
    let out = procpipe(&["--quiet", "--", "printf", "hi"]);

    assert_eq!(out.status.code(), Some(0));
    assert!(out.stdout.is_empty());
}

#[test]
fn exit_code_of_the_command_is_returned() {
    let out = procpipe(&["--", "sh", "-c", "exit 3"]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn exit_on_failure_terminates_with_one() {
    let out = procpipe(&["--exit-on-failure", "--", "sh", "-c", "exit 3"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("Error: sh failed with exit code 3"),
        "stderr was: {stderr}"
    );
}

#[test]
fn exit_on_failure_ignores_success() {
    let out = procpipe(&["--exit-on-failure", "--", "true"]);

    assert_eq!(out.status.code(), Some(0));
    assert!(!String::from_utf8_lossy(&out.stderr).contains("failed with exit code"));
}

#[test]
fn output_is_delivered_before_exit_on_failure_aborts() {
    let out = procpipe(&["--exit-on-failure", "--", "sh", "-c", "printf out; exit 3"]);

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "out");
}

#[test]
fn dry_run_lists_stages_without_running() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let config = dir.path().join("Procpipe.toml");
    std::fs::write(
        &config,
        format!(
            r#"
[[stage]]
cmd = "touch"
args = ["{}"]

[[stage]]
cmd = "cat"
"#,
            marker.display()
        ),
    )
    .unwrap();

    let out = procpipe(&["--dry-run", "--config", config.to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("stages (2):"), "{stdout}");
    assert!(stdout.contains("0. touch"));
    assert!(stdout.contains("1. cat"));
    assert!(!marker.exists());
}

#[test]
fn dry_run_of_a_command_shows_the_failure_policy() {
    let out = procpipe(&["--dry-run", "--exit-on-failure", "--", "sh", "-c", "exit 3"]);

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("sh -c 'exit 3'"), "{stdout}");
    assert!(stdout.contains("exit_on_failure: true"), "{stdout}");
}

#[test]
fn invalid_config_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("Procpipe.toml");
    std::fs::write(&config, "[config]\nwatchdog = true\n").unwrap();

    let out = procpipe(&["--config", config.to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("[[stage]]"));
}

#[test]
fn terminating_signal_is_forwarded_and_reraised() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("pid");
    let script = format!("echo $$ > {}; exec sleep 30", pidfile.display());

    let mut host = Command::new(PROCPIPE)
        .args(["--quiet", "--", "sh", "-c", &script])
        .env("PROCPIPE_LOG", "warn")
        // No sidecar, so only forwarding can stop the child.
        .env("PROCPIPE_WATCHDOG", dir.path().join("no-such-watchdog"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let child = read_pid(&pidfile);
    kill(Pid::from_raw(host.id() as i32), Signal::SIGTERM).unwrap();

    let status = host.wait().unwrap();
    assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
    assert!(
        wait_until(Duration::from_secs(3), || process_gone(child)),
        "child {child} survived SIGTERM"
    );
}

#[test]
fn watchdog_kills_child_when_host_is_killed() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("pid");
    let script = format!("echo $$ > {}; exec sleep 30", pidfile.display());

    let mut host = Command::new(PROCPIPE)
        .args(["--quiet", "--", "sh", "-c", &script])
        .env("PROCPIPE_LOG", "warn")
        .env("PROCPIPE_WATCHDOG", WATCHDOG)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let child = read_pid(&pidfile);
    assert!(!process_gone(child));

    // SIGKILL cannot be caught, so nothing in the host gets to clean up.
    host.kill().unwrap();
    host.wait().unwrap();

    let gone = wait_until(Duration::from_secs(3), || process_gone(child));
    if !gone {
        let _ = kill(Pid::from_raw(child), Signal::SIGKILL);
    }
    assert!(gone, "child {child} outlived its host");
}

#[test]
fn watchdog_is_silent_by_default() {
    let mut parent = Command::new("true").spawn().unwrap();
    let parent_pid = parent.id();
    parent.wait().unwrap();
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();

    let out = Command::new(WATCHDOG)
        .args([
            parent_pid.to_string(),
            child.id().to_string(),
            "--interval-ms".to_string(),
            "50".to_string(),
        ])
        .env_remove("PROCPIPE_LOG")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0));
    assert_eq!(child.wait().unwrap().signal(), Some(Signal::SIGKILL as i32));
    assert!(
        out.stderr.is_empty(),
        "stderr was: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}
