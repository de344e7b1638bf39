//! Process-level startup checks for the `octomuffin` binary

#![allow(clippy::expect_used)] // Tests can unwrap

use std::process::Command;

#[test]
fn missing_sink_exits_with_failure() {
    let output = Command::new(env!("CARGO_BIN_EXE_octomuffin"))
        .env_remove("K_SINK")
        .env("RUST_LOG", "octomuffin=error")
        // Keep a developer's .env out of the run
        .current_dir(std::env::temp_dir())
        .output()
        .expect("binary starts");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("K_SINK"), "stderr: {stderr}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("failed to process env var"), "stdout: {stdout}");
}

#[test]
fn unparsable_sink_exits_with_failure() {
    let output = Command::new(env!("CARGO_BIN_EXE_octomuffin"))
        .env("K_SINK", "not a url")
        .env("RUST_LOG", "octomuffin=error")
        .current_dir(std::env::temp_dir())
        .output()
        .expect("binary starts");

    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("failed to create client"), "stdout: {stdout}");
}
