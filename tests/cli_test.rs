use std::process::Command;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_traffic_manager"))
        .args(args)
        .env("RUST_LOG", "warn,traffic_manager=info")
        .output()
        .expect("Failed to execute traffic_manager")
}

/// Test that a headless run completes and logs its statistics
#[test]
fn test_headless_run_logs_statistics() {
    let output = run_cli(&["--quota", "5", "--arrival-interval", "2", "--seed", "7"]);

    assert!(
        output.status.success(),
        "Injection run failed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("INJECTION COMPLETE"), "stderr: {}", stderr);

    let injected_line = stderr
        .lines()
        .find(|line| line.contains("Total vehicles injected:"))
        .expect("Could not find 'Total vehicles injected' line");
    let parts: Vec<&str> = injected_line.split("Total vehicles injected:").collect();
    let injected: u32 = parts
        .get(1)
        .and_then(|s| s.trim().parse().ok())
        .expect("Could not parse injected count");
    assert_eq!(injected, 5);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Exhausted"), "stdout: {}", stdout);
}

/// Test that a negative quota is refused before anything runs
#[test]
fn test_negative_quota_fails() {
    let output = run_cli(&["--quota", "-3"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("non-negative"), "stderr: {}", stderr);
}

/// Test that stopping early cancels the remaining injections
#[test]
fn test_until_cancels_remaining_vehicles() {
    let output = run_cli(&[
        "--quota",
        "1000",
        "--arrival-interval",
        "5",
        "--seed",
        "1",
        "--until",
        "20",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cancelled"), "stdout: {}", stdout);
}

/// Test that a seed outside the parameter range is refused instead of wrapped
#[test]
fn test_out_of_range_seed_fails() {
    let output = run_cli(&["--quota", "1", "--seed", "9223372036854775808"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--seed"), "stderr: {}", stderr);
}
