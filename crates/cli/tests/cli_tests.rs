// Integration tests for the `ptrace` binary: exit codes and stdout contracts.
//
// Run with: cargo test -p pledgetrace-cli --test cli_tests -- --nocapture

use std::process::{Command, Output};

use httpmock::prelude::*;

fn ptrace() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ptrace"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("PLEDGETRACE_SEED");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn summary(amount: &str, count: i64) -> serde_json::Value {
    serde_json::json!({
        "total_amount_committed": { "amount": amount, "count": count }
    })
}

/// Config file pointing the issuance client at `server`.
fn write_config(dir: &tempfile::TempDir, server: &MockServer) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let text = format!(
        "[extract]\nmin_amount_cents = 500\nmax_amount_cents = 500\n\n\
         [issuance]\napi_url = \"{}\"\nslugs = [\"acme-rega\"]\nepoch = \"2025-04-10\"\ntimeout_secs = 5\n",
        server.url("/summary/")
    );
    std::fs::write(&path, text).unwrap();
    path
}

/// One pledge of $5.00 on day 0.
fn mock_single_pledge(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/summary/")
            .query_param_missing("shares_amount__gte");
        then.status(200).json_body(summary("5.00", 1));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/summary/")
            .query_param("shares_amount__gte", "5.00");
        then.status(200).json_body(summary("5.00", 1));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/summary/")
            .query_param("shares_amount__gte", "5.01");
        then.status(200).json_body(summary("0", 0));
    });
}

// ===========================================================================
// ptrace synth
// ===========================================================================

#[test]
fn synth_with_seed_verifies() {
    let output = ptrace()
        .args(["synth", "--seed", "1f", "--entries", "40", "--days", "5", "--min", "100", "--max", "900"])
        .output()
        .expect("ptrace synth");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("seed:      1f"));
    assert!(out.contains("entries:   40"));
    assert!(out.trim_end().ends_with("ok"));
}

#[test]
fn synth_json_report() {
    let output = ptrace()
        .args(["synth", "--seed", "0xabc", "--entries", "25", "--days", "4", "--min", "1", "--max", "5000", "--fast", "--json"])
        .output()
        .expect("ptrace synth --json");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(val["seed"], "abc");
    assert_eq!(val["strategy"], "fast");
    assert_eq!(val["verified"], true);
    assert_eq!(val["anomalies"], 0);
    assert!(val["queries"].as_u64().unwrap() > 0);
}

#[test]
fn synth_seed_from_env() {
    let output = ptrace()
        .env("PLEDGETRACE_SEED", "beef")
        .args(["synth", "--entries", "10", "--days", "3", "--day-exact", "--json"])
        .output()
        .expect("ptrace synth");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(val["seed"], "beef");
    assert_eq!(val["mode"], "day_exact");
}

#[test]
fn synth_random_seed_is_printed() {
    let output = ptrace()
        .args(["synth", "--entries", "5", "--days", "2"])
        .output()
        .expect("ptrace synth");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).starts_with("seed: "));
}

#[test]
fn synth_bad_seed_is_usage_error() {
    let output = ptrace().args(["synth", "--seed", "zz"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("invalid seed 'zz'"));
}

#[test]
fn synth_zero_days_is_config_error() {
    let output = ptrace().args(["synth", "--seed", "1", "--days", "0"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn synth_reversed_bounds_is_config_error() {
    let output = ptrace()
        .args(["synth", "--seed", "1", "--min", "900", "--max", "100"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("hint:"));
}

// ===========================================================================
// ptrace extract
// ===========================================================================

#[test]
fn extract_no_cache_with_save_cache_is_usage_error() {
    let output = ptrace()
        .args(["extract", "--no-cache", "--save-cache", "run", "--days", "1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--no-cache"));
}

#[test]
fn extract_unknown_format_is_usage_error() {
    let output = ptrace().args(["extract", "--format", "xml"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn extract_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = ptrace()
        .args(["extract", "--days", "1", "--config"])
        .arg(dir.path().join("missing.toml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn extract_csv_against_mock_api() {
    let server = MockServer::start();
    mock_single_pledge(&server);
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);

    let output = ptrace()
        .args(["extract", "--days", "1", "--format", "csv", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "slug,day,date,amount_cents,amount\nacme-rega,0,2025-04-10,500,5.00\n"
    );
}

#[test]
fn extract_saves_cache_then_runs_offline() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let prefix = prefix.to_str().unwrap();

    {
        let server = MockServer::start();
        mock_single_pledge(&server);
        let config = write_config(&dir, &server);
        let output = ptrace()
            .args(["extract", "--days", "1", "--save-cache", prefix, "--config"])
            .arg(&config)
            .output()
            .unwrap();
        assert!(output.status.success(), "stderr: {}", stderr(&output));
    }
    assert!(dir.path().join("run-acme-rega.json").exists());

    // same answers from the saved cache with nothing listening
    let server = MockServer::start();
    let config = write_config(&dir, &server);
    let output = ptrace()
        .args(["extract", "--days", "1", "--load-cache", prefix, "--format", "json", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(val["slugs"][0]["investments"][0]["amount_cents"], 500);
}

#[test]
fn extract_missing_load_cache_only_warns() {
    let server = MockServer::start();
    mock_single_pledge(&server);
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);
    let prefix = dir.path().join("absent");

    let output = ptrace()
        .args(["extract", "--days", "1", "--load-cache", prefix.to_str().unwrap(), "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("no cache at"));
}

#[test]
fn extract_server_error_exit_code() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/summary/");
        then.status(502).body("bad gateway");
    });
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);

    let output = ptrace()
        .args(["extract", "--days", "2", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(10));
    assert!(stderr(&output).contains("HTTP 502"));
    assert!(stdout(&output).is_empty());
}

// ===========================================================================
// ptrace totals
// ===========================================================================

#[test]
fn totals_json() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/summary/")
            .query_param("slug", "acme-rega")
            .query_param("processed_at__date__gte", "2025-04-10")
            .query_param("shares_amount__gte", "1000.00");
        then.status(200).json_body(summary("25000.50", 7));
    });
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);

    let output = ptrace()
        .args(["totals", "--threshold", "100000", "--json", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(val["amount_cents"], 2500050);
    assert_eq!(val["count"], 7);
    assert_eq!(val["threshold_cents"], 100000);
    mock.assert();
}

#[test]
fn totals_plain() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/summary/");
        then.status(200).json_body(summary("1234.5", 3));
    });
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);

    let output = ptrace()
        .args(["totals", "--no-timestamp", "--dollar", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "dollar total: $1,234.50, slots: 3\n");
}

#[test]
fn totals_defaults_to_priority_threshold_with_timestamp() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/summary/")
            .query_param("shares_amount__gte", "5000.00");
        then.status(200).json_body(summary("15000", 2));
    });
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);

    let output = ptrace().args(["totals", "--config"]).arg(&config).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    let (ts, rest) = out.trim_end().split_once(' ').unwrap();
    assert!(chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S").is_ok(), "timestamp: {ts}");
    assert_eq!(rest, "slots: 2");
    mock.assert();
}

#[test]
fn totals_remaining_and_average() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/summary/");
        then.status(200).json_body(summary("15000", 3));
    });
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);

    let output = ptrace()
        .args(["totals", "--no-timestamp", "--remaining", "--average", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "slots: 997, average: $5,000.00\n");

    let output = ptrace()
        .args(["totals", "--no-timestamp", "--remaining", "--total-slots", "10", "--csv", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "7\n");
}

#[test]
fn totals_all_drops_threshold() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/summary/")
            .query_param_missing("shares_amount__gte");
        then.status(200).json_body(summary("0", 0));
    });
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &server);

    let output = ptrace()
        .args(["totals", "--all", "--no-timestamp", "--average", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "slots: 0, average: n/a\n");
    mock.assert();
}

#[test]
fn totals_all_conflicts_with_remaining() {
    let output = ptrace().args(["totals", "--all", "--remaining"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).is_empty());
}
