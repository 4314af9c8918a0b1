use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

// Minimal valid config for the simulated backend; settings live in the temp dir
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let settings = dir.path().join("var").join("settings.toml");
    let toml = format!(
        r#"
[pins]
# pins are unused in sim backend but must be present
in1 = 5
in2 = 6
in3 = 13
in4 = 19
step = 20
dir = 21
enable = 26

[motor]
kind = "a4988"
acceleration = 4000.0
max_speed = 4000.0

[control]
loop_hz = 2000
step_rotations = 0.05

[storage]
path = "{}"

[auth]
api_key = "k3y"
"#,
        settings.display()
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn curtain(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("curtain").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK: motor a4988", "stdout")]
#[case(&["status"], 0, "position 0.000", "stdout")]
#[case(&["exec", "set_left"], 0, "ok: left threshold set to 0.000", "stdout")]
#[case(&["exec", "status", "--token", "wrong"], 1, "unauthorized", "stdout")]
#[case(&["exec", "dance"], 1, "unsupported action: dance", "stdout")]
#[case(&["exec", "move"], 1, "missing value for move", "stdout")]
#[case(&["exec"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = curtain(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn missing_config_is_a_config_error() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("curtain").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("status");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("config file could not be read"));
}

#[rstest]
fn invalid_config_reports_json_reason() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[pins]\nin1 = 1\n").unwrap();
    let mut cmd = Command::cargo_bin("curtain").unwrap();
    cmd.arg("--json").arg("--config").arg(&cfg).arg("status");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("\"reason\":\"Config\""));
}

#[rstest]
fn move_settles_and_persists() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    curtain(&cfg)
        .args(["exec", "step_right"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settled at 0.050"));

    let out = curtain(&cfg)
        .args(["--json", "status"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let status: Value = serde_json::from_slice(&out.stdout).unwrap();
    let current = status["position"]["current"].as_f64().unwrap();
    assert!((current - 0.05).abs() < 1e-4, "current = {current}");
    assert_eq!(status["motor"]["steps_per_revolution"], 200);
    assert_eq!(status["running"], false);
}

#[rstest]
fn negative_values_are_not_flags() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    curtain(&cfg)
        .args(["exec", "set_left", "-2.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("left threshold set to -2.500"));
}

#[rstest]
fn erase_restores_factory_settings() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    curtain(&cfg).args(["exec", "set_right"]).assert().success();
    curtain(&cfg)
        .arg("erase")
        .assert()
        .success()
        .stdout(predicate::str::contains("settings erased"));
    curtain(&cfg)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("right 100.000 (unset)"));
}

#[rstest]
fn serve_answers_one_json_line_per_request() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let input = [
        r#"{"action":"status","token":"k3y"}"#,
        r#"{"action":"set_left","token":"k3y"}"#,
        r#"{"action":"move_total_left","token":"k3y"}"#,
        "not json",
        r#"{"action":"status","token":"nope"}"#,
        r#"{"action":"set_motor_params","value":"800,1200","token":"k3y"}"#,
    ]
    .join("\n");

    let out = curtain(&cfg)
        .arg("serve")
        .write_stdin(input + "\n")
        .output()
        .unwrap();
    assert!(out.status.success());

    let replies: Vec<Value> = String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(replies.len(), 6);

    assert_eq!(replies[0]["status"], "ok");
    assert_eq!(replies[0]["data"]["position"]["left_set"], false);
    assert_eq!(replies[1]["status"], "ok");
    // Left is at the current position: a zero move.
    assert_eq!(replies[2]["status"], "ok");
    assert_eq!(replies[3]["status"], "error");
    assert!(
        replies[3]["message"]
            .as_str()
            .unwrap()
            .starts_with("malformed request")
    );
    assert_eq!(replies[4]["status"], "error");
    assert_eq!(replies[4]["message"], "unauthorized");
    assert_eq!(replies[5]["status"], "ok");
    assert!(replies[5].get("data").is_none());
}
