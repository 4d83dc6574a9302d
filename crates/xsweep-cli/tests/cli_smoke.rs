use std::fs;
use std::process::Command;

use tempfile::tempdir;

const CONFIG: &str = r#"
defaults:
  - _self_
  - sweeper: explicit
sweeper:
  combinations:
    - {model: resnet18, lr: 0.1}
    - {model: resnet50, lr: 0.01}
  seeds: [42, 123]
"#;

#[test]
fn plan_prints_one_line_per_job() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("config.yaml");
    fs::write(&config, CONFIG).expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_xsweep"))
        .arg("plan")
        .arg("--config")
        .arg(&config)
        .arg("epochs=5")
        .output()
        .expect("run xsweep plan");
    assert!(output.status.success(), "plan command failed");
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        [
            "model=resnet18 lr=0.1 seed=42 epochs=5",
            "model=resnet18 lr=0.1 seed=123 epochs=5",
            "model=resnet50 lr=0.01 seed=42 epochs=5",
            "model=resnet50 lr=0.01 seed=123 epochs=5",
        ]
    );
}

#[test]
fn dry_multirun_writes_report_into_sweep_dir() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("config.yaml");
    fs::write(&config, CONFIG).expect("write config");
    let sweep_dir = dir.path().join("multirun");

    let status = Command::new(env!("CARGO_BIN_EXE_xsweep"))
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--multirun")
        .arg("--dry-run")
        .arg("--sweep-dir")
        .arg(&sweep_dir)
        .status()
        .expect("run xsweep run");
    assert!(status.success(), "run command failed");
    let report: serde_json::Value =
        serde_json::from_slice(&fs::read(sweep_dir.join("sweep_report.json")).expect("report"))
            .expect("json");
    assert_eq!(report["jobs"].as_array().map(Vec::len), Some(4));
    assert_eq!(report["task_name"], "config");
}

#[test]
fn empty_combinations_fail_before_launch() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("config.yaml");
    fs::write(&config, "sweeper:\n  seeds: 3\n").expect("write config");
    let sweep_dir = dir.path().join("multirun");

    let status = Command::new(env!("CARGO_BIN_EXE_xsweep"))
        .args(["run", "--multirun", "--dry-run", "--config"])
        .arg(&config)
        .arg("--sweep-dir")
        .arg(&sweep_dir)
        .status()
        .expect("run xsweep run");
    assert!(!status.success());
    assert!(!sweep_dir.exists());
}

#[test]
fn search_path_lists_bundled_sweeper() {
    let output = Command::new(env!("CARGO_BIN_EXE_xsweep"))
        .arg("search-path")
        .output()
        .expect("run xsweep search-path");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("pkg://xsweep_host.conf"));
    assert!(stdout.contains("sweeper: explicit"));
}
