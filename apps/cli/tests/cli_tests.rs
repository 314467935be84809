//! winch-cli 命令行集成测试
//!
//! 只覆盖无需硬件的路径：帮助、配置文件读写、连接前的参数校验。

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// 使用临时配置文件的 winch-cli 命令
fn winch_cli(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("winch-cli").unwrap();
    cmd.env("WINCH_CONFIG", dir.path().join("config.toml"));
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("send")
                .and(predicate::str::contains("jog"))
                .and(predicate::str::contains("torque"))
                .and(predicate::str::contains("stress"))
                .and(predicate::str::contains("shell")),
        );
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("winch-cli"));
}

#[test]
fn test_config_set_then_get() {
    let dir = TempDir::new().unwrap();

    winch_cli(&dir)
        .args(["config", "set", "--interface", "can0", "--motor-id", "3"])
        .assert()
        .success();

    let saved = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("interface = \"can0\""));

    winch_cli(&dir)
        .args(["config", "get", "interface"])
        .assert()
        .success()
        .stdout(predicate::str::contains("can0"));

    winch_cli(&dir)
        .args(["config", "get", "motor-id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));
}

#[test]
fn test_config_explicit_path_flag() {
    let dir = TempDir::new().unwrap();
    let other = dir.path().join("nested").join("winch.toml");

    winch_cli(&dir)
        .arg("--config")
        .arg(&other)
        .args(["config", "set", "--device", "/dev/ttyACM0"])
        .assert()
        .success();

    assert!(other.exists());
    assert!(!dir.path().join("config.toml").exists());
}

#[test]
fn test_config_get_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .args(["config", "get", "colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("colour"));
}

#[test]
fn test_send_rejects_bad_hex_before_connecting() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .args(["send", "ZZ", "00", "00", "00", "00", "00", "00", "00"])
        .args(["--device", "/dev/does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("无效的帧"));
}

#[test]
fn test_send_rejects_short_frame() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .args(["send", "91", "00", "00", "00", "00", "00", "00"])
        .args(["--device", "/dev/does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("无效的帧"));
}

#[test]
fn test_send_missing_device_fails() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .args(["send", "91", "00", "00", "00", "00", "00", "00", "00"])
        .args(["--device", "/dev/does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/dev/does-not-exist"));
}

#[test]
fn test_stress_rejects_zero_interval() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .args(["stress", "--interval-ms", "0"])
        .args(["--device", "/dev/does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("发送间隔"));
}

#[test]
fn test_torque_rejects_invalid_savgol_order() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .args(["torque", "--filter", "savgol", "--window", "5", "--order", "5"])
        .args(["--device", "/dev/does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Savitzky-Golay"));
}

#[test]
fn test_interface_and_device_conflict() {
    let dir = TempDir::new().unwrap();
    winch_cli(&dir)
        .args(["position", "--interface", "can0", "--device", "/dev/ttyUSB0"])
        .assert()
        .failure();
}
