//! Integration tests for the `ifpick` binary.
//!
//! These tests run the real binary against fake sysfs trees and
//! `/proc/net/dev` files, using a short sampling window.

use anyhow::Result;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn ifpick_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ifpick"))
}

fn run(args: &[&str]) -> Result<Output> {
    Ok(Command::new(ifpick_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .output()?)
}

fn write_device(root: &Path, name: &str, ifindex: u32, rx: u64, tx: u64) -> Result<()> {
    let stats = root.join(name).join("statistics");
    fs::create_dir_all(&stats)?;
    fs::write(root.join(name).join("ifindex"), format!("{}\n", ifindex))?;
    fs::write(stats.join("rx_bytes"), format!("{}\n", rx))?;
    fs::write(stats.join("tx_bytes"), format!("{}\n", tx))?;
    Ok(())
}

#[test]
fn test_cli_help_works() -> Result<()> {
    let output = run(&["--help"])?;

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ifpick"));
    assert!(stdout.contains("--window"));
    assert!(stdout.contains("--source"));
    assert!(stdout.contains("--exclude"));
    assert!(stdout.contains("--json"));
    assert!(stdout.contains("--config"));

    Ok(())
}

#[test]
fn test_cli_version_works() -> Result<()> {
    let output = run(&["--version"])?;

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));

    Ok(())
}

#[test]
fn test_cli_invalid_args() -> Result<()> {
    let output = run(&["--invalid-option"])?;
    assert!(!output.status.success());

    let output = run(&["--source", "netlink"])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid value") || stderr.contains("possible values"));

    Ok(())
}

#[test]
fn test_cli_rejects_invalid_window() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_device(dir.path(), "eth0", 2, 0, 0)?;
    let root = dir.path().to_string_lossy().into_owned();

    let output = run(&["--sysfs-root", &root, "--window", "0s"])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("sampling window"));
    assert!(output.stdout.is_empty());

    Ok(())
}

#[test]
fn test_cli_rejects_sub_millisecond_window() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_device(dir.path(), "eth0", 2, 0, 0)?;
    let root = dir.path().to_string_lossy().into_owned();

    let output = run(&["--sysfs-root", &root, "--window", "500us", "--json"])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("at least 1ms"));
    assert!(output.stdout.is_empty());

    Ok(())
}

#[test]
fn test_cli_prints_first_interface_on_idle_sysfs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_device(dir.path(), "lo", 1, 500, 500)?;
    write_device(dir.path(), "wlan0", 3, 10, 10)?;
    write_device(dir.path(), "eth0", 2, 10, 10)?;
    let root = dir.path().to_string_lossy().into_owned();

    let output = run(&["--sysfs-root", &root, "--window", "20ms"])?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "eth0\n");

    Ok(())
}

#[test]
fn test_cli_json_report() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_device(dir.path(), "eth0", 2, 0, 0)?;
    write_device(dir.path(), "eth1", 3, 0, 0)?;
    let root = dir.path().to_string_lossy().into_owned();

    let output = run(&["--sysfs-root", &root, "--window", "20ms", "--json"])?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["interface"], "eth0");
    assert_eq!(report["reason"], "idle_fallback");
    assert_eq!(report["window_ms"], 20);
    assert_eq!(report["deltas"].as_array().map(|d| d.len()), Some(2));

    Ok(())
}

#[test]
fn test_cli_exclude_pattern() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_device(dir.path(), "docker0", 2, 0, 0)?;
    write_device(dir.path(), "eth0", 3, 0, 0)?;
    let root = dir.path().to_string_lossy().into_owned();

    let output = run(&[
        "--sysfs-root",
        &root,
        "--window",
        "20ms",
        "--exclude",
        "docker\\d+",
    ])?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "eth0\n");

    Ok(())
}

#[test]
fn test_cli_no_interfaces_found() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_device(dir.path(), "lo", 1, 0, 0)?;
    let root = dir.path().to_string_lossy().into_owned();

    let output = run(&["--sysfs-root", &root, "--window", "20ms"])?;

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No network interfaces found"));

    Ok(())
}

#[test]
fn test_cli_proc_source() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let dev = dir.path().join("dev");
    fs::write(
        &dev,
        "Inter-|   Receive |  Transmit\n face |bytes packets|bytes packets\n\
         \x20   lo: 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n\
         \x20 wlan0: 5 0 0 0 0 0 0 0 5 0 0 0 0 0 0 0\n",
    )?;
    let dev = dev.to_string_lossy().into_owned();

    let output = run(&["--source", "proc", "--proc-net-dev", &dev, "--window", "20ms"])?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "wlan0\n");

    Ok(())
}

#[test]
fn test_cli_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let sys = dir.path().join("net");
    write_device(&sys, "veth0", 2, 0, 0)?;
    write_device(&sys, "enp3s0", 3, 0, 0)?;

    let config = dir.path().join("ifpick.json5");
    fs::write(
        &config,
        format!(
            "{{\n  // test host\n  window: '20ms',\n  sysfs_root: {:?},\n  exclude: ['veth.*'],\n}}\n",
            sys.to_string_lossy()
        ),
    )?;
    let config = config.to_string_lossy().into_owned();

    let output = run(&["--config", &config])?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "enp3s0\n");

    Ok(())
}

#[test]
fn test_cli_missing_config_file() -> Result<()> {
    let output = run(&["--config", "/nonexistent/ifpick.json5"])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read config file"));

    Ok(())
}

#[test]
fn test_cli_invalid_rust_log_still_detects() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_device(dir.path(), "eth0", 2, 0, 0)?;
    let root = dir.path().to_string_lossy().into_owned();

    let output = Command::new(ifpick_binary())
        .args(["--sysfs-root", &root, "--window", "10ms"])
        .env("RUST_LOG", "==bad")
        .output()?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "eth0\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Ignoring invalid log filter '==bad'"));

    Ok(())
}

#[cfg(unix)]
#[test]
fn test_cli_sigint_exits_130() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_device(dir.path(), "eth0", 2, 0, 0)?;
    let root = dir.path().to_string_lossy().into_owned();

    let mut child = Command::new(ifpick_binary())
        .args(["--sysfs-root", &root, "--window", "10s", "--verbose"])
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // The handler is installed before sampling starts, so wait for that log line
    let mut stderr = BufReader::new(child.stderr.take().expect("piped stderr"));
    let mut line = String::new();
    while stderr.read_line(&mut line)? > 0 && !line.contains("Sampling") {
        line.clear();
    }
    assert!(line.contains("Sampling"), "detection never started");

    let kill = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()?;
    assert!(kill.success());

    let status = child.wait()?;
    let mut stdout = String::new();
    child.stdout.take().expect("piped stdout").read_to_string(&mut stdout)?;
    let mut rest = String::new();
    stderr.read_to_string(&mut rest)?;

    assert_eq!(status.code(), Some(130));
    assert!(stdout.is_empty());
    assert!(rest.contains("Interrupted"));

    Ok(())
}
