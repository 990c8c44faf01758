//! Binary exit codes and flag handling

mod helpers;

use helpers::*;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn specgen(args: &[&str], log_file: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_specgen"))
        .args(args)
        .arg("--log-file")
        .arg(log_file)
        .args(["--progress", "off"])
        .env_remove("RUST_LOG")
        .env_remove("SPECGEN_CONFIG")
        .output()
        .expect("failed to run specgen binary")
}

#[test]
fn test_empty_root_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    std::fs::create_dir(&root).unwrap();
    let log_file = temp_dir.path().join("log/generatespec.log");

    let output = specgen(&["--root-folder", root.to_str().unwrap()], &log_file);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(count_log_lines(&log_file, "0 items to process"), 1);

    // Console mirror carries messages without timestamp or level
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.lines().any(|l| l == "0 items to process"), "stderr: {}", stderr);
}

#[test]
fn test_startup_line_carries_build_identity() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    std::fs::create_dir(&root).unwrap();
    let log_file = temp_dir.path().join("run.log");

    let output = specgen(&["--root-folder", root.to_str().unwrap()], &log_file);
    assert_eq!(output.status.code(), Some(0));

    let log = read_log(&log_file);
    let startup = log
        .lines()
        .find(|l| l.contains("Starting specgen"))
        .unwrap_or_else(|| panic!("no startup line in {}", log));
    assert!(startup.contains(env!("CARGO_PKG_VERSION")), "{}", startup);

    // RFC 3339 build timestamp, e.g. 2025-10-26T14:30:45-05:00
    let built = startup.split("built ").nth(1).unwrap_or_default().as_bytes();
    assert!(built.len() >= 20, "{}", startup);
    assert_eq!((built[4], built[7], built[10]), (b'-', b'-', b'T'), "{}", startup);
}

#[test]
fn test_missing_root_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("run.log");
    let missing = temp_dir.path().join("nowhere");

    let output = specgen(&["--root-folder", missing.to_str().unwrap()], &log_file);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(count_log_lines(&log_file, ":ERROR:"), 1);
}

#[test]
fn test_fail_on_item_error_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    let log_file = temp_dir.path().join("run.log");
    generate_test_wav(&root.join("good.wav"), &AudioConfig::default()).unwrap();
    write_corrupt_file(&root.join("bad.wav")).unwrap();

    let base = [
        "--root-folder",
        root.to_str().unwrap(),
        "--extension",
        "wav",
        "--decoder",
        "symphonia",
        "--workers",
        "2",
    ];

    let lenient = specgen(&base, &log_file);
    assert_eq!(lenient.status.code(), Some(0));

    let mut strict_args = base.to_vec();
    strict_args.push("--fail-on-item-error");
    let strict = specgen(&strict_args, &log_file);
    assert_eq!(strict.status.code(), Some(2));

    assert!(root.join("good.png").exists());
    assert!(!root.join("bad.png").exists());
}

#[test]
fn test_invalid_setting_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("run.log");

    let output = specgen(&["--workers", "0"], &log_file);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid configuration"));
}

#[test]
fn test_print_config_shows_effective_values() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("run.log");

    let output = specgen(&["--print-config", "--resolution", "256", "--dpi", "100"], &log_file);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("resolution = 256"), "stdout: {}", stdout);
    assert!(stdout.contains("dpi = 100"));
    assert!(!log_file.exists(), "print-config must not start logging");
}

#[test]
fn test_config_file_with_cli_override() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tracks");
    std::fs::create_dir(&root).unwrap();
    let log_file = temp_dir.path().join("run.log");
    let config_path = temp_dir.path().join("specgen.toml");
    std::fs::write(
        &config_path,
        format!(
            "root_folder = \"{}\"\nextensions = [\"flac\"]\n\n[workers]\ncount = 3\n",
            root.display()
        ),
    )
    .unwrap();

    let output = specgen(
        &["--config", config_path.to_str().unwrap(), "--print-config", "--workers", "7"],
        &log_file,
    );

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("count = 7"), "stdout: {}", stdout);
    assert!(stdout.contains("\"flac\""));
}
