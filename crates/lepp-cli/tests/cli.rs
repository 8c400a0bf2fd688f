//! End-to-end tests of the `lepp` binary.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

/// Two thin triangles sharing their longest edge.
const DIAMOND: &str = "OFF\n4 2 0\n0 0 0\n4 0 0\n2 0.5 0\n2 -0.5 0\n3 0 1 2\n3 0 3 1\n";

fn lepp(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lepp"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_diamond(dir: &Path) -> String {
    let path = dir.join("diamond.off");
    std::fs::write(&path, DIAMOND).unwrap();
    path.display().to_string()
}

#[test]
fn test_info_json() {
    let dir = tempdir().unwrap();
    let input = write_diamond(dir.path());

    let out = lepp(&["--format", "json", "info", &input]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["vertices"], 4);
    assert_eq!(json["triangles"], 2);
    assert_eq!(json["edges"], 5);
    assert_eq!(json["boundary_edges"], 4);
}

#[test]
fn test_detect_reports_terminal_edge() {
    let dir = tempdir().unwrap();
    let input = write_diamond(dir.path());

    let out = lepp(&["--format", "json", "detect", &input, "--angle", "30"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["bad_triangles"], 2);
    assert_eq!(json["terminal_edges"], 1);
    assert_eq!(json["border_terminal_edges"], 0);
}

#[test]
fn test_refine_writes_output() {
    let dir = tempdir().unwrap();
    let input = write_diamond(dir.path());
    let output = dir.path().join("refined.off");

    let out = lepp(&[
        "--format",
        "json",
        "refine",
        &input,
        "-o",
        output.to_str().unwrap(),
        "--angle",
        "30",
        "--engine",
        "parallel",
        "--threads",
        "2",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["engine"], "data-parallel (rayon)");
    assert_eq!(json["output_vertices"], 5);
    assert_eq!(json["report"]["insertions"], 1);

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("OFF"));
    assert!(written.contains("5 4 8"));
}

#[test]
fn test_gpu_engine_always_runs() {
    let dir = tempdir().unwrap();
    let input = write_diamond(dir.path());
    let output = dir.path().join("refined.off");

    let out = lepp(&[
        "-q",
        "refine",
        &input,
        "-o",
        output.to_str().unwrap(),
        "--engine",
        "gpu",
    ]);
    assert!(out.status.success());
    assert!(output.exists());
}

#[test]
fn test_invalid_angle_fails_with_code() {
    let dir = tempdir().unwrap();
    let input = write_diamond(dir.path());

    let out = lepp(&["detect", &input, "--angle", "190"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("LEPP-2001"), "{stderr}");
}

#[test]
fn test_missing_file_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.off");
    let out = lepp(&["validate", missing.to_str().unwrap()]);
    assert!(!out.status.success());
}

#[test]
fn test_validate_accepts_loaded_mesh() {
    let dir = tempdir().unwrap();
    let input = write_diamond(dir.path());
    let out = lepp(&["validate", &input]);
    assert!(out.status.success());
}
