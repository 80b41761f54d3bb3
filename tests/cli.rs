//! CLI contract tests: argument handling, progress lines, exit codes and
//! the files left behind on success and failure.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[allow(deprecated)]
fn cli() -> Command {
    Command::cargo_bin("json2txt").unwrap()
}

fn sidecar(contents: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bold.json"), contents).unwrap();
    dir
}

fn arg(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

#[test]
fn test_no_arguments_prints_help() {
    cli()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("--in_json"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_missing_required_option() {
    let dir = sidecar(r#"{"RepetitionTime": 2.5}"#);
    let out = dir.path().join("tr.txt");

    cli()
        .args(["-i", &arg(&dir.path().join("bold.json"))])
        .args(["-o", &arg(&out)])
        .args(["--key", "RepetitionTime"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--format"));
    assert!(!out.exists());
}

#[test]
fn test_slice_timing_with_single_dash_key() {
    let dir = sidecar(r#"{"SliceTiming": [0.0, 0.05, 0.10], "RepetitionTime": 2.0}"#);
    let input = dir.path().join("bold.json");
    let out = dir.path().join("slicetiming.txt");

    cli()
        .args(["-i", &arg(&input), "-o", &arg(&out)])
        .args(["-key", "SliceTiming", "-f", "%.8f"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+>> Extract SliceTiming Info"))
        .stdout(predicate::str::contains(arg(&input)));

    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "0.00000000\n0.05000000\n0.10000000\n"
    );
}

#[test]
fn test_long_options_scalar() {
    let dir = sidecar(r#"{"RepetitionTime": 2.5}"#);
    let out = dir.path().join("tr.txt");

    cli()
        .args(["--in_json", &arg(&dir.path().join("bold.json"))])
        .args(["--out", &arg(&out)])
        .args(["--key", "RepetitionTime", "--format", "%.2f"])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&out).unwrap(), "2.50\n");
}

#[test]
fn test_missing_key_fails_without_output() {
    let dir = sidecar(r#"{"Foo": 1}"#);
    let out = dir.path().join("bar.txt");

    cli()
        .args(["-i", &arg(&dir.path().join("bold.json")), "-o", &arg(&out)])
        .args(["-key", "Bar", "-f", "%d"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("key 'Bar' not found"));
    assert!(!out.exists());
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("absent.json");

    cli()
        .args(["-i", &arg(&input), "-o", &arg(&dir.path().join("out.txt"))])
        .args(["-key", "SliceTiming", "-f", "%.8f"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.json"));
}

#[test]
fn test_malformed_json() {
    let dir = sidecar(r#"{"SliceTiming": [0.0, 0.05"#);

    cli()
        .args(["-i", &arg(&dir.path().join("bold.json"))])
        .args(["-o", &arg(&dir.path().join("out.txt"))])
        .args(["-key", "SliceTiming", "-f", "%.8f"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn test_format_mismatch_keeps_existing_output() {
    let dir = sidecar(r#"{"Manufacturer": "Siemens"}"#);
    let out = dir.path().join("out.txt");
    fs::write(&out, "previous\n").unwrap();

    cli()
        .args(["-i", &arg(&dir.path().join("bold.json")), "-o", &arg(&out)])
        .args(["-key", "Manufacturer", "-f", "%.2f"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("format error"));

    assert_eq!(fs::read_to_string(&out).unwrap(), "previous\n");
}

#[test]
fn test_unwritable_output_directory() {
    let dir = sidecar(r#"{"RepetitionTime": 2.5}"#);
    let out = dir.path().join("missing").join("tr.txt");

    cli()
        .args(["-i", &arg(&dir.path().join("bold.json")), "-o", &arg(&out)])
        .args(["-key", "RepetitionTime", "-f", "%.2f"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("tr.txt"));
}

#[test]
fn test_repeated_runs_are_identical() {
    let dir = sidecar(r#"{"SliceTiming": [0.0, 1.0, 0.5, 1.5]}"#);
    let input = arg(&dir.path().join("bold.json"));
    let out = dir.path().join("st.txt");

    for _ in 0..2 {
        cli()
            .args(["-i", &input, "-o", &arg(&out), "-key", "SliceTiming", "-f", "%.8f"])
            .assert()
            .success();
    }
    let first = fs::read(&out).unwrap();
    cli()
        .args(["-i", &input, "-o", &arg(&out), "-key", "SliceTiming", "-f", "%.8f"])
        .assert()
        .success();
    assert_eq!(fs::read(&out).unwrap(), first);
}

#[test]
fn test_matrix_tab_delimited() {
    let dir = sidecar(r#"{"Grad": [[1, 0], [0, 1]]}"#);
    let out = dir.path().join("grad.txt");

    cli()
        .args(["-i", &arg(&dir.path().join("bold.json")), "-o", &arg(&out)])
        .args(["--key", "Grad", "-f", "%d", "-d", "\\t"])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&out).unwrap(), "1\t0\n0\t1\n");
}
