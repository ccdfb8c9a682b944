//! Checks the command line interface of the compiler binary.
//!
//! The syntax trees under `tests/data` are compiled into temporary
//! directories, so the checked in files are never touched.

use assert_cmd::Command;
use predicates::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

const ROOT_DIR: &str = env!("CARGO_MANIFEST_DIR");

fn data(name: &str) -> PathBuf {
    Path::new(ROOT_DIR).join("tests/data").join(name)
}

fn compiler() -> Command {
    let mut cmd = Command::cargo_bin("compiler-cli").unwrap();
    cmd.env("TERM", "dumb"); // disable color output
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Copies the fixture `name` into a fresh temporary directory.
fn staged(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join(name);
    fs::copy(data(name), &input).unwrap();
    (dir, input)
}

#[test]
fn writes_ir_to_stdout() {
    compiler()
        .arg("-o")
        .arg("-")
        .arg(data("dispatch.json"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("declare i8* @calloc(i32, i32)\n"))
        .stdout(predicate::str::contains("define i32 @main() {"))
        .stdout(predicate::str::contains("define i32 @B.m(i8* %this) {"))
        .stdout(predicate::str::contains(
            "@.B_vtable = global [1 x i8*] [\n\ti8* bitcast (i32 (i8*)* @B.m to i8*)\n]\n",
        ))
        .stderr("");
}

#[test]
fn output_defaults_to_input_path_with_ll_extension() {
    let (dir, input) = staged("dispatch.json");

    compiler().arg(&input).assert().success().stdout("");

    let ir = fs::read_to_string(dir.path().join("dispatch.ll")).unwrap();
    assert!(ir.contains("call void (i32) @print_int(i32 %_9)"));
}

#[test]
fn output_flag_selects_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("module.ll");

    compiler()
        .arg("--output")
        .arg(&output)
        .arg(data("dispatch.json"))
        .assert()
        .success();

    assert!(fs::read_to_string(&output)
        .unwrap()
        .contains("define i32 @A.m(i8* %this) {"));
}

#[test]
fn type_error_is_reported_with_line_and_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("never.ll");

    compiler()
        .arg("-o")
        .arg(&output)
        .arg(data("type_error.json"))
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains(
            "line 3: error: bad operand types for binary operator '+': int and boolean\n",
        ))
        .stderr(predicate::str::contains("Compilation aborted due to an error\n"))
        .stderr(predicate::str::contains(
            "error: compilation aborted after the method body pass due to 1 error(s)\n",
        ));

    assert!(!output.exists());
}

#[test]
fn all_errors_of_a_pass_are_reported() {
    compiler()
        .arg("--check")
        .arg(data("two_errors.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 3: error: "))
        .stderr(predicate::str::contains("line 4: error: "))
        .stderr(predicate::str::contains("Compilation aborted due to 2 errors\n"));
}

#[test]
fn fail_fast_stops_at_the_first_error() {
    compiler()
        .arg("--check")
        .arg("--fail-fast")
        .arg(data("two_errors.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 3: error: "))
        .stderr(predicate::str::contains("line 4: ").not());
}

#[test]
fn check_does_not_write_output() {
    let (dir, input) = staged("dispatch.json");

    compiler()
        .arg("--check")
        .arg(&input)
        .assert()
        .success()
        .stdout("")
        .stderr("");

    assert!(!dir.path().join("dispatch.ll").exists());
}

#[test]
fn class_layouts_are_printed_on_request() {
    compiler()
        .arg("--dump-class-layouts")
        .arg("-o")
        .arg("-")
        .arg(data("dispatch.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "class B: object size 12, allocation size 20\n  field B.y: int at this + 8\n  slot 0: B.m\n",
        ))
        .stderr(predicate::str::contains("class A: object size 8, allocation size 16\n"));
}

#[test]
fn malformed_input_is_rejected() {
    compiler()
        .arg(data("malformed.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not a valid syntax tree"))
        .stderr(predicate::str::contains("caused by: "));
}

#[test]
fn missing_input_is_reported() {
    compiler()
        .arg(data("missing.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("error: cannot open input file"));
}
