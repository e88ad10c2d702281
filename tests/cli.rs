use std::fs;

use predicates::prelude::*;

fn compiler() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("v_compiler").expect("binary not built")
}

#[test]
fn no_arguments_prints_usage_and_exits_zero() {
    compiler()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn help_arguments_print_usage() {
    for arg in ["help", "HELP", "?", "-?", "/?", "--help", "/help"] {
        compiler()
            .arg(arg)
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"));
    }
}

#[test]
fn missing_source_file_is_reported_and_exits_zero() {
    compiler()
        .arg("no-such-file.v")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Source file 'no-such-file.v' not found",
        ));
}

#[test]
fn valid_program_compiles_to_an_executable() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("hello.v");
    fs::write(
        &source,
        r#"program Hello; begin Console.WriteLine("hi"); end"#,
    )
    .unwrap();

    compiler()
        .arg(source.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled"));
    assert!(dir.path().join("Hello.exe").exists());
    assert!(dir.path().join("Hello.il").exists());
}

#[test]
fn compile_failure_still_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("bad.v");
    fs::write(&source, "program Bad; begin x = 1; end").unwrap();

    compiler()
        .arg(source.to_str().unwrap())
        .assert()
        .success()
        .stderr(predicate::str::contains("-- line"))
        .stderr(predicate::str::contains("Compilation aborted"));
    assert!(!dir.path().join("Bad.exe").exists());
}
