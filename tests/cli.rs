use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn cosmetic_edit_exits_zero() {
    let dir = TempDir::new().unwrap();
    let before = write(&dir, "a.py", "def f(x):\n    return x + 1\n");
    let after = write(
        &dir,
        "b.py",
        "def f(x):\n    \"\"\"Add one.\"\"\"\n    return (x+1)  # inc\n",
    );

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("diff").arg(&before).arg(&after);
    cmd.assert()
        .code(0)
        .stderr(predicate::str::contains("behavior has been changed").not());
}

#[test]
fn behavioral_edit_exits_with_record_count() {
    let dir = TempDir::new().unwrap();
    let before = write(&dir, "a.py", "def f(x):\n    return x+1\n");
    let after = write(&dir, "b.py", "def f(x):\n    return x+2\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("diff").arg(&before).arg(&after);
    cmd.assert().code(2).stderr(
        predicate::str::contains("-return x + 1\n+return x + 2\n")
            .and(predicate::str::contains("behavior has been changed")),
    );
}

#[test]
fn json_output() {
    let dir = TempDir::new().unwrap();
    let before = write(&dir, "a.py", "x = 1\n");
    let after = write(&dir, "b.py", "x = 2\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("diff")
        .arg(&before)
        .arg(&after)
        .arg("--format")
        .arg("json");
    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains(r#""op": "remove""#))
        .stdout(predicate::str::contains(r#""text": "x = 2""#));
}

#[test]
fn max_exit_code_from_config_file() {
    let dir = TempDir::new().unwrap();
    let before = write(&dir, "a.py", "a = 1\nb = 2\n");
    let after = write(&dir, "b.py", "a = 3\nb = 4\n");
    let config = write(&dir, "bdiff.toml", "[output]\nmax_exit_code = 1\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("--config")
        .arg(&config)
        .arg("diff")
        .arg(&before)
        .arg(&after);
    cmd.assert().code(1);
}

#[test]
fn lex_error_exits_255() {
    let dir = TempDir::new().unwrap();
    let before = write(&dir, "a.py", "s = 'open\n");
    let after = write(&dir, "b.py", "s = 'open'\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("diff").arg(&before).arg(&after);
    cmd.assert()
        .code(255)
        .stderr(predicate::str::contains("unterminated string literal"));
}

#[test]
fn unknown_language_exits_255() {
    let dir = TempDir::new().unwrap();
    let before = write(&dir, "a.py", "x = 1\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("diff")
        .arg(&before)
        .arg(&before)
        .arg("--language")
        .arg("cobol");
    cmd.assert()
        .code(255)
        .stderr(predicate::str::contains("unknown language 'cobol'"));
}

#[test]
fn extensionless_files_fall_back_to_configured_language() {
    let dir = TempDir::new().unwrap();
    let before = write(&dir, "before", "x = 1\n");
    let after = write(&dir, "after", "x = (1)\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("diff").arg(&before).arg(&after);
    cmd.assert().code(0);
}

#[test]
fn canonical_command() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "m.py", "'''docs'''\nclass A():\n  x=( 1 )\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("canonical").arg(&path);
    cmd.assert().success().stdout("class A:\n    x = 1\n");
}

#[test]
fn strip_command() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "m.py", "x = 1  # note\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("strip").arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("x = 1").and(predicate::str::contains("note").not()));
}

#[test]
fn tokens_command() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "m.py", "x = 1\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("tokens").arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"x\"").and(predicate::str::contains("\"=\"")));
}

#[test]
fn list_languages() {
    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("list-languages");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("python").and(predicate::str::contains(".pyi")));
}

#[test]
fn zero_max_exit_code_still_fails_on_change() {
    let dir = TempDir::new().unwrap();
    let before = write(&dir, "a.py", "a = 1\n");
    let after = write(&dir, "b.py", "a = 2\n");
    let config = write(&dir, "bdiff.toml", "[output]\nmax_exit_code = 0\n");

    let mut cmd = cargo_bin_cmd!("bdiff");
    cmd.arg("--config")
        .arg(&config)
        .arg("diff")
        .arg(&before)
        .arg(&after);
    cmd.assert().code(1);
}
