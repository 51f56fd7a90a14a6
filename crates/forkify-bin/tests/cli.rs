#![allow(deprecated)] // assert_cmd::Command::cargo_bin is deprecated but replacement requires nightly

use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn forkify_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("forkify").unwrap();
    cmd.env_remove("FORKIFY_RULES");
    cmd
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn write_rules(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("rules.toml");
    fs::write(
        &path,
        r#"
name = "scenario"

[walk]
ignore = ["__pycache__"]

[content]
extensions = [".py"]

[[rules]]
pattern = "product"
replacement = "room"

[[rules]]
pattern = "Product"
replacement = "Room"
"#,
    )
    .unwrap();
    path
}

// ============================================================================
// CLI flag tests
// ============================================================================

#[test]
fn test_help_flag() {
    forkify_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fork a codebase"));
}

#[test]
fn test_no_args_fails() {
    forkify_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_rules_prints_builtin_table() {
    forkify_cmd()
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("saleor-to-vanphong"))
        .stdout(predicate::str::contains("product -> room"));
}

#[test]
fn test_invalid_rule_table_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("bad.toml");
    fs::write(&rules, "[[rules]]\npattern = \"(\"\nreplacement = \"x\"\nmode = \"regex\"\n").unwrap();

    forkify_cmd()
        .args(["--rules", rules.to_str().unwrap(), "rules"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load rule table"));
}

// ============================================================================
// Operation tests
// ============================================================================

#[test]
fn test_copy_rename_then_rewrite_content() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tree");
    write(&root, "a/product.py", "class Product: pass");
    write(&root, "a/__pycache__/x.pyc", "binary");
    let rules = write_rules(dir.path());

    forkify_cmd()
        .args(["--rules", rules.to_str().unwrap(), "copy-rename"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Copy-rename complete!"));

    assert_eq!(
        fs::read_to_string(root.join("a/room.py")).unwrap(),
        "class Product: pass"
    );

    forkify_cmd()
        .args(["--rules", rules.to_str().unwrap(), "rewrite-content"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Content rewrite complete!"));

    assert_eq!(
        fs::read_to_string(root.join("a/room.py")).unwrap(),
        "class Room: pass"
    );
    assert_eq!(
        fs::read_to_string(root.join("a/__pycache__/x.pyc")).unwrap(),
        "binary"
    );
}

#[test]
fn test_failed_file_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "room", "a file where a directory is needed");
    write(dir.path(), "product/x.py", "x");
    write(dir.path(), "product.py", "y");

    forkify_cmd()
        .arg("copy-rename")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed: 1"));

    assert_eq!(fs::read_to_string(dir.path().join("room.py")).unwrap(), "y");
}

#[test]
fn test_copy_rename_to_output_then_revert_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("saleor");
    let output = dir.path().join("vanphong");
    write(&source, "product/models.py", "x");

    forkify_cmd()
        .arg("copy-rename")
        .arg(&source)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    assert!(output.join("room/models.py").exists());
    assert!(!source.join(".forkify").exists());

    forkify_cmd().arg("revert").arg(&output).assert().success();

    assert!(!output.join("room").exists());
}

#[test]
fn test_missing_root_fails() {
    let dir = tempfile::tempdir().unwrap();

    forkify_cmd()
        .arg("copy-rename")
        .arg(dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot traverse"));
}

#[test]
fn test_dry_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "product.py", "product = 1\n");

    forkify_cmd()
        .arg("rewrite-content")
        .arg(dir.path())
        .arg("--dry-run")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("product.py")).unwrap(),
        "product = 1\n"
    );
    assert!(!dir.path().join(".forkify").exists());
}

#[test]
fn test_rewrite_then_revert() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "models.py", "class Warehouse:\n    pass\n");

    forkify_cmd()
        .arg("rewrite-content")
        .arg(dir.path())
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("models.py")).unwrap(),
        "class Hotel:\n    pass\n"
    );

    forkify_cmd()
        .arg("revert")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Revert complete!"));

    assert_eq!(
        fs::read_to_string(dir.path().join("models.py")).unwrap(),
        "class Warehouse:\n    pass\n"
    );
    assert!(!dir.path().join(".forkify").exists());
}

#[test]
fn test_revert_without_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();

    forkify_cmd()
        .arg("revert")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to revert"));
}

#[test]
fn test_normalize_line_endings() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "notes.txt", "line1\nline2\n");
    write(dir.path(), "image.png", "line1\nline2\n");

    forkify_cmd()
        .args(["normalize-line-endings", "--style", "crlf"])
        .arg(dir.path())
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "line1\r\nline2\r\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("image.png")).unwrap(),
        "line1\nline2\n"
    );
}

#[test]
fn test_clear_cache_dirs() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/__pycache__/models.cpython-312.pyc", "binary");
    write(dir.path(), "app/models.py", "x = 1\n");

    forkify_cmd()
        .arg("clear-cache-dirs")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleanup complete!"));

    assert!(!dir.path().join("app/__pycache__").exists());
    assert!(dir.path().join("app/models.py").exists());
}
