// End-to-end tests of the binary. Shell utilities stand in for the Ruby tool,
// so these only run on unix.
#![cfg(unix)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Write a config whose tool runs `lint` and `fix` as shell scripts.
fn write_config(dir: &Path, lint: &str, fix: &str, extra: &str) -> String {
    let path = dir.join(".hamlint.toml");
    let content = format!(
        r#"[ruby-tool]
command = ["sh", "-c"]
lint-args = [{lint:?}]
fix-args = [{fix:?}]
timeout = 10000
{extra}
"#
    );
    fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_offenses_are_reported_on_template_lines() {
    let temp_dir = tempdir().unwrap();
    let template = temp_dir.path().join("show.haml");
    fs::write(&template, "- x = 1\n").unwrap();
    let config = write_config(
        temp_dir.path(),
        "cat > /dev/null; echo '{path}:2:3: C: [Correctable] Style/Foo: Bad spacing.'",
        "cat",
        "",
    );

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check").arg("--config").arg(&config).arg(&template);

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("show.haml:1:3: [Style/Foo] Bad spacing. [*]"))
        .stdout(predicate::str::contains("Found 1 issue in 1 file"));
}

#[test]
fn test_clean_template_succeeds() {
    let temp_dir = tempdir().unwrap();
    let template = temp_dir.path().join("index.haml");
    fs::write(&template, "%p\n  = title\n").unwrap();
    let config = write_config(temp_dir.path(), "cat > /dev/null", "cat", "");

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check").arg("--config").arg(&config).arg(&template);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No issues found in 1 file"));
}

#[test]
fn test_fix_writes_corrections_back() {
    let temp_dir = tempdir().unwrap();
    let template = temp_dir.path().join("form.haml");
    fs::write(&template, "%div\n  %tag{foo:  bar}\n    text\n").unwrap();
    let config = write_config(
        temp_dir.path(),
        "cat > /dev/null",
        "sed 's/foo:  bar/foo: bar/'",
        "",
    );

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check").arg("--fix").arg("--config").arg(&config).arg(&template);

    cmd.assert().success().stdout(predicate::str::contains("Fixed"));
    assert_eq!(
        fs::read_to_string(&template).unwrap(),
        "%div\n  %tag{foo: bar}\n    text\n"
    );
}

#[test]
fn test_fix_skips_reordered_output() {
    let temp_dir = tempdir().unwrap();
    let template = temp_dir.path().join("list.haml");
    let content = "- a = 1\n%p text\n";
    fs::write(&template, content).unwrap();
    // Sorting the lines in reverse reorders the markers
    let config = write_config(temp_dir.path(), "cat > /dev/null", "sort -r", "");

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check").arg("--fix").arg("--config").arg(&config).arg(&template);

    cmd.assert().success();
    assert_eq!(fs::read_to_string(&template).unwrap(), content);
}

#[test]
fn test_json_output() {
    let temp_dir = tempdir().unwrap();
    let template = temp_dir.path().join("show.haml");
    fs::write(&template, "- x = 1\n").unwrap();
    let config = write_config(
        temp_dir.path(),
        "cat > /dev/null; echo 'a.haml:2:1: W: Lint/UselessAssignment: Useless assignment.'",
        "cat",
        "",
    );

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check")
        .arg("--config")
        .arg(&config)
        .arg("--output-format")
        .arg("json")
        .arg(&template);

    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let warnings = parsed.as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["line"], 1);
    assert_eq!(warnings[0]["rule"], "Lint/UselessAssignment");
    assert_eq!(warnings[0]["severity"], "warning");
}

#[test]
fn test_missing_tool_is_a_tool_error() {
    let temp_dir = tempdir().unwrap();
    let template = temp_dir.path().join("show.haml");
    fs::write(&template, "- x = 1\n").unwrap();
    let config_path = temp_dir.path().join(".hamlint.toml");
    fs::write(&config_path, "[ruby-tool]\ncommand = [\"nonexistent-tool-xyz123\"]\n").unwrap();

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check").arg("--config").arg(&config_path).arg(&template);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("not found in PATH"));
}

#[test]
fn test_on_error_skip_tolerates_missing_tool() {
    let temp_dir = tempdir().unwrap();
    let template = temp_dir.path().join("show.haml");
    fs::write(&template, "- x = 1\n").unwrap();
    let config_path = temp_dir.path().join(".hamlint.toml");
    fs::write(
        &config_path,
        "[ruby-tool]\ncommand = [\"nonexistent-tool-xyz123\"]\non-error = \"skip\"\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check").arg("--config").arg(&config_path).arg(&template);

    cmd.assert().success();
}

#[test]
fn test_unparsable_template_is_a_tool_error() {
    let temp_dir = tempdir().unwrap();
    let template = temp_dir.path().join("bad.haml");
    fs::write(&template, "%p\n\t= foo\n").unwrap();
    let config = write_config(temp_dir.path(), "cat > /dev/null", "cat", "");

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check").arg("--config").arg(&config).arg(&template);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse template"));
}

#[test]
fn test_directory_walk_honors_exclude() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("views")).unwrap();
    fs::create_dir_all(root.join("vendor")).unwrap();
    fs::write(root.join("views/a.haml"), "- x = 1\n").unwrap();
    fs::write(root.join("views/b.haml"), "- y = 2\n").unwrap();
    fs::write(root.join("vendor/c.haml"), "- z = 3\n").unwrap();
    let config = write_config(
        root,
        "cat > /dev/null; echo '{path}:2:1: C: Style/Foo: Bad.'",
        "cat",
        "[global]\nexclude = [\"vendor\"]",
    );

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("check").arg("--config").arg(&config).arg(root);

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("a.haml:1:1"))
        .stdout(predicate::str::contains("b.haml:1:1"))
        .stdout(predicate::str::contains("c.haml").not())
        .stdout(predicate::str::contains("Found 2 issues in 2 files"));
}

#[test]
fn test_init_creates_config_once() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join(".hamlint.toml");

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("init").arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Created default configuration file"));
    assert!(fs::read_to_string(&path).unwrap().contains("[ruby-tool]"));

    let mut cmd = cargo_bin_cmd!("hamlint");
    cmd.arg("init").arg(&path);
    cmd.assert().code(2).stderr(predicate::str::contains("already exists"));
}
