#![allow(deprecated)] // assert_cmd::Command::cargo_bin is deprecated but replacement requires nightly

use predicates::prelude::*;
use std::fs;

fn arid_cmd() -> assert_cmd::Command {
	assert_cmd::Command::cargo_bin("arid").unwrap()
}

// ============================================================================
// CLI flag tests
// ============================================================================

#[test]
fn test_help_flag() {
	arid_cmd()
		.arg("--help")
		.assert()
		.success()
		.stdout(predicate::str::contains("configuration and templating language"));
}

#[test]
fn test_version_flag() {
	arid_cmd()
		.arg("--version")
		.assert()
		.success()
		.stdout(predicate::str::contains("arid"));
}

#[test]
fn test_no_args_shows_help() {
	arid_cmd()
		.assert()
		.failure()
		.stderr(predicate::str::contains("Usage"));
}

// ============================================================================
// get tests
// ============================================================================

const SAMPLE: &str = "\
name = demo
server
  port = 8080
  host = $(name).local
tags += a
tags += b c
";

#[test]
fn test_get_text_value() {
	let temp_dir = tempfile::tempdir().unwrap();
	let file = temp_dir.path().join("app.arid");
	fs::write(&file, SAMPLE).unwrap();

	arid_cmd()
		.arg("get")
		.arg(&file)
		.args(["server", "host"])
		.assert()
		.success()
		.stdout("demo.local\n");
}

#[test]
fn test_get_scope_as_source() {
	let temp_dir = tempfile::tempdir().unwrap();
	let file = temp_dir.path().join("app.arid");
	fs::write(&file, SAMPLE).unwrap();

	arid_cmd()
		.arg("get")
		.arg(&file)
		.arg("server")
		.assert()
		.success()
		.stdout("port = 8080\nhost = demo.local\n");
}

#[test]
fn test_get_json() {
	let temp_dir = tempfile::tempdir().unwrap();
	let file = temp_dir.path().join("app.arid");
	fs::write(&file, SAMPLE).unwrap();

	let output = arid_cmd()
		.arg("get")
		.arg(&file)
		.args(["--format", "json"])
		.output()
		.unwrap();
	assert!(output.status.success());
	let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
	assert_eq!(parsed["server"]["port"], 8080);
	assert_eq!(parsed["tags"], serde_json::json!(["a", "b c"]));
}

#[test]
fn test_get_shell() {
	let temp_dir = tempfile::tempdir().unwrap();
	let file = temp_dir.path().join("app.arid");
	fs::write(&file, SAMPLE).unwrap();

	arid_cmd()
		.arg("get")
		.arg(&file)
		.arg("tags")
		.args(["--format", "shell"])
		.assert()
		.success()
		.stdout("0=a\n1='b c'\n");
}

#[test]
fn test_get_missing_path_fails() {
	let temp_dir = tempfile::tempdir().unwrap();
	let file = temp_dir.path().join("app.arid");
	fs::write(&file, SAMPLE).unwrap();

	arid_cmd()
		.arg("get")
		.arg(&file)
		.args(["server", "nope"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("Failed to resolve: server nope"));
}

#[test]
fn test_get_missing_file_fails() {
	let temp_dir = tempfile::tempdir().unwrap();

	arid_cmd()
		.arg("get")
		.arg(temp_dir.path().join("absent.arid"))
		.assert()
		.failure()
		.stderr(predicate::str::contains("Failed to load"));
}

// ============================================================================
// template tests
// ============================================================================

#[test]
fn test_template_uses_config() {
	let temp_dir = tempfile::tempdir().unwrap();
	let config = temp_dir.path().join("app.arid");
	let template = temp_dir.path().join("app.conf.in");
	fs::write(&config, SAMPLE).unwrap();
	fs::write(&template, "listen $(server port)\nserver_name $(server host);\n").unwrap();

	arid_cmd()
		.arg("template")
		.arg(&template)
		.arg("--config")
		.arg(&config)
		.assert()
		.success()
		.stdout("listen 8080\nserver_name demo.local;\n");
}

#[test]
fn test_template_unresolved_reference_fails() {
	let temp_dir = tempfile::tempdir().unwrap();
	let template = temp_dir.path().join("t.in");
	fs::write(&template, "$(missing)").unwrap();

	arid_cmd()
		.arg("template")
		.arg(&template)
		.assert()
		.failure()
		.stderr(predicate::str::contains("missing"));
}

// ============================================================================
// check tests
// ============================================================================

#[test]
fn test_check_valid_file() {
	let temp_dir = tempfile::tempdir().unwrap();
	let file = temp_dir.path().join("app.arid");
	fs::write(&file, SAMPLE).unwrap();

	arid_cmd()
		.arg("check")
		.arg(&file)
		.assert()
		.success()
		.stdout(predicate::str::contains("ok:"));
}

#[test]
fn test_check_reports_cycle() {
	let temp_dir = tempfile::tempdir().unwrap();
	let good = temp_dir.path().join("good.arid");
	let bad = temp_dir.path().join("bad.arid");
	fs::write(&good, "x = 1\n").unwrap();
	fs::write(&bad, "a = $(b)\nb = $(a)\n").unwrap();

	arid_cmd()
		.arg("check")
		.arg(&good)
		.arg(&bad)
		.assert()
		.failure()
		.stdout(predicate::str::contains("ok:"))
		.stderr(predicate::str::contains("Cycle detected"));
}

#[test]
fn test_check_reports_bad_indent() {
	let temp_dir = tempfile::tempdir().unwrap();
	let file = temp_dir.path().join("bad.arid");
	fs::write(&file, "  x = 1\n").unwrap();

	arid_cmd()
		.arg("check")
		.arg(&file)
		.assert()
		.failure()
		.stderr(predicate::str::contains("No such indent"));
}

// ============================================================================
// repl tests
// ============================================================================

#[test]
fn test_repl_writes_to_stdout() {
	arid_cmd()
		.arg("repl")
		.write_stdin("greeting = hello\n!write $(greeting) world$(LF)\n")
		.assert()
		.success()
		.stdout("hello world\n");
}

#[test]
fn test_repl_continues_after_recoverable_error() {
	arid_cmd()
		.arg("repl")
		.write_stdin("!write $(nope)\n!write still here\n")
		.assert()
		.success()
		.stdout("still here")
		.stderr(predicate::str::contains("nope"));
}

#[test]
fn test_repl_applies_line_after_bare_entry() {
	arid_cmd()
		.arg("repl")
		.write_stdin("a b\nc = 1\n!write $(c)\n")
		.assert()
		.success()
		.stdout("1")
		.stderr(predicate::str::contains("Unsupported entry: a b"));
}

#[test]
fn test_repl_dangling_statement_fails() {
	arid_cmd()
		.arg("repl")
		.write_stdin("x = $list(a\n")
		.assert()
		.failure()
		.stderr(predicate::str::contains("Input ended mid-statement"));
}
