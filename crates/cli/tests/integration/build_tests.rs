//! Build command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, app_project};

#[test]
fn build_writes_every_output() {
  let env = app_project();

  env
    .packline_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Built 2 artifact(s) from 2 module(s)"))
    .stdout(predicate::str::contains("[sizes] dist/app.js:"));

  let cjs = env.read("dist/app.js");
  assert!(cjs.contains("\"h1{color:red}\""));
  assert!(cjs.contains("if (false) console.log(css);"));
  assert!(cjs.contains("return require(\"react\");"));
  assert!(env.path("dist/app.js.map").exists());

  let iife = env.read("dist/app.iife.js");
  assert!(iife.starts_with("var App = (function () {"));
  assert!(iife.contains("return React;"));
  assert!(!env.path("dist/app.iife.js.map").exists());
}

#[test]
fn dry_run_writes_nothing() {
  let env = app_project();

  env
    .packline_cmd()
    .args(["build", "--dry-run", "-j", "1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"));

  assert!(!env.path("dist").exists());
}

#[test]
fn json_output_describes_artifacts() {
  let env = app_project();

  let output = env
    .packline_cmd()
    .args(["build", "--format", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["written"], true);
  assert_eq!(json["modules"], 2);
  assert_eq!(json["externals"], serde_json::json!(["react"]));
  assert_eq!(json["artifacts"].as_array().unwrap().len(), 2);
  assert_eq!(json["artifacts"][0]["format"], "cjs");
  assert_eq!(json["artifacts"][0]["digest"].as_str().unwrap().len(), 64);
}

#[test]
fn repeated_builds_are_identical() {
  let env = app_project();

  env.packline_cmd().arg("build").assert().success();
  let first = env.read("dist/app.js");
  env.packline_cmd().arg("build").assert().success();
  assert_eq!(env.read("dist/app.js"), first);
}

#[test]
fn stage_failure_is_reported_and_nothing_written() {
  let env = TestEnv::with_config(
    r#"
entry = "src/index.js"

[[outputs]]
file = "dist/out.js"

[[stages]]
name = "resolve"

[[stages]]
name = "commonjs"
"#,
  );
  env.write_file("src/index.js", "export const [a, b] = [1, 2];\n");

  env
    .packline_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("stage 'commonjs' failed"));

  assert!(!env.path("dist").exists());
}

#[test]
fn check_rejects_bad_stage_order() {
  let env = TestEnv::with_config(
    r#"
entry = "src/index.js"

[[outputs]]
file = "dist/out.js"

[[stages]]
name = "resolve"

[[stages]]
name = "replace"
options.values = { "A" = "B" }
"#,
  );

  env
    .packline_cmd()
    .arg("check")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid pipeline"));
}

#[test]
fn check_accepts_valid_config() {
  let env = app_project();

  env
    .packline_cmd()
    .args(["check", "-c"])
    .arg(&env.config_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("replace -> resolve -> commonjs -> string -> sizes"));
}
