//! Hook command integration tests.

use predicates::prelude::*;
use serde_json::{Value, json};

use super::common::TestEnv;

const HOST_CONFIG: &str = r#"{"mode": "development", "module": {"rules": [{"test": "\\.svg$", "loader": "file-loader"}]}}"#;

fn host_env() -> TestEnv {
  let env = TestEnv::with_config("");
  env.write_file("webpack.json", HOST_CONFIG);
  env
}

#[test]
fn hook_appends_rule_in_place() {
  let env = host_env();

  env
    .packline_cmd()
    .args(["hook", "webpack.json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("raw-loader"));

  let config: Value = serde_json::from_str(&env.read("webpack.json")).unwrap();
  assert_eq!(config["mode"], "development");
  assert_eq!(
    config["module"]["rules"],
    json!([
      {"test": "\\.svg$", "loader": "file-loader"},
      {"test": "\\.css$", "loader": "raw-loader"}
    ])
  );
}

#[test]
fn hook_stdout_leaves_file_alone() {
  let env = host_env();

  let output = env
    .packline_cmd()
    .args(["hook", "webpack.json", "--stdout", "--test", "\\.txt$"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(printed["module"]["rules"][1], json!({"test": "\\.txt$", "loader": "raw-loader"}));
  assert_eq!(env.read("webpack.json"), HOST_CONFIG);
}

#[test]
fn hook_rejects_bad_pattern() {
  let env = host_env();

  env
    .packline_cmd()
    .args(["hook", "webpack.json", "--test", "("])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid asset rule"));
}
