//! Graph command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, app_project};

#[test]
fn graph_lists_modules_and_targets() {
  let env = app_project();

  env
    .packline_cmd()
    .arg("graph")
    .assert()
    .success()
    .stdout(predicate::str::contains("Entry: src/index.js"))
    .stdout(predicate::str::contains("  ./title -> src/title.js"))
    .stdout(predicate::str::contains("  react -> external:react"))
    .stdout(predicate::str::contains("app.css").not());

  assert!(!env.path("dist").exists());
}

#[test]
fn graph_json_reports_cycles() {
  let env = TestEnv::with_config(
    r#"
entry = "a.js"

[[outputs]]
file = "out.js"

[[stages]]
name = "resolve"
"#,
  );
  env.write_file("a.js", "require('./b');\n");
  env.write_file("b.js", "require('./a');\nrequire('fs');\n");

  let output = env
    .packline_cmd()
    .args(["graph", "--format", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["entry"], "a.js");
  assert_eq!(json["modules"].as_array().unwrap().len(), 2);
  assert_eq!(json["builtins"], serde_json::json!(["fs"]));
  assert_eq!(json["cycles"], serde_json::json!([["a.js", "b.js"]]));
}
