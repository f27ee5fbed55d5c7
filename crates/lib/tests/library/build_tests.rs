use packline_lib::config::{OutputDescriptor, OutputFormat, PipelineConfig};
use packline_lib::driver::build;
use serde_json::{Value, json};

use super::common::{Project, dry_run, options, text};

fn lodash_project() -> Project {
  let project = Project::new();
  project
    .write("src/index.js", "const _ = require('lodash');\nmodule.exports = _.chunk;\n")
    .write("node_modules/lodash/package.json", r#"{"name": "lodash", "main": "lodash.js"}"#)
    .write("node_modules/lodash/lodash.js", "module.exports = { chunk: 1 };\n");
  project
}

#[tokio::test]
async fn bundles_packages_without_externals() {
  let project = lodash_project();
  let config = project.config(&[("resolve", Value::Null)]);

  let result = build(&config, &options()).await.unwrap();
  let output = project.read("dist/index.js");
  assert!(output.contains("\"node_modules/lodash/lodash.js\": [function (module, exports, require) {"));
  assert!(!output.contains("return require(\"lodash\")"));
  assert!(result.externals.is_empty());
  assert_eq!(result.modules, 2);
}

#[tokio::test]
async fn externals_stay_out_of_the_bundle() {
  let project = lodash_project();
  let config = project.config(&[("resolve", Value::Null)]).with_external("lodash");

  let result = build(&config, &options()).await.unwrap();
  let output = project.read("dist/index.js");
  assert!(output.contains("  \"lodash\": function () { return require(\"lodash\"); },"));
  assert!(!output.contains("node_modules"));
  assert_eq!(result.externals, vec!["lodash"]);
  assert_eq!(result.modules, 1);
}

#[tokio::test]
async fn full_pipeline_output() {
  let project = Project::new();
  project
    .write(
      "src/index.js",
      "import styles from './site.css';\nimport data from './data.json';\nimport { greet } from './greet';\n\
       if (process.env.NODE_ENV !== \"production\") {\n  // debug only\n  console.log(greet(data.name));\n}\n\
       export default styles;\n",
    )
    .write("src/site.css", "body{color:red}")
    .write("src/data.json", "{ \"name\": \"packline\" }\n")
    .write("src/greet.js", "export function greet(name) {\n  return `hi ${name}`;\n}\n");

  let config = project.config(&[
    ("replace", json!({"values": {"process.env.NODE_ENV": "\"production\""}})),
    ("resolve", Value::Null),
    ("json", Value::Null),
    ("commonjs", Value::Null),
    ("string", Value::Null),
    ("minify", Value::Null),
    ("sizes", Value::Null),
  ]);

  let result = build(&config, &options()).await.unwrap();
  let output = project.read("dist/index.js");

  assert!(!output.contains("process.env.NODE_ENV"), "{}", output);
  assert!(output.contains("body{color:red}"), "{}", output);
  assert!(output.contains("packline"), "{}", output);
  assert!(output.contains("\"src/greet.js\": [function"));
  assert!(!output.contains("src/site.css"));
  assert!(!output.contains("debug only"));
  assert!(output.contains("function __importDefault(mod)"));
  assert!(output.contains("function __export(target, getters)"));

  assert_eq!(result.modules, 3);
  assert_eq!(result.diagnostics.len(), 1);
  assert_eq!(result.diagnostics[0].stage, "sizes");
  assert!(result.diagnostics[0].message.starts_with("dist/index.js: "));
  assert!(result.diagnostics[0].message.contains("(3 modules)"));
}

#[tokio::test]
async fn builds_are_deterministic() {
  let files = [
    ("src/index.js", "const b = require('./b');\nconst a = require('./a');\nmodule.exports = [a, b];\n"),
    ("src/a.js", "module.exports = 'a';\n"),
    ("src/b.js", "module.exports = require('./a') + 'b';\n"),
  ];
  let first = Project::new();
  let second = Project::new();
  for (path, content) in files {
    first.write(path, content);
    second.write(path, content);
  }

  let stages = [("resolve", Value::Null)];
  let stages = &stages[..];
  let one = build(&first.config(stages), &dry_run()).await.unwrap();
  let again = build(&first.config(stages), &dry_run()).await.unwrap();
  let elsewhere = build(&second.config(stages), &dry_run()).await.unwrap();

  assert_eq!(one.artifacts[0].digest, again.artifacts[0].digest);
  assert_eq!(one.artifacts[0].digest, elsewhere.artifacts[0].digest);
  assert_eq!(text(&one.artifacts[0]), text(&elsewhere.artifacts[0]));
}

#[tokio::test]
async fn cycles_are_reported_not_fatal() {
  let project = Project::new();
  project
    .write("src/index.js", "module.exports = require('./a');\n")
    .write("src/a.js", "exports.b = require('./b');\n")
    .write("src/b.js", "exports.a = require('./a');\n");

  let result = build(&project.config(&[("resolve", Value::Null)]), &options()).await.unwrap();
  assert_eq!(result.cycles.len(), 1);
  assert_eq!(result.cycles[0].len(), 2);
  assert!(project.path("dist/index.js").exists());
}

#[tokio::test]
async fn iife_reads_externals_from_globals() {
  let project = Project::new();
  project.write(
    "src/index.js",
    "import React from 'react';\nexport const version = React.version;\n",
  );
  let config = PipelineConfig::new(project.root(), "src/index.js")
    .with_output(OutputDescriptor::new("dist/widget.js", OutputFormat::Iife).with_name("Widget"))
    .with_stage("resolve", Value::Null)
    .with_stage("commonjs", Value::Null)
    .with_external("react")
    .with_global("react", "React");

  build(&config, &options()).await.unwrap();
  let output = project.read("dist/widget.js");
  assert!(output.starts_with("var Widget = (function () {\n"));
  assert!(output.contains("  \"react\": function () { return React; },"));
  assert!(!output.contains("return require("));
  assert!(output.ends_with("return __require(\"src/index.js\");\n})();\n"));
}

#[tokio::test]
async fn writes_sourcemaps_next_to_artifacts() {
  let project = Project::new();
  project.write("src/index.js", "var a = 1;\nmodule.exports = a;\n");
  let config = PipelineConfig::new(project.root(), "src/index.js")
    .with_output(OutputDescriptor::new("dist/index.js", OutputFormat::Cjs).with_sourcemap())
    .with_stage("resolve", Value::Null);

  let result = build(&config, &options()).await.unwrap();
  assert!(project.read("dist/index.js").ends_with("//# sourceMappingURL=index.js.map\n"));

  let map: Value = serde_json::from_str(&project.read("dist/index.js.map")).unwrap();
  assert_eq!(map["version"], 3);
  assert_eq!(map["sources"], json!(["src/index.js"]));
  assert_eq!(map["sourcesContent"], json!(["var a = 1;\nmodule.exports = a;\n"]));
  assert_eq!(result.artifacts[0].file, project.path("dist/index.js"));
}

#[tokio::test]
async fn alias_rewrites_matching_extensions() {
  let project = Project::new();
  project
    .write("src/index.js", "import styles from '~site.css';\nexport default styles;\n")
    .write("styles/site.css", "body{color:red}");
  let config = project.config(&[
    (
      "alias",
      json!({"entries": [{"find": "^~(.*)[.]css$", "replacement": "styles/$1.css", "extensions": [".css"]}]}),
    ),
    ("resolve", Value::Null),
    ("commonjs", Value::Null),
    ("string", Value::Null),
  ]);

  let result = build(&config, &options()).await.unwrap();
  assert!(project.read("dist/index.js").contains("\"body{color:red}\""));
  assert_eq!(result.modules, 1);
}

#[tokio::test]
async fn config_file_drives_a_build() {
  let project = Project::new();
  project
    .write("app/src/index.js", "module.exports = __VERSION__;\n")
    .write(
      "packline.toml",
      r#"
entry = "src/index.js"
root = "app"

[[outputs]]
file = "dist/index.js"

[[stages]]
name = "replace"
options.values = { "__VERSION__" = '"1.0.0"' }

[[stages]]
name = "resolve"
"#,
    );

  let config = PipelineConfig::load(&project.path("packline.toml")).unwrap();
  build(&config, &options()).await.unwrap();
  assert!(
    std::fs::read_to_string(project.path("app/dist/index.js"))
      .unwrap()
      .contains("module.exports = \"1.0.0\";")
  );
}

#[tokio::test]
async fn imports_sharing_a_line_are_all_bundled() {
  let project = Project::new();
  project
    .write(
      "src/index.js",
      "import a from './a'; import { b } from './b';\nexport default a + b;\n",
    )
    .write("src/a.js", "module.exports = 'a';\n")
    .write("src/b.js", "exports.b = 'b';\n");
  let config = project.config(&[("resolve", Value::Null), ("commonjs", Value::Null)]);

  let result = build(&config, &options()).await.unwrap();
  let output = project.read("dist/index.js");
  assert_eq!(result.modules, 3);
  assert!(output.contains("\"src/a.js\": [function"), "{}", output);
  assert!(output.contains("\"src/b.js\": [function"), "{}", output);
  assert!(output.contains("const { b } = require(\"./b\");"), "{}", output);
}

#[tokio::test]
async fn regex_literal_with_backtick_keeps_later_requires() {
  let project = Project::new();
  project
    .write("src/index.js", "const tick = /`/g;\nmodule.exports = require('./a');\n")
    .write("src/a.js", "module.exports = 'a';\n");
  let config = project.config(&[("resolve", Value::Null)]);

  let result = build(&config, &options()).await.unwrap();
  assert_eq!(result.modules, 2);
  assert!(project.read("dist/index.js").contains("\"./a\": \"src/a.js\""));
}

#[tokio::test]
async fn json_keeps_key_order_and_big_numbers() {
  let project = Project::new();
  project
    .write("src/index.js", "module.exports = require('./data.json');\n")
    .write("src/data.json", "{\"zeta\": 1, \"alpha\": 123456789012345678901234567890}\n");
  let config = project.config(&[("resolve", Value::Null), ("json", Value::Null)]);

  build(&config, &options()).await.unwrap();
  assert!(
    project
      .read("dist/index.js")
      .contains("module.exports = {\"zeta\": 1, \"alpha\": 123456789012345678901234567890};")
  );
}

#[tokio::test]
async fn polyfills_bundle_builtins_into_iife_output() {
  let project = Project::new();
  project
    .write("src/index.js", "const path = require('node:path');\nmodule.exports = path.join('a', 'b');\n")
    .write("polyfills/path.js", "exports.join = function () { return [].join.call(arguments, '/'); };\n");
  let config = PipelineConfig::new(project.root(), "src/index.js")
    .with_output(OutputDescriptor::new("dist/widget.js", OutputFormat::Iife).with_name("Widget"))
    .with_stage("polyfills", Value::Null)
    .with_stage("resolve", Value::Null);

  let result = build(&config, &options()).await.unwrap();
  let output = project.read("dist/widget.js");
  assert_eq!(result.modules, 2);
  assert!(output.contains("\"node:path\": \"polyfills/path.js\""), "{}", output);
  assert!(!output.contains("return require("));
}
