use packline_lib::config::{ConfigError, OutputDescriptor, OutputFormat};
use packline_lib::driver::{BuildError, ResolutionError, build, build_with_registry};
use packline_lib::graph::ModuleGraph;
use packline_lib::stage::{GraphStage, Stage, StageContext, StageError, StageErrorKind, StageRegistry};
use serde_json::{Value, json};

use super::common::{Project, options};

#[derive(Debug)]
struct Explode;

impl GraphStage for Explode {
  fn name(&self) -> &str {
    "explode"
  }

  fn transform(&self, _graph: ModuleGraph, _ctx: &StageContext) -> Result<ModuleGraph, StageError> {
    Err(StageError::unsupported("explode", "boom"))
  }
}

fn create_explode(_options: &Value) -> Result<Stage, StageError> {
  Ok(Stage::Graph(Box::new(Explode)))
}

fn simple_project() -> Project {
  let project = Project::new();
  project
    .write("src/index.js", "module.exports = require('./a');\n")
    .write("src/a.js", "module.exports = 1;\n");
  project
}

#[tokio::test]
async fn failing_middle_stage_writes_nothing() {
  let project = simple_project();
  let mut registry = StageRegistry::builtin();
  registry.register("explode", create_explode);

  let config = project
    .config(&[
      ("replace", json!({"values": {"__DEV__": "false"}})),
      ("resolve", Value::Null),
      ("explode", Value::Null),
      ("commonjs", Value::Null),
      ("sizes", Value::Null),
    ])
    .with_output(OutputDescriptor::new("dist/index.min.js", OutputFormat::Cjs).with_sourcemap());

  let err = build_with_registry(&config, &registry, &options()).await.unwrap_err();
  match err {
    BuildError::Stage(e) => {
      assert_eq!(e.stage, "explode");
      assert!(e.to_string().contains("boom"));
    }
    other => panic!("expected a stage error, got {:?}", other),
  }
  assert!(!project.path("dist").exists());
}

#[tokio::test]
async fn stage_order_is_checked_before_building() {
  let project = simple_project();
  let config = project.config(&[
    ("resolve", Value::Null),
    ("minify", Value::Null),
    ("commonjs", Value::Null),
  ]);

  let err = build(&config, &options()).await.unwrap_err();
  assert!(matches!(
    err,
    BuildError::Config(ConfigError::StageOrder { ref stage, .. }) if stage == "minify"
  ));

  let config = project.config(&[("resolve", Value::Null), ("replace", json!({"values": {"A": "B"}}))]);
  let err = build(&config, &options()).await.unwrap_err();
  assert!(matches!(
    err,
    BuildError::Config(ConfigError::StageOrder { ref stage, .. }) if stage == "replace"
  ));
  assert!(!project.path("dist").exists());
}

#[tokio::test]
async fn invalid_options_fail_before_any_read() {
  let project = Project::new();
  // No entry file exists, so reaching the loader would be a resolution error.
  let config = project.config(&[("resolve", Value::Null), ("string", json!({"include": "("}))]);

  let err = build(&config, &options()).await.unwrap_err();
  match err {
    BuildError::Stage(e) => {
      assert_eq!(e.stage, "string");
      assert!(matches!(e.kind, StageErrorKind::InvalidOption { ref key, .. } if key == "include"));
    }
    other => panic!("expected an option error, got {:?}", other),
  }
}

#[tokio::test]
async fn unknown_stage_is_a_config_error() {
  let project = simple_project();
  let err = build(&project.config(&[("uglify", Value::Null)]), &options()).await.unwrap_err();
  assert!(matches!(err, BuildError::Config(ConfigError::UnknownStage { ref name, .. }) if name == "uglify"));
}

#[tokio::test]
async fn missing_entry_is_a_resolution_error() {
  let project = Project::new();
  let err = build(&project.config(&[("resolve", Value::Null)]), &options()).await.unwrap_err();
  assert!(matches!(err, BuildError::Resolution(ResolutionError::MissingEntry(_))));
}

#[tokio::test]
async fn unresolved_import_names_its_importer() {
  let project = Project::new();
  project.write("src/index.js", "require('./missing');\n");

  let err = build(&project.config(&[("resolve", Value::Null)]), &options()).await.unwrap_err();
  match err {
    BuildError::Resolution(ResolutionError::Unresolved { specifier, importer }) => {
      assert_eq!(specifier, "./missing");
      assert_eq!(importer.path(), project.path("src/index.js"));
    }
    other => panic!("expected an unresolved import, got {:?}", other),
  }
}

#[tokio::test]
async fn alias_skips_other_extensions() {
  let project = Project::new();
  project
    .write("src/index.js", "module.exports = require('~site.ts');\n")
    .write("styles/site.ts", "export const a = 1;\n");
  let config = project.config(&[
    (
      "alias",
      json!({"entries": [{"find": "^~(.*)$", "replacement": "styles/$1", "extensions": [".css"]}]}),
    ),
    ("resolve", Value::Null),
  ]);

  let err = build(&config, &options()).await.unwrap_err();
  assert!(matches!(
    err,
    BuildError::Resolution(ResolutionError::Unresolved { ref specifier, .. }) if specifier == "~site.ts"
  ));
}

#[tokio::test]
async fn minify_rejects_unconverted_modules() {
  let project = Project::new();
  project.write("src/index.ts", "export const a: number = 1;\n");
  let mut config = project.config(&[
    ("resolve", Value::Null),
    ("commonjs", Value::Null),
    ("minify", Value::Null),
  ]);
  config.entry = "src/index.ts".to_string();

  let err = build(&config, &options()).await.unwrap_err();
  match err {
    BuildError::Stage(e) => {
      assert_eq!(e.stage, "minify");
      assert!(matches!(e.kind, StageErrorKind::Unsupported(_)));
      assert_eq!(e.module.unwrap().path(), project.path("src/index.ts"));
    }
    other => panic!("expected a minify error, got {:?}", other),
  }
}

#[tokio::test]
async fn esm_left_for_render_is_reported() {
  let project = Project::new();
  project.write("src/index.js", "export default 1;\n");

  let err = build(&project.config(&[("resolve", Value::Null)]), &options()).await.unwrap_err();
  match err {
    BuildError::Stage(e) => assert_eq!(e.stage, "render"),
    other => panic!("expected a render error, got {:?}", other),
  }
  assert!(!project.path("dist").exists());
}

#[tokio::test]
async fn iife_name_must_be_an_identifier() {
  let project = simple_project();
  let mut config = project.config(&[("resolve", Value::Null)]);
  config.outputs = vec![OutputDescriptor::new("dist/widget.js", OutputFormat::Iife).with_name("my-widget")];

  let err = build(&config, &options()).await.unwrap_err();
  assert!(matches!(err, BuildError::Config(ConfigError::InvalidName { ref name, .. }) if name == "my-widget"));
  assert!(!project.path("dist").exists());
}

#[tokio::test]
async fn malformed_script_names_the_module() {
  let project = Project::new();
  project
    .write("src/index.js", "module.exports = require('./a');\n")
    .write("src/a.js", "const = 1;\n");

  let err = build(&project.config(&[("resolve", Value::Null)]), &options()).await.unwrap_err();
  match err {
    BuildError::Stage(e) => {
      assert_eq!(e.stage, "parse");
      assert!(matches!(e.kind, StageErrorKind::InvalidSyntax(_)));
      assert_eq!(e.module.unwrap().path(), project.path("src/a.js"));
    }
    other => panic!("expected a parse error, got {:?}", other),
  }
}
