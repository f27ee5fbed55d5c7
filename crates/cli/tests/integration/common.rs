//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated project directory.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  /// A project with the given `packline.toml`.
  pub fn with_config(config: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("packline.toml");
    std::fs::write(&config_path, config).unwrap();
    Self { temp, config_path }
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  pub fn read(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.path(relative_path)).unwrap()
  }

  /// A `packline` command running inside the project.
  pub fn packline_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("packline");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("PACKLINE_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}

/// A pipeline converting ES modules and inlining CSS, with React external.
pub const APP_CONFIG: &str = r#"
entry = "src/index.js"
externals = ["react"]

[globals]
react = "React"

[[outputs]]
file = "dist/app.js"
sourcemap = true

[[outputs]]
file = "dist/app.iife.js"
format = "iife"
name = "App"

[[stages]]
name = "replace"
options.values = { "__DEV__" = "false" }

[[stages]]
name = "resolve"

[[stages]]
name = "commonjs"

[[stages]]
name = "string"

[[stages]]
name = "sizes"
"#;

/// A project using [`APP_CONFIG`].
pub fn app_project() -> TestEnv {
  let env = TestEnv::with_config(APP_CONFIG);
  env.write_file(
    "src/index.js",
    "import React from 'react';\nimport css from './app.css';\nimport { title } from './title';\n\
     export default function App() {\n  if (__DEV__) console.log(css);\n  return React.createElement('h1', null, title);\n}\n",
  );
  env.write_file("src/title.js", "export const title = 'hello';\n");
  env.write_file("src/app.css", "h1{color:red}");
  env
}
