use std::path::PathBuf;

use packline_lib::config::{OutputDescriptor, OutputFormat, PipelineConfig};
use packline_lib::driver::{BuildOptions, OutputArtifact};
use serde_json::Value;
use tempfile::TempDir;

/// A project directory laid out file by file.
pub struct Project {
  pub temp: TempDir,
}

impl Project {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  pub fn write(&self, relative_path: &str, content: &str) -> &Self {
    let path = self.root().join(relative_path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
    self
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.root().join(relative_path)
  }

  pub fn read(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.path(relative_path)).unwrap()
  }

  /// A config with entry `src/index.js` and one cjs output at `dist/index.js`.
  pub fn config(&self, stages: &[(&str, Value)]) -> PipelineConfig {
    let mut config = PipelineConfig::new(self.root(), "src/index.js")
      .with_output(OutputDescriptor::new("dist/index.js", OutputFormat::Cjs));
    for (name, options) in stages {
      config = config.with_stage(name, options.clone());
    }
    config
  }
}

pub fn options() -> BuildOptions {
  BuildOptions::default()
}

pub fn dry_run() -> BuildOptions {
  BuildOptions {
    dry_run: true,
    ..Default::default()
  }
}

pub fn text(artifact: &OutputArtifact) -> String {
  String::from_utf8(artifact.content.clone()).unwrap()
}
