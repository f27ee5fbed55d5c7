//! Stages and the pipeline they form.
//!
//! A stage is either a text stage, which rewrites raw module text as files
//! are read, or a graph stage, which may contribute any of:
//!
//! - a resolution hook, consulted in pipeline order while the graph is built
//!   (first answer wins);
//! - a graph transform, folded left to right after the graph is complete;
//! - a report hook, run read-only over every rendered artifact.
//!
//! The order of stages is a checked contract: text stages come first, and a
//! stage's required capabilities must be provided by an earlier stage.

mod registry;
pub mod stages;
mod types;

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::config::{ConfigError, PipelineConfig};
use crate::driver::OutputArtifact;
use crate::graph::{ImportTarget, ModuleGraph, ModuleId};

pub use registry::{StageFactory, StageRegistry};
pub use types::*;

/// A property of the module graph that one stage establishes and later
/// stages rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
  /// Bare and relative specifiers are resolved to files.
  Resolution,
  /// Script modules are in CommonJS form.
  CommonJs,
  /// Script modules are minified.
  Minified,
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Capability::Resolution => write!(f, "resolution"),
      Capability::CommonJs => write!(f, "commonjs"),
      Capability::Minified => write!(f, "minified"),
    }
  }
}

/// A stage that rewrites module text before imports are scanned.
pub trait TextStage: Send + Sync + fmt::Debug {
  fn name(&self) -> &str;

  /// Whether the stage touches the module at `path`.
  fn applies_to(&self, _path: &Path) -> bool {
    true
  }

  fn apply(&self, id: &ModuleId, source: &str) -> Result<String, StageError>;
}

/// A stage that works on the module graph.
///
/// Every hook has a no-op default.
pub trait GraphStage: Send + Sync + fmt::Debug {
  fn name(&self) -> &str;

  fn requires(&self) -> &[Capability] {
    &[]
  }

  fn provides(&self) -> &[Capability] {
    &[]
  }

  /// Map a specifier to a target, or `None` to let later stages try.
  fn resolve(&self, _request: &ResolveRequest<'_>, _ctx: &StageContext) -> Result<Option<ImportTarget>, StageError> {
    Ok(None)
  }

  /// Produce the next graph from the previous one.
  fn transform(&self, graph: ModuleGraph, _ctx: &StageContext) -> Result<ModuleGraph, StageError> {
    Ok(graph)
  }

  /// Observe a rendered artifact.
  fn report(&self, _artifact: &OutputArtifact, _ctx: &StageContext) -> Option<Diagnostic> {
    None
  }
}

#[derive(Debug)]
pub enum Stage {
  Text(Box<dyn TextStage>),
  Graph(Box<dyn GraphStage>),
}

impl Stage {
  pub fn name(&self) -> &str {
    match self {
      Stage::Text(stage) => stage.name(),
      Stage::Graph(stage) => stage.name(),
    }
  }
}

/// The ordered stage list plus the declared externals.
#[derive(Debug)]
pub struct Pipeline {
  stages: Vec<Stage>,
  externals: Vec<String>,
}

impl Pipeline {
  /// Assemble a pipeline, checking stage order.
  ///
  /// # Errors
  ///
  /// Returns `ConfigError::StageOrder` when a text stage follows a graph
  /// stage, or when a stage requires a capability no earlier stage provides.
  pub fn new(stages: Vec<Stage>, externals: Vec<String>) -> Result<Self, ConfigError> {
    let mut seen_graph: Option<&str> = None;
    let mut provided = Vec::new();

    for stage in &stages {
      match stage {
        Stage::Text(text) => {
          if let Some(graph_stage) = seen_graph {
            return Err(ConfigError::StageOrder {
              stage: text.name().to_string(),
              reason: format!(
                "text stage must run before every graph stage, but follows '{}'",
                graph_stage
              ),
            });
          }
        }
        Stage::Graph(graph) => {
          seen_graph.get_or_insert(graph.name());
          if let Some(missing) = graph.requires().iter().find(|c| !provided.contains(*c)) {
            return Err(ConfigError::StageOrder {
              stage: graph.name().to_string(),
              reason: format!("requires {}, which no earlier stage provides", missing),
            });
          }
          provided.extend_from_slice(graph.provides());
        }
      }
    }

    Ok(Self { stages, externals })
  }

  /// Build the pipeline a config describes.
  ///
  /// Stage options are parsed here, so an invalid option fails before any
  /// file is read.
  pub fn from_config(config: &PipelineConfig, registry: &StageRegistry) -> Result<Self, crate::driver::BuildError> {
    let mut stages = Vec::with_capacity(config.stages.len());
    for spec in &config.stages {
      stages.push(registry.create(spec)?);
    }
    let pipeline = Self::new(stages, config.externals.clone())?;
    debug!(stages = ?pipeline.names(), "constructed pipeline");
    Ok(pipeline)
  }

  pub fn names(&self) -> Vec<&str> {
    self.stages.iter().map(Stage::name).collect()
  }

  pub fn stages(&self) -> &[Stage] {
    &self.stages
  }

  pub fn externals(&self) -> &[String] {
    &self.externals
  }

  pub fn graph_stages(&self) -> impl Iterator<Item = &dyn GraphStage> {
    self.stages.iter().filter_map(|stage| match stage {
      Stage::Graph(graph) => Some(graph.as_ref()),
      Stage::Text(_) => None,
    })
  }

  pub fn text_stages(&self) -> impl Iterator<Item = &dyn TextStage> {
    self.stages.iter().filter_map(|stage| match stage {
      Stage::Text(text) => Some(text.as_ref()),
      Stage::Graph(_) => None,
    })
  }

  /// The external a specifier refers to, matching either the declared name
  /// exactly or a subpath of it (`react-dom/client` for `react-dom`).
  pub fn external_for(&self, specifier: &str) -> Option<ImportTarget> {
    self
      .externals
      .iter()
      .any(|name| {
        specifier == name
          || specifier
            .strip_prefix(name.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
      })
      .then(|| ImportTarget::External(specifier.to_string()))
  }

  /// Run every text stage that applies to the module over its source.
  pub fn apply_text(&self, id: &ModuleId, source: &str) -> Result<String, StageError> {
    let mut text = source.to_string();
    for stage in self.text_stages() {
      if stage.applies_to(id.path()) {
        text = stage.apply(id, &text)?;
      }
    }
    Ok(text)
  }

  /// Ask each graph stage in turn to resolve a specifier.
  pub fn resolve(&self, request: &ResolveRequest<'_>, ctx: &StageContext) -> Result<Option<ImportTarget>, StageError> {
    for stage in self.graph_stages() {
      if let Some(target) = stage.resolve(request, ctx)? {
        debug!(stage = stage.name(), specifier = request.specifier, "resolved import");
        return Ok(Some(target));
      }
    }
    Ok(None)
  }
}
