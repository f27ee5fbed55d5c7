//! The build driver.
//!
//! [`build`] runs one build end to end:
//!
//! 1. Validate the config and construct the pipeline (stage options are
//!    parsed and the stage order checked before any file is read)
//! 2. Resolve the entry and load the module graph in waves
//! 3. Fold every graph stage's transform in pipeline order
//! 4. Render one artifact per output
//! 5. Run every stage's report hook over every artifact
//! 6. Commit all artifacts at once, unless this is a dry run
//!
//! Any failure aborts the build with a single [`BuildError`] and nothing is
//! written.

mod emit;
mod load;
mod render;
mod sourcemap;
mod types;

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::graph::ModuleGraph;
use crate::stage::{Diagnostic, Pipeline, StageContext, StageRegistry};

pub use emit::commit;
pub use load::{load_graph, resolve_entry, resolve_import};
pub use render::render;
pub use sourcemap::{SourceMapBuilder, encode_vlq};
pub use types::*;

/// Run a build with the built-in stages.
pub async fn build(config: &PipelineConfig, options: &BuildOptions) -> Result<BuildResult, BuildError> {
  build_with_registry(config, &StageRegistry::builtin(), options).await
}

/// Run a build, constructing stages from `registry`.
pub async fn build_with_registry(
  config: &PipelineConfig,
  registry: &StageRegistry,
  options: &BuildOptions,
) -> Result<BuildResult, BuildError> {
  info!(root = %config.root.display(), entry = %config.entry, dry_run = options.dry_run, "starting build");
  config.validate()?;
  let pipeline = Pipeline::from_config(config, registry)?;
  let ctx = StageContext::new(config);

  let graph = load_graph(config, &pipeline, &ctx, options).await?;
  let graph = apply_stages(graph, &pipeline, &ctx, options)?;
  options.cancel.check()?;

  let mut artifacts = Vec::with_capacity(config.outputs.len());
  for output in &config.outputs {
    artifacts.push(render(&graph, output, config)?);
  }

  let diagnostics = collect_reports(&pipeline, &artifacts, &ctx);
  for diagnostic in &diagnostics {
    debug!(stage = %diagnostic.stage, message = %diagnostic.message, "diagnostic");
  }

  options.cancel.check()?;
  let written = if options.dry_run {
    info!(artifacts = artifacts.len(), "dry run, nothing written");
    false
  } else {
    commit(&artifacts)?;
    true
  };

  let mut externals: Vec<String> = graph.externals().into_iter().chain(graph.builtins()).collect();
  externals.sort();
  externals.dedup();

  let result = BuildResult {
    modules: graph.len(),
    cycles: graph.cycles(),
    externals,
    artifacts,
    diagnostics,
    written,
  };
  info!(
    artifacts = result.artifacts.len(),
    modules = result.modules,
    cycles = result.cycles.len(),
    "build complete"
  );
  Ok(result)
}

/// Load the graph a config describes and run every transform over it,
/// without rendering anything.
pub async fn resolve_graph(config: &PipelineConfig, options: &BuildOptions) -> Result<ModuleGraph, BuildError> {
  config.validate()?;
  let pipeline = Pipeline::from_config(config, &StageRegistry::builtin())?;
  let ctx = StageContext::new(config);
  let graph = load_graph(config, &pipeline, &ctx, options).await?;
  apply_stages(graph, &pipeline, &ctx, options)
}

/// Fold the graph stages' transforms in pipeline order.
pub fn apply_stages(
  mut graph: ModuleGraph,
  pipeline: &Pipeline,
  ctx: &StageContext,
  options: &BuildOptions,
) -> Result<ModuleGraph, BuildError> {
  for stage in pipeline.graph_stages() {
    options.cancel.check()?;
    debug!(stage = stage.name(), modules = graph.len(), "running stage");
    graph = stage.transform(graph, ctx)?;
    graph.relink();
  }
  Ok(graph)
}

fn collect_reports(pipeline: &Pipeline, artifacts: &[types::OutputArtifact], ctx: &StageContext) -> Vec<Diagnostic> {
  pipeline
    .graph_stages()
    .flat_map(|stage| artifacts.iter().filter_map(move |artifact| stage.report(artifact, ctx)))
    .collect()
}
