//! Loading the module graph.
//!
//! The graph is built breadth-first in waves. All files of one wave are read
//! concurrently, bounded by a semaphore, but results are processed in
//! frontier order so the graph does not depend on read completion order.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::consts::PARSE_STAGE;
use crate::graph::{ImportTarget, Module, ModuleGraph, ModuleId};
use crate::stage::stages::resolve::{DEFAULT_EXTENSIONS, find_file};
use crate::stage::{Pipeline, ResolveRequest, StageContext, StageError};

use super::types::{BuildError, BuildOptions, ResolutionError};

/// Locate the entry module on disk.
pub fn resolve_entry(config: &PipelineConfig) -> Result<ModuleId, ResolutionError> {
  let path = config.entry_path();
  find_file(&path, DEFAULT_EXTENSIONS)
    .map(ModuleId::new)
    .ok_or(ResolutionError::MissingEntry(path))
}

/// Resolve one import: declared externals first, then each stage's
/// resolution hook in pipeline order.
pub fn resolve_import(
  pipeline: &Pipeline,
  ctx: &StageContext,
  request: &ResolveRequest<'_>,
) -> Result<ImportTarget, BuildError> {
  if let Some(external) = pipeline.external_for(request.specifier) {
    return Ok(external);
  }
  pipeline.resolve(request, ctx)?.ok_or_else(|| {
    ResolutionError::Unresolved {
      specifier: request.specifier.to_string(),
      importer: request.importer.clone(),
    }
    .into()
  })
}

/// Build the module graph reachable from the entry.
///
/// Text stages run on every file as it is read; imports are scanned from the
/// rewritten text.
pub async fn load_graph(
  config: &PipelineConfig,
  pipeline: &Pipeline,
  ctx: &StageContext,
  options: &BuildOptions,
) -> Result<ModuleGraph, BuildError> {
  let entry = resolve_entry(config)?;
  info!(entry = %entry, "loading module graph");

  let mut graph = ModuleGraph::new(entry.clone());
  let mut queued: HashSet<ModuleId> = HashSet::from([entry.clone()]);
  let mut frontier = vec![entry];
  let semaphore = Arc::new(Semaphore::new(options.parallelism.max(1)));
  let mut wave = 0;

  while !frontier.is_empty() {
    options.cancel.check()?;
    debug!(wave, modules = frontier.len(), "reading wave");

    let contents = read_wave(&frontier, semaphore.clone()).await;
    let mut next = Vec::new();

    for (id, content) in frontier.into_iter().zip(contents) {
      let original = content?;
      let source = pipeline.apply_text(&id, &original)?;
      let mut module = Module::new(id.clone(), original, source)
        .map_err(|e| StageError::invalid_syntax(PARSE_STAGE, e.to_string()).in_module(&id))?;

      for import in &mut module.imports {
        let request = ResolveRequest {
          specifier: &import.specifier,
          importer: &module.id,
          kind: import.kind,
        };
        let target = resolve_import(pipeline, ctx, &request)?;
        if let ImportTarget::Module(dep) = &target
          && queued.insert(dep.clone())
        {
          next.push(dep.clone());
        }
        import.target = target;
      }

      debug!(module = %module.id, imports = module.imports.len(), "loaded module");
      graph.insert(module);
    }

    frontier = next;
    wave += 1;
  }

  graph.relink();
  info!(modules = graph.len(), waves = wave, "module graph loaded");
  Ok(graph)
}

/// Read every file of a wave, returning contents in frontier order.
async fn read_wave(frontier: &[ModuleId], semaphore: Arc<Semaphore>) -> Vec<Result<String, ResolutionError>> {
  let mut join_set = JoinSet::new();

  for (index, id) in frontier.iter().enumerate() {
    let path = id.path().to_path_buf();
    let semaphore = semaphore.clone();
    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await;
      (index, read_module(path).await)
    });
  }

  let mut contents: Vec<Option<Result<String, ResolutionError>>> = frontier.iter().map(|_| None).collect();
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((index, result)) => contents[index] = Some(result),
      Err(e) => debug!(error = %e, "read task failed"),
    }
  }

  contents
    .into_iter()
    .zip(frontier)
    .map(|(content, id)| {
      content.unwrap_or_else(|| {
        Err(ResolutionError::Read {
          path: id.path().to_path_buf(),
          source: std::io::Error::other("read task did not complete"),
        })
      })
    })
    .collect()
}

async fn read_module(path: PathBuf) -> Result<String, ResolutionError> {
  let bytes = tokio::fs::read(&path).await.map_err(|source| ResolutionError::Read {
    path: path.clone(),
    source,
  })?;
  String::from_utf8(bytes).map_err(|e| ResolutionError::Read {
    path,
    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
  })
}
