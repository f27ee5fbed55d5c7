//! The module graph built for one build.
//!
//! Nodes are [`Module`]s keyed by their canonical path; an edge runs from an
//! importer to every bundled module it imports. The graph keeps insertion
//! order so that everything derived from it (render order, summaries) is
//! independent of hash iteration order.
//!
//! Cycles are allowed. [`ModuleGraph::render_order`] tolerates them and
//! [`ModuleGraph::cycles`] reports them.

mod module;
pub mod scan;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::Serialize;

pub use module::{Import, ImportKind, ImportTarget, Module, ModuleId, ModuleKind, Syntax};

/// The resolved set of modules and their import relationships.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
  graph: StableDiGraph<Module, ImportKind>,
  nodes: HashMap<ModuleId, NodeIndex>,
  /// Module ids in insertion order.
  order: Vec<ModuleId>,
  entry: ModuleId,
}

impl ModuleGraph {
  /// Create an empty graph whose entry module is `entry`.
  ///
  /// The entry module itself is added with [`ModuleGraph::insert`].
  pub fn new(entry: ModuleId) -> Self {
    Self {
      graph: StableDiGraph::new(),
      nodes: HashMap::new(),
      order: Vec::new(),
      entry,
    }
  }

  pub fn entry(&self) -> &ModuleId {
    &self.entry
  }

  /// Add a module, replacing any module with the same id in place.
  pub fn insert(&mut self, module: Module) {
    if let Some(&idx) = self.nodes.get(&module.id) {
      self.graph[idx] = module;
      return;
    }
    let id = module.id.clone();
    let idx = self.graph.add_node(module);
    self.nodes.insert(id.clone(), idx);
    self.order.push(id);
  }

  /// Remove a module and its edges.
  ///
  /// Imports in other modules that targeted it are left as they are; callers
  /// rewrite those first.
  pub fn remove(&mut self, id: &ModuleId) -> Option<Module> {
    let idx = self.nodes.remove(id)?;
    self.order.retain(|existing| existing != id);
    self.graph.remove_node(idx)
  }

  pub fn contains(&self, id: &ModuleId) -> bool {
    self.nodes.contains_key(id)
  }

  pub fn get(&self, id: &ModuleId) -> Option<&Module> {
    self.nodes.get(id).map(|&idx| &self.graph[idx])
  }

  pub fn get_mut(&mut self, id: &ModuleId) -> Option<&mut Module> {
    self.nodes.get(id).map(|&idx| &mut self.graph[idx])
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Modules in insertion order.
  pub fn modules(&self) -> impl Iterator<Item = &Module> {
    self.order.iter().map(|id| &self.graph[self.nodes[id]])
  }

  /// Mutable access to every module, in insertion order.
  pub fn modules_mut(&mut self) -> impl Iterator<Item = &mut Module> {
    let rank: HashMap<NodeIndex, usize> = self
      .order
      .iter()
      .enumerate()
      .map(|(position, id)| (self.nodes[id], position))
      .collect();
    let indices: Vec<NodeIndex> = self.graph.node_indices().collect();
    // Freed node slots get reused, so index order is not insertion order.
    let mut weights: Vec<(usize, &mut Module)> = indices
      .into_iter()
      .zip(self.graph.node_weights_mut())
      .map(|(idx, module)| (rank[&idx], module))
      .collect();
    weights.sort_by_key(|(position, _)| *position);
    weights.into_iter().map(|(_, module)| module)
  }

  pub fn module_ids(&self) -> Vec<ModuleId> {
    self.order.clone()
  }

  /// Rebuild the edge set from every module's resolved imports.
  ///
  /// Called after anything rewrites imports or removes modules. Imports of
  /// modules missing from the graph produce no edge.
  pub fn relink(&mut self) {
    self.graph.clear_edges();
    let mut edges = Vec::new();
    for id in &self.order {
      let from = self.nodes[id];
      let mut seen = HashSet::new();
      for import in &self.graph[from].imports {
        if let ImportTarget::Module(target) = &import.target
          && let Some(&to) = self.nodes.get(target)
          && seen.insert(to)
        {
          edges.push((from, to, import.kind));
        }
      }
    }
    for (from, to, kind) in edges {
      self.graph.add_edge(from, to, kind);
    }
  }

  /// Bundled modules imported by `id`, in import order, without duplicates.
  pub fn dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
    let Some(module) = self.get(id) else {
      return Vec::new();
    };
    let mut seen = HashSet::new();
    module
      .imports
      .iter()
      .filter_map(|import| import.target.module())
      .filter(|target| self.contains(target) && seen.insert((*target).clone()))
      .cloned()
      .collect()
  }

  /// Modules that import `id`, sorted by path.
  pub fn importers(&self, id: &ModuleId) -> Vec<ModuleId> {
    let Some(&idx) = self.nodes.get(id) else {
      return Vec::new();
    };
    let mut importers: Vec<ModuleId> = self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|n| self.graph[n].id.clone())
      .collect();
    importers.sort();
    importers.dedup();
    importers
  }

  /// Declared external names referenced anywhere in the graph.
  pub fn externals(&self) -> BTreeSet<String> {
    self.host_names(|target| matches!(target, ImportTarget::External(_)))
  }

  /// Host built-ins referenced anywhere in the graph.
  pub fn builtins(&self) -> BTreeSet<String> {
    self.host_names(|target| matches!(target, ImportTarget::Builtin(_)))
  }

  fn host_names(&self, filter: impl Fn(&ImportTarget) -> bool) -> BTreeSet<String> {
    self
      .modules()
      .flat_map(|m| m.imports.iter())
      .filter(|i| filter(&i.target))
      .filter_map(|i| i.target.host_name().map(str::to_string))
      .collect()
  }

  /// `(importer, specifier)` pairs that have not been resolved.
  pub fn unresolved(&self) -> Vec<(ModuleId, String)> {
    self
      .modules()
      .flat_map(|m| {
        m.imports
          .iter()
          .filter(|i| i.target == ImportTarget::Pending)
          .map(move |i| (m.id.clone(), i.specifier.clone()))
      })
      .collect()
  }

  /// Modules reachable from the entry, dependencies before their importers.
  ///
  /// A depth-first post-order walk following import order. A module already
  /// on the walk is skipped, so cycles terminate; within a cycle the module
  /// reached first is emitted last.
  pub fn render_order(&self) -> Vec<ModuleId> {
    let mut order = Vec::new();
    if !self.contains(&self.entry) {
      return order;
    }

    let mut visited: HashSet<ModuleId> = HashSet::new();
    let mut stack: Vec<(ModuleId, Vec<ModuleId>, usize)> = Vec::new();
    visited.insert(self.entry.clone());
    stack.push((self.entry.clone(), self.dependencies(&self.entry), 0));

    while let Some((id, deps, next)) = stack.last_mut() {
      if let Some(dep) = deps.get(*next).cloned() {
        *next += 1;
        if visited.insert(dep.clone()) {
          let dep_deps = self.dependencies(&dep);
          stack.push((dep, dep_deps, 0));
        }
      } else {
        order.push(id.clone());
        stack.pop();
      }
    }
    order
  }

  /// Import cycles, each sorted by path; the list itself is sorted too.
  pub fn cycles(&self) -> Vec<Vec<ModuleId>> {
    let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&self.graph)
      .into_iter()
      .filter(|component| component.len() > 1 || self.graph.find_edge(component[0], component[0]).is_some())
      .map(|component| {
        let mut ids: Vec<ModuleId> = component.into_iter().map(|n| self.graph[n].id.clone()).collect();
        ids.sort();
        ids
      })
      .collect();
    cycles.sort();
    cycles
  }

  /// A serializable description of the graph with paths relative to `root`.
  pub fn summary(&self, root: &Path) -> GraphSummary {
    let modules = self
      .modules()
      .map(|m| ModuleSummary {
        path: m.id.relative_to(root),
        kind: m.kind,
        syntax: m.syntax,
        bytes: m.source.len(),
        imports: m
          .imports
          .iter()
          .map(|i| ImportSummary {
            specifier: i.specifier.clone(),
            kind: i.kind,
            target: describe_target(&i.target, root),
          })
          .collect(),
      })
      .collect();

    GraphSummary {
      entry: self.entry.relative_to(root),
      modules,
      externals: self.externals().into_iter().collect(),
      builtins: self.builtins().into_iter().collect(),
      cycles: self
        .cycles()
        .into_iter()
        .map(|c| c.iter().map(|id| id.relative_to(root)).collect())
        .collect(),
    }
  }
}

fn describe_target(target: &ImportTarget, root: &Path) -> String {
  match target {
    ImportTarget::Pending => "<unresolved>".to_string(),
    ImportTarget::Module(id) => id.relative_to(root),
    ImportTarget::External(name) => format!("external:{}", name),
    ImportTarget::Builtin(name) => format!("builtin:{}", name),
  }
}

/// Graph description printed by `packline graph`.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
  pub entry: String,
  pub modules: Vec<ModuleSummary>,
  pub externals: Vec<String>,
  pub builtins: Vec<String>,
  pub cycles: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
  pub path: String,
  pub kind: ModuleKind,
  pub syntax: Syntax,
  pub bytes: usize,
  pub imports: Vec<ImportSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
  pub specifier: String,
  pub kind: ImportKind,
  pub target: String,
}
