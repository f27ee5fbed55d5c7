//! packline-lib: Core types and logic for packline
//!
//! This crate provides the pieces of an ordered asset-transform pipeline:
//! - `config`: the declarative `PipelineConfig` loaded from TOML or JSON
//! - `graph`: the `ModuleGraph` built from one entry module
//! - `stage`: text and graph stages, their registry and ordering contract
//! - `driver`: the build driver that resolves, transforms, renders and emits
//! - `hook`: the development-server asset hook

pub mod config;
pub mod consts;
pub mod driver;
pub mod graph;
pub mod hook;
pub mod js;
pub mod stage;
pub mod util;
