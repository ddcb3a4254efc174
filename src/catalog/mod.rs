// src/catalog/mod.rs

//! Pipeline stage catalog.
//!
//! Responsibilities:
//! - Describe each stage declaratively (`stage.rs`).
//! - Resolve genome-dependent fan-out counts (`genome.rs`).
//! - Provide the somatic calling catalog (`somatic.rs`).
//! - Reject malformed catalogs before any task is built (`validate.rs`).

pub mod genome;
pub mod somatic;
pub mod stage;
pub mod validate;

use std::collections::BTreeSet;

pub use genome::{GenomeLayout, Partition};
pub use somatic::TERMINAL_STAGE;
pub use stage::{
    Dependency, FanOut, Link, ResourceSpec, Scope, StageCondition, StageKind, StageRole,
    StageSpec, ToolFamily,
};

/// Ordered list of stage descriptions plus the name of the terminal stage.
///
/// Stages are listed in construction order: a stage may only depend on stages
/// listed before it.
#[derive(Debug, Clone)]
pub struct StageCatalog {
    stages: Vec<StageSpec>,
    terminal: String,
}

impl StageCatalog {
    pub fn new(stages: Vec<StageSpec>, terminal: impl Into<String>) -> Self {
        Self {
            stages,
            terminal: terminal.into(),
        }
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    pub fn get(&self, name: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Mutable access for callers that tailor a catalog before building.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut StageSpec> {
        self.stages.iter_mut().find(|s| s.name == name)
    }

    /// Every `[memory]` key some stage reads.
    pub fn memory_keys(&self) -> BTreeSet<String> {
        self.stages
            .iter()
            .filter_map(|s| s.resources.memory_key())
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
