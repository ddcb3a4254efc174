// src/resources/plan.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::{ResourceSpec, StageCatalog, StageSpec};
use crate::config::model::Configuration;
use crate::errors::{PlanError, Result};
use crate::resources::allocator::{ResourceAllocator, StageResources};

/// Resources resolved for every enabled stage of a catalog.
///
/// Derived once before expansion so that a stage which cannot fit on the
/// host is reported before any task exists.
#[derive(Debug, Clone, Default)]
pub struct ResourcePlan {
    by_stage: BTreeMap<String, StageResources>,
}

impl ResourcePlan {
    pub fn derive(
        catalog: &StageCatalog,
        cfg: &Configuration,
        allocator: &ResourceAllocator,
    ) -> Result<Self> {
        let mut by_stage = BTreeMap::new();
        for stage in catalog.stages().iter().filter(|s| s.is_enabled(cfg)) {
            let resources = resolve_stage(stage, cfg, allocator)?;
            debug!(
                stage = %stage.name,
                threads = resources.threads,
                memory_mb = resources.memory_mb,
                "resolved stage resources"
            );
            by_stage.insert(stage.name.clone(), resources);
        }
        Ok(Self { by_stage })
    }

    pub fn get(&self, stage: &str) -> Option<StageResources> {
        self.by_stage.get(stage).copied()
    }

    pub fn len(&self) -> usize {
        self.by_stage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stage.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, StageResources)> {
        self.by_stage.iter().map(|(name, res)| (name.as_str(), *res))
    }
}

fn memory_for(cfg: &Configuration, key: &str) -> Result<u64> {
    cfg.memory_mb(key).ok_or_else(|| {
        PlanError::config(format!("memory.{key}"), "missing memory budget (MB)")
    })
}

fn resolve_stage(
    stage: &StageSpec,
    cfg: &Configuration,
    allocator: &ResourceAllocator,
) -> Result<StageResources> {
    match &stage.resources {
        ResourceSpec::Literal { memory_mb } => Ok(StageResources::single(*memory_mb)),
        ResourceSpec::Fixed { memory } => Ok(StageResources::single(memory_for(cfg, memory)?)),
        ResourceSpec::Capped {
            memory,
            max_threads,
        } => Ok(StageResources {
            threads: allocator.capped(*max_threads),
            memory_mb: memory_for(cfg, memory)?,
        }),
        ResourceSpec::Normalized { per_thread, policy } => {
            let per_thread_mb = memory_for(cfg, per_thread)?;
            allocator.allocate(&stage.name, per_thread_mb, *policy)
        }
    }
}
