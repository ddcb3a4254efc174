// src/acquisition/mod.rs

//! How each sample's BAM becomes available to the pipeline.
//!
//! A strategy turns one sample into exactly one readiness task plus the local
//! path downstream stages read the BAM from. The builder depends only on the
//! [`SampleAcquisitionStrategy`] trait, so the rest of the graph is the same
//! whichever strategy is configured.

mod download;
mod fixture;
mod symlink;

use std::fmt::Debug;

use crate::config::model::Configuration;
use crate::dag::task::{Task, TaskSlot};
use crate::errors::{PlanError, Result};
use crate::samples::SampleDescriptor;
use crate::types::AcquisitionMode;

pub use download::{DownloadStrategy, Remote};
pub use fixture::TestFixtureStrategy;
pub use symlink::SymlinkStrategy;

/// The readiness task for one sample and where its BAM will be.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub ready: Task,
    pub local_path: String,
}

/// Produces the readiness task for a sample.
pub trait SampleAcquisitionStrategy: Debug + Send + Sync {
    fn mode(&self) -> AcquisitionMode;

    /// Fill `slot` with the command that makes `sample`'s BAM available.
    fn acquire(&self, sample: &SampleDescriptor, slot: TaskSlot) -> Result<Acquisition>;
}

/// Select the strategy for the configured acquisition mode.
pub fn strategy_for(cfg: &Configuration) -> Result<Box<dyn SampleAcquisitionStrategy>> {
    let acq = &cfg.acquisition;
    let strategy: Box<dyn SampleAcquisitionStrategy> = match acq.mode {
        AcquisitionMode::Download => Box::new(DownloadStrategy::from_config(cfg)?),
        AcquisitionMode::Symlink => {
            let source_dir = required(acq.source_dir.as_ref(), "acquisition.source_dir")?;
            Box::new(SymlinkStrategy::new(source_dir))
        }
        AcquisitionMode::TestFixture => {
            let fixture_dir = required(acq.fixture_dir.as_ref(), "acquisition.fixture_dir")?;
            Box::new(TestFixtureStrategy::new(fixture_dir))
        }
    };
    Ok(strategy)
}

pub(crate) fn required(value: Option<&String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| PlanError::config(field, "required for the selected acquisition mode"))
}

/// Workspace-relative path a fetched or linked BAM lands at.
pub(crate) fn workspace_path(sample: &SampleDescriptor) -> String {
    format!("{}/{}", sample.analysis_id, sample.bam)
}
