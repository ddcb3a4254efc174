// src/acquisition/symlink.rs

use crate::acquisition::{Acquisition, SampleAcquisitionStrategy, workspace_path};
use crate::commands::CommandDescriptor;
use crate::dag::task::TaskSlot;
use crate::errors::Result;
use crate::samples::SampleDescriptor;
use crate::types::AcquisitionMode;

/// Link BAMs that are already on local disk into the workspace.
///
/// The index and `.bas` files are linked alongside the BAM.
#[derive(Debug, Clone)]
pub struct SymlinkStrategy {
    source_dir: String,
}

impl SymlinkStrategy {
    pub fn new(source_dir: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }
}

impl SampleAcquisitionStrategy for SymlinkStrategy {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Symlink
    }

    fn acquire(&self, sample: &SampleDescriptor, slot: TaskSlot) -> Result<Acquisition> {
        let src = format!("{}/{}", self.source_dir.trim_end_matches('/'), sample.bam);
        let dest = workspace_path(sample);
        let cmd = format!(
            "mkdir -p {id} && ln -sf {src} {dest} && ln -sf {src}.bai {dest}.bai && ln -sf {src}.bas {dest}.bas",
            id = sample.analysis_id
        );
        Ok(Acquisition {
            ready: slot.into_task(CommandDescriptor::new(cmd)),
            local_path: dest,
        })
    }
}
