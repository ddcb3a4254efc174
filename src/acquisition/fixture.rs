// src/acquisition/fixture.rs

use crate::acquisition::{Acquisition, SampleAcquisitionStrategy};
use crate::commands::CommandDescriptor;
use crate::dag::task::TaskSlot;
use crate::errors::Result;
use crate::samples::SampleDescriptor;
use crate::types::AcquisitionMode;

/// Read BAMs straight from a directory of static test data.
///
/// Nothing is fetched; the readiness task only checks the fixture is there,
/// so the graph downstream of it is identical to a production run.
#[derive(Debug, Clone)]
pub struct TestFixtureStrategy {
    fixture_dir: String,
}

impl TestFixtureStrategy {
    pub fn new(fixture_dir: impl Into<String>) -> Self {
        Self {
            fixture_dir: fixture_dir.into(),
        }
    }
}

impl SampleAcquisitionStrategy for TestFixtureStrategy {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::TestFixture
    }

    fn acquire(&self, sample: &SampleDescriptor, slot: TaskSlot) -> Result<Acquisition> {
        let path = format!("{}/{}", self.fixture_dir.trim_end_matches('/'), sample.bam);
        let cmd = format!("test -s {path} && test -s {path}.bai");
        Ok(Acquisition {
            ready: slot.into_task(CommandDescriptor::new(cmd)),
            local_path: path,
        })
    }
}
