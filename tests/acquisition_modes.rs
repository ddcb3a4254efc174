// tests/acquisition_modes.rs

mod common;

use common::{ConfigurationBuilder, TestResult, init_tracing, only, plan};
use somaticdag::acquisition::{
    Acquisition, SampleAcquisitionStrategy, TestFixtureStrategy, strategy_for,
};
use somaticdag::catalog::StageCatalog;
use somaticdag::commands::CommandDescriptor;
use somaticdag::dag::{TaskGraphBuilder, TaskOwner, TaskSlot};
use somaticdag::errors::Result;
use somaticdag::resources::ResourceAllocator;
use somaticdag::samples::{SampleDescriptor, resolve_sample_pairs};
use somaticdag::types::AcquisitionMode;

#[test]
fn test_mode_changes_only_the_acquisition_tasks() {
    let base = || ConfigurationBuilder::new().with_tumours(2);
    let production = plan(&base().build());
    let test = plan(&base().with_test_fixtures("/data/fixtures").build());

    assert_eq!(production.topology_fingerprint(), test.topology_fingerprint());
    for s in 0..3 {
        let owner = TaskOwner::Sample(s);
        let prod_ready = only(&production, "sample_ready", owner);
        let test_ready = only(&test, "sample_ready", owner);
        assert_ne!(prod_ready.command, test_ready.command);
        assert_eq!(prod_ready.parents().len(), test_ready.parents().len());
    }
}

#[test]
fn gnos_download_fetches_bam_and_metrics() {
    let graph = plan(&ConfigurationBuilder::new().build());
    let ready = only(&graph, "sample_ready", TaskOwner::Sample(1));
    let cmd = ready.command.as_str();
    assert!(cmd.starts_with("gtdownload -c /keys/gnos.pem"));
    assert!(cmd.contains("/cghub/data/analysis/download/tum-0"));
    assert!(cmd.contains("-o tum-0/tumour0.bam.bas"));

    let stats = only(&graph, "bam_stats", TaskOwner::Sample(1));
    assert!(stats.command.as_str().contains("-i tum-0/tumour0.bam"));
    assert!(stats.parents().contains(&ready.id));
}

#[test]
fn s3_download_copies_from_prefix() {
    let graph = plan(&ConfigurationBuilder::new().with_s3("s3://bucket/bams/").build());
    let ready = only(&graph, "sample_ready", TaskOwner::Sample(0));
    assert!(
        ready
            .command
            .as_str()
            .contains("aws s3 cp s3://bucket/bams/ctl-0/control.bam ctl-0/control.bam")
    );
}

#[test]
fn symlink_links_local_bams_into_the_workspace() {
    let graph = plan(&ConfigurationBuilder::new().with_symlinks("/data/bams").build());
    let ready = only(&graph, "sample_ready", TaskOwner::Sample(1));
    assert!(
        ready
            .command
            .as_str()
            .contains("ln -sf /data/bams/tumour0.bam tum-0/tumour0.bam")
    );
}

#[test]
fn fixtures_are_read_in_place() {
    let graph = plan(
        &ConfigurationBuilder::new()
            .with_test_fixtures("/data/fixtures/")
            .build(),
    );
    let stats = only(&graph, "bam_stats", TaskOwner::Sample(1));
    assert!(stats.command.as_str().contains("-i /data/fixtures/tumour0.bam"));

    let ascat = only(&graph, "ascat", TaskOwner::Pair(0));
    assert!(ascat.command.as_str().contains("-t /data/fixtures/tumour0.bam"));
    assert!(ascat.command.as_str().contains("-n /data/fixtures/control.bam"));
}

#[test]
fn strategy_matches_configured_mode() -> TestResult {
    let cfg = ConfigurationBuilder::new().with_symlinks("/data").build();
    assert_eq!(strategy_for(&cfg)?.mode(), AcquisitionMode::Symlink);

    let cfg = ConfigurationBuilder::new().with_test_fixtures("/fx").build();
    assert_eq!(strategy_for(&cfg)?.mode(), AcquisitionMode::TestFixture);
    Ok(())
}

/// Resolves every sample to a fixed scratch path.
#[derive(Debug)]
struct ScratchStrategy;

impl SampleAcquisitionStrategy for ScratchStrategy {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Symlink
    }

    fn acquire(&self, sample: &SampleDescriptor, slot: TaskSlot) -> Result<Acquisition> {
        let path = format!("/scratch/{}", sample.bam);
        Ok(Acquisition {
            ready: slot.into_task(CommandDescriptor::new(format!("stat {path}"))),
            local_path: path,
        })
    }
}

#[test]
fn builder_accepts_any_strategy() -> TestResult {
    init_tracing();
    let cfg = ConfigurationBuilder::new().with_tumours(2).build();
    let pairs = resolve_sample_pairs(&cfg.samples)?;
    let catalog = StageCatalog::somatic(cfg.workflow.parallelism);
    let allocator = ResourceAllocator::from_host(&cfg.host);

    let custom = TaskGraphBuilder::new(&cfg, &catalog, allocator, &ScratchStrategy).build(&pairs)?;
    let fixture = TestFixtureStrategy::new("/fx");
    let reference = TaskGraphBuilder::new(&cfg, &catalog, allocator, &fixture).build(&pairs)?;

    assert_eq!(custom.topology_fingerprint(), reference.topology_fingerprint());
    let stats = only(&custom, "bam_stats", TaskOwner::Sample(2));
    assert!(stats.command.as_str().contains("-i /scratch/tumour1.bam"));
    Ok(())
}
