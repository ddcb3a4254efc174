// tests/catalog_defects.rs

mod common;

use common::{ConfigurationBuilder, init_tracing};
use somaticdag::acquisition::strategy_for;
use somaticdag::catalog::{FanOut, GenomeLayout, StageCatalog, StageKind};
use somaticdag::dag::TaskGraphBuilder;
use somaticdag::errors::PlanError;
use somaticdag::resources::ResourceAllocator;
use somaticdag::samples::resolve_sample_pairs;
use somaticdag::types::ParallelismForm;

fn build_with(catalog: &StageCatalog) -> Result<usize, PlanError> {
    init_tracing();
    let cfg = ConfigurationBuilder::new().build();
    let pairs = resolve_sample_pairs(&cfg.samples)?;
    let strategy = strategy_for(&cfg)?;
    let allocator = ResourceAllocator::from_host(&cfg.host);
    TaskGraphBuilder::new(&cfg, catalog, allocator, strategy.as_ref())
        .build(&pairs)
        .map(|graph| graph.len())
}

fn expect_catalog_error<T: std::fmt::Debug>(result: Result<T, PlanError>, stage: &str) {
    match result {
        Err(PlanError::CatalogError { stage: s, .. }) => assert_eq!(s, stage),
        other => panic!("Expected CatalogError for {stage}, got {:?}", other),
    }
}

#[test]
fn merge_over_wrong_partition_is_reported_at_the_merge() {
    let mut catalog = StageCatalog::somatic(ParallelismForm::Threaded);
    if let Some(stage) = catalog.get_mut("pindel_pin2vcf") {
        stage.fan_out = FanOut::Fixed(23);
    }
    expect_catalog_error(build_with(&catalog), "pindel_merge");
    expect_catalog_error(catalog.validate(&GenomeLayout::grch37(), 16), "pindel_merge");
}

#[test]
fn required_dependency_on_disabled_stage_fails() {
    let mut catalog = StageCatalog::somatic(ParallelismForm::Threaded);
    if let Some(cleanup) = catalog.get_mut("cleanup") {
        for dep in &mut cleanup.depends_on {
            dep.optional = false;
        }
    }
    expect_catalog_error(build_with(&catalog), "cleanup");
}

#[test]
fn unbound_placeholder_is_reported() {
    let mut catalog = StageCatalog::somatic(ParallelismForm::Threaded);
    if let Some(stage) = catalog.get_mut("qc_metrics") {
        stage.kind = StageKind::Command("qc --sample {tumour}".to_string());
    }
    expect_catalog_error(build_with(&catalog), "qc_metrics");
}

#[test]
fn unmodified_catalog_builds() {
    let catalog = StageCatalog::somatic(ParallelismForm::Workers);
    assert!(build_with(&catalog).is_ok_and(|n| n > 0));
}
