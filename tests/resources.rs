// tests/resources.rs

mod common;

use common::{ConfigurationBuilder, only, plan};
use somaticdag::dag::{TaskOwner, plan_pipeline};
use somaticdag::errors::PlanError;
use somaticdag::resources::ResourceShortfall;

#[test]
fn snv_caller_is_reduced_to_fit_host_memory() {
    let graph = plan(
        &ConfigurationBuilder::new()
            .with_host(8, 32000, 4000)
            .with_memory("caveman_mstep_per_thread", 4000)
            .build(),
    );
    let mstep = only(&graph, "caveman_mstep", TaskOwner::Pair(0));
    assert_eq!(mstep.threads, 7);
    assert_eq!(mstep.memory_mb, 4000 + 4000 / 7);
    assert!(mstep.command.as_str().contains("-l 7 -t 7"));

    // 28000 / 8 = 3500 covers the default 2000 per thread.
    let estep = only(&graph, "caveman_estep", TaskOwner::Pair(0));
    assert_eq!(estep.threads, 8);
}

#[test]
fn stage_that_cannot_fit_fails_the_whole_build() {
    let cfg = ConfigurationBuilder::new()
        .with_host(8, 32000, 28000)
        .with_memory("brass_assemble_per_thread", 5000)
        .build();
    match plan_pipeline(&cfg) {
        Err(PlanError::ResourceError { stage, shortfall }) => {
            assert_eq!(stage, "brass_assemble");
            assert!(matches!(
                shortfall,
                ResourceShortfall::InsufficientMemory {
                    available_mb: 4000,
                    mem_per_thread_mb: 5000,
                    ..
                }
            ));
        }
        other => panic!("Expected ResourceError, got {:?}", other),
    }
}

#[test]
fn indel_caller_leaves_cores_for_io_on_large_hosts() {
    let graph = plan(&ConfigurationBuilder::new().build());
    let pindel = only(&graph, "pindel", TaskOwner::Pair(0));
    assert_eq!(pindel.threads, 14);
    assert_eq!(pindel.memory_mb, 2000 + 8000 / 14);
}

#[test]
fn indel_input_threads_are_capped() {
    let graph = plan(&ConfigurationBuilder::new().build());
    for input in graph.instances("pindel_input", TaskOwner::Pair(0)) {
        assert_eq!(input.threads, 4);
        assert!(input.command.as_str().ends_with("-c 4"));
    }

    let small = plan(&ConfigurationBuilder::new().with_host(2, 64000, 8000).build());
    for input in small.instances("pindel_input", TaskOwner::Pair(0)) {
        assert_eq!(input.threads, 2);
    }
}

#[test]
fn fixed_stages_take_configured_memory() {
    let graph = plan(
        &ConfigurationBuilder::new()
            .with_memory("pindel_vcf", 8000)
            .build(),
    );
    for task in graph.instances("pindel_pin2vcf", TaskOwner::Pair(0)) {
        assert_eq!(task.threads, 1);
        assert_eq!(task.memory_mb, 8000);
    }
    assert_eq!(only(&graph, "genotype_package", TaskOwner::Shared).memory_mb, 4000);
}
