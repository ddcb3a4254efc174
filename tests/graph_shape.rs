// tests/graph_shape.rs

mod common;

use std::collections::BTreeSet;

use common::{ConfigurationBuilder, ids, only, plan};
use somaticdag::dag::TaskOwner;
use somaticdag::types::ParallelismForm;

#[test]
fn one_pair_fans_out_over_chromosomes_and_sections() {
    let graph = plan(&ConfigurationBuilder::new().build());
    let pair = TaskOwner::Pair(0);

    let pin2vcf = ids(&graph, "pindel_pin2vcf", pair);
    assert_eq!(pin2vcf.len(), 24);
    assert_eq!(only(&graph, "pindel_merge", pair).parents(), &pin2vcf);

    let split = ids(&graph, "caveman_split", pair);
    assert_eq!(split.len(), 86);
    assert_eq!(only(&graph, "caveman_split_concat", pair).parents(), &split);
}

#[test]
fn battenberg_merge_waits_on_every_sample() {
    let graph = plan(&ConfigurationBuilder::new().with_tumours(2).build());

    let mut counts = BTreeSet::new();
    for s in 0..3 {
        counts.extend(ids(&graph, "bb_allele_count", TaskOwner::Sample(s)));
    }
    assert_eq!(counts.len(), 3 * 23);
    assert_eq!(
        only(&graph, "bb_allele_merge", TaskOwner::Shared).parents(),
        &counts
    );
}

#[test]
fn pair_tasks_only_see_their_own_tumour() {
    let graph = plan(&ConfigurationBuilder::new().with_tumours(3).build());

    for p in 0..3 {
        let input = graph.instances("pindel_input", TaskOwner::Pair(p));
        assert_eq!(input.len(), 2);
        let expected: BTreeSet<_> = ids(&graph, "bam_stats", TaskOwner::Sample(0))
            .into_iter()
            .chain(ids(&graph, "bam_stats", TaskOwner::Sample(p + 1)))
            .collect();
        for task in input {
            assert_eq!(task.parents(), &expected);
        }
    }
}

#[test]
fn pairs_are_isomorphic() {
    let graph = plan(&ConfigurationBuilder::new().with_tumours(3).build());
    let first = graph.pair_signature(0);
    assert_eq!(graph.pair_signature(1), first);
    assert_eq!(graph.pair_signature(2), first);

    let counts = graph.stage_counts();
    assert_eq!(counts["caveman_flag"], 3);
    assert_eq!(counts["sample_ready"], 4);
    assert_eq!(counts["control_contamination"], 1);
}

#[test]
fn exactly_one_terminal_task() {
    let graph = plan(&ConfigurationBuilder::new().with_tumours(2).build());
    let terminal = graph.terminal();
    assert_eq!(terminal.stage, "cleanup");
    assert!(graph.children_of(terminal.id).is_empty());

    let dangling: Vec<_> = graph
        .leaves()
        .filter(|t| !graph.is_side_output(t))
        .map(|t| t.name.clone())
        .collect();
    assert_eq!(dangling, vec![terminal.name.clone()]);

    let ancestors = graph.ancestors(terminal.id);
    for task in graph.tasks() {
        if task.id != terminal.id && !graph.is_side_output(task) {
            assert!(ancestors.contains(&task.id), "{} is orphaned", task.name);
        }
    }
}

#[test]
fn single_root_starts_the_workflow() {
    let graph = plan(&ConfigurationBuilder::new().build());
    let roots: Vec<_> = graph.roots().map(|t| t.stage.as_str()).collect();
    assert_eq!(roots, vec!["workflow_start"]);
}

#[test]
fn cross_family_edges_are_present() {
    let graph = plan(&ConfigurationBuilder::new().build());
    let pair = TaskOwner::Pair(0);

    let finalise = only(&graph, "ascat_finalise", pair).id;
    assert!(only(&graph, "brass_filter", pair).parents().contains(&finalise));
    for prep in graph.instances("caveman_cn_prep", pair) {
        assert!(prep.parents().contains(&finalise));
    }

    let setup = only(&graph, "caveman_setup", pair).id;
    let pindel_flag = only(&graph, "pindel_flag", pair);
    assert!(pindel_flag.parents().contains(&setup));

    let caveman_flag = only(&graph, "caveman_flag", pair);
    assert!(caveman_flag.parents().contains(&pindel_flag.id));
    assert!(
        caveman_flag
            .parents()
            .contains(&only(&graph, "tumour_contamination", pair).id)
    );
}

#[test]
fn graph_is_deterministic() {
    let cfg = ConfigurationBuilder::new().with_tumours(2).build();
    let a = plan(&cfg);
    let b = plan(&cfg);
    assert_eq!(a.topology_fingerprint(), b.topology_fingerprint());
    assert_eq!(a.len(), b.len());
    let names_a: Vec<_> = a.tasks().iter().map(|t| &t.name).collect();
    let names_b: Vec<_> = b.tasks().iter().map(|t| &t.name).collect();
    assert_eq!(names_a, names_b);
}

#[test]
fn adding_a_tumour_adds_one_lobe() {
    let one = plan(&ConfigurationBuilder::new().with_tumours(1).build());
    let two = plan(&ConfigurationBuilder::new().with_tumours(2).build());

    let per_pair = one
        .tasks()
        .iter()
        .filter(|t| t.owner == TaskOwner::Pair(0))
        .count();
    let per_sample = one
        .tasks()
        .iter()
        .filter(|t| t.owner == TaskOwner::Sample(1))
        .count();
    assert_eq!(two.len() - one.len(), per_pair + per_sample);
}

#[test]
fn calling_sections_follow_the_genome_descriptor() {
    let graph = plan(&ConfigurationBuilder::new().with_calling_sections(50).build());
    let split = ids(&graph, "caveman_split", TaskOwner::Pair(0));
    assert_eq!(split.len(), 50);
    assert_eq!(
        only(&graph, "caveman_split_concat", TaskOwner::Pair(0)).parents(),
        &split
    );
}

#[test]
fn workers_form_links_pindel_one_to_one() {
    let graph = plan(
        &ConfigurationBuilder::new()
            .with_parallelism(ParallelismForm::Workers)
            .build(),
    );
    let pair = TaskOwner::Pair(0);

    let callers = graph.instances("pindel", pair);
    let converters = graph.instances("pindel_pin2vcf", pair);
    assert_eq!(callers.len(), 24);
    assert_eq!(converters.len(), 24);
    for (caller, converter) in callers.iter().zip(&converters) {
        assert_eq!(caller.index, converter.index);
        assert_eq!(converter.parents(), &BTreeSet::from([caller.id]));
    }
}

#[test]
fn workers_form_merges_per_core_fan_outs() {
    let graph = plan(
        &ConfigurationBuilder::new()
            .with_host(12, 64000, 8000)
            .with_parallelism(ParallelismForm::Workers)
            .build(),
    );
    let pair = TaskOwner::Pair(0);

    for (fan, merge) in [
        ("caveman_mstep", "caveman_merge"),
        ("caveman_estep", "caveman_merge_results"),
        ("brass_assemble", "brass_grass"),
    ] {
        let workers = ids(&graph, fan, pair);
        assert_eq!(workers.len(), 12, "{fan}");
        assert_eq!(only(&graph, merge, pair).parents(), &workers, "{merge}");
        assert!(graph.instances(fan, pair).iter().all(|t| t.threads == 1));
    }
}

#[test]
fn side_outputs_hang_off_packaging() {
    let graph = plan(&ConfigurationBuilder::new().build());
    let renames: Vec<_> = graph
        .tasks()
        .iter()
        .filter(|t| graph.is_side_output(t))
        .map(|t| t.stage.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    assert_eq!(
        renames,
        vec!["contamination_rename", "genotype_rename", "impute_rename"]
    );
}

#[test]
fn snv_flagging_waits_only_on_its_direct_inputs() {
    let graph = plan(&ConfigurationBuilder::new().build());
    let pair = TaskOwner::Pair(0);

    let expected = BTreeSet::from([
        only(&graph, "caveman_add_ids", pair).id,
        only(&graph, "pindel_flag", pair).id,
        only(&graph, "tumour_contamination", pair).id,
    ]);
    assert_eq!(only(&graph, "caveman_flag", pair).parents(), &expected);

    let finalise = BTreeSet::from([only(&graph, "ascat_finalise", pair).id]);
    for prep in graph.instances("caveman_cn_prep", pair) {
        assert_eq!(prep.parents(), &finalise);
    }
}
