#![allow(dead_code)]

use std::collections::BTreeSet;
use std::error::Error;

use somaticdag::config::Configuration;
use somaticdag::dag::{PipelineGraph, TaskId, TaskOwner, plan_pipeline};

pub use somaticdag_test_utils::builders::ConfigurationBuilder;
pub use somaticdag_test_utils::init_tracing;

pub type TestResult = Result<(), Box<dyn Error>>;

pub fn plan(cfg: &Configuration) -> PipelineGraph {
    init_tracing();
    plan_pipeline(cfg).expect("graph should build")
}

/// Ids of every instance of `stage` owned by `owner`.
pub fn ids(graph: &PipelineGraph, stage: &str, owner: TaskOwner) -> BTreeSet<TaskId> {
    graph.instances(stage, owner).iter().map(|t| t.id).collect()
}

/// The single instance of `stage` owned by `owner`.
pub fn only<'g>(
    graph: &'g PipelineGraph,
    stage: &str,
    owner: TaskOwner,
) -> &'g somaticdag::dag::Task {
    let found = graph.instances(stage, owner);
    assert_eq!(found.len(), 1, "expected one {stage} for {owner:?}");
    found[0]
}

/// A complete, valid run configuration in TOML form.
pub fn sample_toml() -> String {
    r#"
[workflow]
date = "20150617"
name = "svcp_1-0-0"
output_dir = "outdir"

[host]
cores_addressable = 8
mem_host_mb_available = 32000
mem_workflow_overhead = 4000

[memory]
mark_time = 100
acquisition = 4000
bam_stats = 4000
genotype = 4000
contamination = 8000
allele_count = 4000
bb_merge = 4000
ascat = 8000
ascat_finalise = 4000
package_results = 4000
caveman_cn_prep = 4000
caveman_setup = 4000
pindel_input = 7000
pindel_per_thread = 2000
pindel_vcf = 8000
pindel_merge = 4000
pindel_flag = 8000
brass_input = 4000
brass_cover_per_thread = 500
brass_cover_merge = 4000
brass_group = 4000
brass_isize = 4000
brass_normcn = 4000
brass_filter = 4000
brass_split = 4000
brass_assemble_per_thread = 2000
brass_grass = 4000
brass_tabix = 4000
caveman_split = 4000
caveman_split_concat = 4000
caveman_mstep_per_thread = 3000
caveman_merge = 4000
caveman_estep_per_thread = 3000
caveman_merge_results = 4000
caveman_add_ids = 4000
caveman_flag = 4000
caveman_tbi_clean = 4000
qc_metrics = 4000
upload = 4000

[reference]
species = "human"
assembly = "GRCh37d5"
seq_type = "WGS"
gender = "XY"
ref_exclude = "MT,GL%,hs37d5,NC_007605"
ref_from = "https://example.org/ref.tar.gz"
bb_from = "https://example.org/bb.tar.gz"
contam_down_samp_one_in = 25

[samples]
control_bam = "control.bam"
control_analysis_id = "ctl-0"
tumour_bams = ["t0.bam", "t1.bam"]
tumour_analysis_ids = ["tum-0", "tum-1"]
tumour_aliquot_ids = ["aliquot-0", "aliquot-1"]

[acquisition]
mode = "test_fixture"
fixture_dir = "/data/fixtures"
"#
    .to_string()
}
