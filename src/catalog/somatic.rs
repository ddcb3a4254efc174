// src/catalog/somatic.rs

//! The somatic calling catalog: copy number, indels, structural variants and
//! SNVs for each tumour/control pair, with shared QC and packaging around them.

use crate::catalog::genome::Partition;
use crate::catalog::stage::{FanOut, Scope, StageCondition, StageSpec, ToolFamily};
use crate::catalog::StageCatalog;
use crate::resources::ThreadPolicy;
use crate::types::ParallelismForm;

/// Name of the task every non-side-output task leads to.
pub const TERMINAL_STAGE: &str = "cleanup";

/// Memory for the small rename/package helpers that take no configured budget.
const HELPER_MEMORY_MB: u64 = 4000;

const ASCAT_ARGS: &str = " -r {genome_fa} -s {ref}/ascat/SnpLocus.tsv \
-sp {ref}/ascat/SnpPositions.tsv -sg {ref}/ascat/SnpGcCorrections.tsv \
-pr {seq_type} -ra {assembly} -rs {species} -pl ILLUMINA \
-o {outdir}/{pair}/ascat -t {tumour} -n {control} {gender_args}";

const PINDEL_ARGS: &str = " -r {genome_fa} -e {ref}/pindel/HiDepth.bed.gz \
-st {seq_protocol} -as {assembly} -sp {species} -x {ref_exclude} \
-s {ref}/pindel/simpleRepeats.bed.gz -f {ref}/pindel/genomicRules.lst \
-g {ref}/pindel/human.GRCh37.indelCoding.bed.gz -u {ref}/pindel/pindel_np.gff3.gz \
-sf {ref}/pindel/softRules.lst -b {ref}/brass/ucscHiDepth_0.01_merge1000_no_exon.bed.gz \
-o {outdir}/{pair}/pindel -t {tumour} -n {control}";

const BRASS_ARGS: &str = " -g {genome_fa} -e {ref_exclude} -pr {seq_type} -as {assembly} \
-s {species} -pl ILLUMINA -d {ref}/brass/ucscHiDepth_0.01_merge1000_no_exon.bed.gz \
-f {ref}/brass/brass_np.groups.gz -g_cache {ref}/vagrent/e74/Homo_sapiens.GRCh37.74.vagrent.cache.gz \
-o {outdir}/{pair}/brass -t {tumour} -n {control}";

const BRASS_CN_ARGS: &str = " -a {outdir}/{pair}/ascat/*.copynumber.caveman.csv \
-ss {outdir}/{pair}/ascat/*.samplestatistics.csv";

const CAVEMAN_ARGS: &str = " -r {genome_fa}.fai -ig {ref}/caveman/ucscHiDepth_0.01_mrg1000_no_exon_coreChrs.tsv \
-b {ref}/caveman/flagging -u {ref}/caveman -s {species} -sa {assembly} -st {seq_protocol} \
-in {outdir}/{pair}/pindel/*.germline.bed -tc {outdir}/{pair}/tumour.cn.bed \
-nc {outdir}/{pair}/normal.cn.bed -o {outdir}/{pair}/caveman -tb {tumour} -nb {control}";

fn tool(tool: &str, process: &str, args: &str) -> String {
    ["{wrapper} ", tool, " -p ", process, " -i {index}", args].concat()
}

fn ascat(process: &str) -> String {
    tool("ascat.pl", process, ASCAT_ARGS)
}

fn pindel(process: &str) -> String {
    tool("pindel.pl", process, PINDEL_ARGS)
}

fn brass(process: &str, extra: &str) -> String {
    tool("brass.pl", process, &[BRASS_ARGS, extra].concat())
}

fn caveman(process: &str) -> String {
    tool("caveman.pl", process, CAVEMAN_ARGS)
}

/// Copy a result file to its per-sample name for every tumour.
fn rename(src_dir: &str) -> String {
    [
        "for b in {tumours}; do {wrapper} {base_dir}/bin/execute_with_sample.pl $b cp ",
        src_dir,
        "/%SM%.{label} {outdir}/%SM%.{workflow}.{date}.somatic.{label}; done",
    ]
    .concat()
}

fn package(subdir: &str, kind: &str, suffix: &str) -> String {
    [
        "{wrapper} {base_dir}/bin/packageResults.pl {outdir} {tumour} {outdir}/{pair}/",
        subdir,
        " ",
        kind,
        " ",
        suffix,
        " {workflow} somatic {date}",
    ]
    .concat()
}

impl StageCatalog {
    /// The full somatic calling catalog in the given parallelism form.
    pub fn somatic(form: ParallelismForm) -> Self {
        let mut stages = Vec::new();
        stages.extend(shared_head());
        stages.extend(copy_number());
        stages.extend(indels(form));
        stages.extend(structural_variants(form));
        stages.extend(snvs(form));
        stages.extend(shared_tail());
        StageCatalog::new(stages, TERMINAL_STAGE)
    }
}

fn shared_head() -> Vec<StageSpec> {
    use Scope::*;
    use ToolFamily::*;

    vec![
        StageSpec::command(
            "workflow_start",
            Workflow,
            Shared,
            "mkdir -p {timedir} {bbdir}; date +%s > {outdir}/start_time",
        )
        .memory("mark_time"),
        StageSpec::acquisition("sample_ready")
            .memory("acquisition")
            .after("workflow_start"),
        StageSpec::command(
            "pull_ref",
            Reference,
            Shared,
            "curl -sSL --retry 10 -o {outdir}/ref.tar.gz {ref_from}",
        )
        .memory("mark_time")
        .timed()
        .after("workflow_start"),
        StageSpec::command(
            "unpack_ref",
            Reference,
            Shared,
            "tar -C {outdir} -zxf {outdir}/ref.tar.gz; rm -f {outdir}/ref.tar.gz",
        )
        .memory("mark_time")
        .after("pull_ref"),
        StageSpec::command(
            "pull_bb_ref",
            Reference,
            Shared,
            "curl -sSL --retry 10 -o {outdir}/bb.tar.gz {bb_from}",
        )
        .memory("mark_time")
        .timed()
        .after("workflow_start"),
        StageSpec::command(
            "unpack_bb_ref",
            Reference,
            Shared,
            "tar -C {ref} -zxf {outdir}/bb.tar.gz; rm -f {outdir}/bb.tar.gz",
        )
        .memory("mark_time")
        .after("pull_bb_ref")
        .after("unpack_ref"),
        StageSpec::command(
            "bam_stats",
            Qc,
            PerSample,
            "{wrapper} bam_stats -i {sample} -o {sample}.bas",
        )
        .timed()
        .after("sample_ready")
        .after("unpack_ref"),
        StageSpec::command(
            "genotype",
            Qc,
            Shared,
            "{wrapper} compareBamGenotypes.pl -o {outdir}/genotype -nb {control} \
             -j {outdir}/genotype/summary.json {tumour_bam_args}",
        )
        .timed()
        .after("bam_stats"),
        StageSpec::command(
            "genotype_package",
            Packaging,
            Shared,
            "{wrapper} {base_dir}/bin/packageGenotype.pl {outdir} {control} {tumours}",
        )
        .literal_memory(HELPER_MEMORY_MB)
        .after("genotype"),
        StageSpec::command("genotype_rename", Packaging, Shared, rename("{outdir}"))
            .fan_out(FanOut::Fixed(2))
            .labels(&["genotype.tar.gz", "genotype.tar.gz.md5"])
            .literal_memory(HELPER_MEMORY_MB)
            .side_output()
            .after("genotype_package"),
        StageSpec::command(
            "control_contamination",
            Qc,
            Control,
            "{wrapper} verifyBamHomChk.pl -o {outdir}/contamination -b {sample} \
             -d {contam_one_in} -j {outdir}/contamination/{sample_id}_summary.json",
        )
        .memory("contamination")
        .timed()
        .after("bam_stats"),
        StageSpec::command(
            "bb_allele_count",
            Battenberg,
            PerSample,
            "{wrapper} {base_dir}/bin/execute_with_sample.pl {sample} alleleCounter \
             -l {ref}/battenberg/1000genomesloci/1000genomesloci2012_chr{label}.txt \
             -o {bbdir}/%SM%.{label}.tsv -b {sample}",
        )
        .fan_out(FanOut::PerPartition(Partition::AlleleCountChromosomes))
        .memory("allele_count")
        .timed()
        .after("bam_stats")
        .after("unpack_bb_ref"),
        StageSpec::command(
            "bb_allele_merge",
            Battenberg,
            Shared,
            "{wrapper} {base_dir}/bin/packageImpute.pl {control} {bbdir}",
        )
        .merge(FanOut::PerPartition(Partition::AlleleCountChromosomes))
        .memory("bb_merge")
        .timed()
        .after("bb_allele_count"),
        StageSpec::command("impute_rename", Packaging, Shared, rename("{bbdir}"))
            .fan_out(FanOut::Fixed(2))
            .labels(&["imputeCounts.tar.gz", "imputeCounts.tar.gz.md5"])
            .literal_memory(HELPER_MEMORY_MB)
            .side_output()
            .after("bb_allele_merge"),
    ]
}

fn copy_number() -> Vec<StageSpec> {
    use Scope::Pair;
    use ToolFamily::*;

    vec![
        StageSpec::command("ascat_allele_count", Ascat, Pair, ascat("allele_count"))
            .fan_out(FanOut::Fixed(2))
            .memory("allele_count")
            .timed()
            .after("bam_stats"),
        StageSpec::command("ascat", Ascat, Pair, ascat("ascat"))
            .timed()
            .after("ascat_allele_count"),
        StageSpec::command("ascat_finalise", Ascat, Pair, ascat("finalise"))
            .timed()
            .after("ascat"),
        StageSpec::command(
            "ascat_package",
            Packaging,
            Pair,
            package("ascat", "cnv", "copynumber.caveman.vcf.gz"),
        )
        .memory("package_results")
        .after("ascat_finalise"),
        StageSpec::command(
            "tumour_contamination",
            Qc,
            Pair,
            "{wrapper} verifyBamHomChk.pl -o {outdir}/{pair}/contamination -b {tumour} \
             -d {contam_one_in} -j {outdir}/{pair}/contamination/{tumour_id}_summary.json \
             -a {outdir}/{pair}/ascat/*.copynumber.caveman.csv",
        )
        .memory("contamination")
        .timed()
        .after("ascat_finalise"),
        StageSpec::command(
            "caveman_cn_prep",
            Caveman,
            Pair,
            "{base_dir}/bin/cnPrep.pl {label} {outdir}/{pair}/ascat/*.copynumber.caveman.csv \
             {outdir}/{pair}/{label}.cn.bed",
        )
        .fan_out(FanOut::Fixed(2))
        .labels(&["tumour", "normal"])
        .after("ascat_finalise"),
        StageSpec::command("caveman_setup", Caveman, Pair, caveman("setup"))
            .timed()
            .after("caveman_cn_prep"),
    ]
}

fn indels(form: ParallelismForm) -> Vec<StageSpec> {
    use Scope::Pair;
    use ToolFamily::*;

    let chromosomes = FanOut::PerPartition(Partition::Chromosomes);
    let (caller, pin2vcf) = match form {
        ParallelismForm::Threaded => (
            StageSpec::command(
                "pindel",
                Pindel,
                Pair,
                [pindel("pindel").as_str(), " -l {threads} -c {threads}"].concat(),
            )
            .normalized("pindel_per_thread", ThreadPolicy::AllCoresReserved)
            .timed()
            .after("pindel_input"),
            StageSpec::command("pindel_pin2vcf", Pindel, Pair, pindel("pin2vcf"))
                .fan_out(chromosomes)
                .memory("pindel_vcf")
                .timed()
                .after("pindel"),
        ),
        ParallelismForm::Workers => (
            StageSpec::command("pindel", Pindel, Pair, pindel("pindel"))
                .fan_out(chromosomes)
                .timed()
                .after("pindel_input"),
            StageSpec::command("pindel_pin2vcf", Pindel, Pair, pindel("pin2vcf"))
                .fan_out(chromosomes)
                .memory("pindel_vcf")
                .timed()
                .each("pindel"),
        ),
    };

    vec![
        StageSpec::command(
            "pindel_input",
            Pindel,
            Pair,
            [pindel("input").as_str(), " -c {threads}"].concat(),
        )
        .fan_out(FanOut::Fixed(2))
        .capped("pindel_input", 4)
        .timed()
        .after("bam_stats"),
        caller,
        pin2vcf,
        StageSpec::command("pindel_merge", Pindel, Pair, pindel("merge"))
            .merge(chromosomes)
            .timed()
            .after("pindel_pin2vcf"),
        StageSpec::command("pindel_flag", Pindel, Pair, pindel("flag"))
            .timed()
            .after("pindel_merge")
            .after("caveman_setup"),
        StageSpec::command(
            "pindel_package",
            Packaging,
            Pair,
            package("pindel", "indel", "flagged.vcf.gz"),
        )
        .memory("package_results")
        .after("pindel_flag"),
    ]
}

fn structural_variants(form: ParallelismForm) -> Vec<StageSpec> {
    use Scope::Pair;
    use ToolFamily::*;

    let (assemble, grass) = match form {
        ParallelismForm::Threaded => (
            StageSpec::command(
                "brass_assemble",
                Brass,
                Pair,
                brass("assemble", " -l {threads} -c {threads}"),
            )
            .normalized("brass_assemble_per_thread", ThreadPolicy::AllCores)
            .timed()
            .after("brass_split"),
            StageSpec::command("brass_grass", Brass, Pair, brass("grass", BRASS_CN_ARGS))
                .timed()
                .after("brass_assemble"),
        ),
        ParallelismForm::Workers => (
            StageSpec::command("brass_assemble", Brass, Pair, brass("assemble", ""))
                .fan_out(FanOut::PerCore)
                .timed()
                .after("brass_split"),
            StageSpec::command("brass_grass", Brass, Pair, brass("grass", BRASS_CN_ARGS))
                .merge(FanOut::PerCore)
                .timed()
                .after("brass_assemble"),
        ),
    };

    vec![
        StageSpec::command("brass_input", Brass, Pair, brass("input", ""))
            .fan_out(FanOut::Fixed(2))
            .timed()
            .after("bam_stats"),
        StageSpec::command(
            "brass_cover",
            Brass,
            Pair,
            brass("cover", " -l {threads} -c {threads}"),
        )
        .normalized("brass_cover_per_thread", ThreadPolicy::AllCores)
        .timed()
        .after("bam_stats"),
        StageSpec::command("brass_cover_merge", Brass, Pair, brass("merge", ""))
            .timed()
            .after("brass_cover")
            .after("brass_input"),
        StageSpec::command("brass_group", Brass, Pair, brass("group", ""))
            .timed()
            .after("brass_cover_merge"),
        StageSpec::command("brass_isize", Brass, Pair, brass("isize", ""))
            .timed()
            .after("brass_cover_merge"),
        StageSpec::command("brass_normcn", Brass, Pair, brass("normcn", BRASS_CN_ARGS))
            .timed()
            .after("brass_cover_merge"),
        StageSpec::command("brass_filter", Brass, Pair, brass("filter", BRASS_CN_ARGS))
            .timed()
            .after("brass_group")
            .after("brass_isize")
            .after("brass_normcn")
            .after("ascat_finalise"),
        StageSpec::command("brass_split", Brass, Pair, brass("split", BRASS_CN_ARGS))
            .timed()
            .after("brass_filter"),
        assemble,
        grass,
        StageSpec::command("brass_tabix", Brass, Pair, brass("tabix", ""))
            .timed()
            .after("brass_grass"),
        StageSpec::command(
            "brass_package",
            Packaging,
            Pair,
            package("brass", "sv", "annot.bedpe.gz"),
        )
        .memory("package_results")
        .after("brass_tabix"),
    ]
}

fn snvs(form: ParallelismForm) -> Vec<StageSpec> {
    use Scope::Pair;
    use ToolFamily::*;

    let threaded = |process: &str, per_thread: &str, after: &str| {
        StageSpec::command(
            format!("caveman_{process}"),
            Caveman,
            Pair,
            [caveman(process).as_str(), " -l {threads} -t {threads}"].concat(),
        )
        .normalized(per_thread, ThreadPolicy::AllCores)
        .timed()
        .after(after)
    };
    let per_core = |process: &str, after: &str| {
        StageSpec::command(format!("caveman_{process}"), Caveman, Pair, caveman(process))
            .fan_out(FanOut::PerCore)
            .timed()
            .after(after)
    };
    let merge = |name: &str, process: &str, after: &str, form: ParallelismForm| {
        let spec = StageSpec::command(name, Caveman, Pair, caveman(process))
            .timed()
            .after(after);
        match form {
            ParallelismForm::Threaded => spec,
            ParallelismForm::Workers => spec.merge(FanOut::PerCore),
        }
    };

    let (mstep, estep) = match form {
        ParallelismForm::Threaded => (
            threaded("mstep", "caveman_mstep_per_thread", "caveman_split_concat"),
            threaded("estep", "caveman_estep_per_thread", "caveman_merge"),
        ),
        ParallelismForm::Workers => (
            per_core("mstep", "caveman_split_concat"),
            per_core("estep", "caveman_merge"),
        ),
    };

    let sections = FanOut::PerPartition(Partition::CallingSections);
    vec![
        StageSpec::command("caveman_split", Caveman, Pair, caveman("split"))
            .fan_out(sections)
            .timed()
            .after("caveman_setup"),
        StageSpec::command("caveman_split_concat", Caveman, Pair, caveman("split_concat"))
            .merge(sections)
            .timed()
            .after("caveman_split"),
        mstep,
        merge("caveman_merge", "merge", "caveman_mstep", form),
        estep,
        merge("caveman_merge_results", "merge_results", "caveman_estep", form),
        StageSpec::command("caveman_add_ids", Caveman, Pair, caveman("add_ids"))
            .timed()
            .after("caveman_merge_results"),
        StageSpec::command("caveman_flag", Caveman, Pair, caveman("flag"))
            .timed()
            .after("caveman_add_ids")
            .after("pindel_flag")
            .after("tumour_contamination"),
        StageSpec::command(
            "caveman_package",
            Packaging,
            Pair,
            package("caveman", "snv_mnv", "flagged.muts.vcf.gz"),
        )
        .memory("package_results")
        .after("caveman_flag"),
    ]
}

fn shared_tail() -> Vec<StageSpec> {
    use Scope::Shared;
    use ToolFamily::*;

    vec![
        StageSpec::command(
            "caveman_tbi_clean",
            Caveman,
            Shared,
            "rm -f {outdir}/*/caveman/tmpCaveman/*.tbi",
        )
        .after("caveman_flag"),
        StageSpec::command(
            "workflow_end",
            Workflow,
            Shared,
            "date +%s > {outdir}/end_time",
        )
        .memory("mark_time")
        .after("caveman_tbi_clean")
        .after("ascat_package")
        .after("pindel_package")
        .after("brass_package")
        .after("caveman_package"),
        StageSpec::command(
            "contamination_package",
            Packaging,
            Shared,
            "{wrapper} {base_dir}/bin/packageContam.pl {outdir} {control} {tumours}",
        )
        .literal_memory(HELPER_MEMORY_MB)
        .after("caveman_flag")
        .after("control_contamination"),
        StageSpec::command("contamination_rename", Packaging, Shared, rename("{outdir}"))
            .fan_out(FanOut::Fixed(2))
            .labels(&["verifyBamId.tar.gz", "verifyBamId.tar.gz.md5"])
            .literal_memory(HELPER_MEMORY_MB)
            .side_output()
            .after("contamination_package"),
        StageSpec::command(
            "qc_metrics",
            Qc,
            Shared,
            "{wrapper} {base_dir}/bin/qc_and_metrics.pl {outdir} {control} {tumours} \
             > {outdir}/qc_metrics.json",
        )
        .after("workflow_end")
        .after("genotype_package")
        .after("contamination_package")
        .after("bb_allele_merge"),
        StageSpec::command(
            "vcf_upload",
            Upload,
            Shared,
            "perl {base_dir}/bin/gnos_upload_vcf.pl {upload_args}",
        )
        .memory("upload")
        .when(StageCondition::UploadConfigured)
        .after("qc_metrics"),
        StageSpec::command(
            "upload_archive",
            Upload,
            Shared,
            "mkdir -p {archive_path}; tar -C {outdir} -czf \
             {archive_path}/{workflow}.{date}.{tumour_aliquots}.tar.gz upload",
        )
        .memory("upload")
        .when(StageCondition::UploadConfigured)
        .after("vcf_upload"),
        StageSpec::command(TERMINAL_STAGE, Workflow, Shared, "{cleanup_cmd}")
            .memory("mark_time")
            .after("qc_metrics")
            .after_if_present("upload_archive"),
    ]
}
