// src/commands.rs

//! Command templates and their rendering.
//!
//! Templates use `{name}` placeholders. Global values come from the
//! configuration; instance values (index, threads, sample paths) are supplied
//! by the builder for each task.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::catalog::Scope;
use crate::config::model::{Configuration, UploadSection};
use crate::errors::{PlanError, Result};
use crate::types::CleanupPolicy;

/// Opaque, fully rendered command line for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandDescriptor(String);

impl CommandDescriptor {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self(cmd.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Placeholders bound from the configuration, or from acquired sample paths
/// (`control`, `tumours`, `tumour_bam_args`).
pub const GLOBAL_PLACEHOLDERS: &[&str] = &[
    "outdir",
    "timedir",
    "bbdir",
    "base_dir",
    "install",
    "wrapper",
    "ref",
    "genome_fa",
    "species",
    "assembly",
    "seq_type",
    "seq_protocol",
    "gender_args",
    "ref_exclude",
    "contam_one_in",
    "workflow",
    "date",
    "ref_from",
    "bb_from",
    "cleanup_cmd",
    "upload_args",
    "archive_path",
    "tumour_aliquots",
    "control",
    "tumours",
    "tumour_bam_args",
];

/// Placeholders bound for every task.
pub const INSTANCE_PLACEHOLDERS: &[&str] = &["index", "label", "threads", "memory", "owner"];

pub const PAIR_PLACEHOLDERS: &[&str] = &["pair", "tumour", "tumour_id", "tumour_aliquot"];

pub const SAMPLE_PLACEHOLDERS: &[&str] = &["sample", "sample_id", "sample_role"];

/// Whether `name` is bound for stages of `scope`.
pub fn is_known_placeholder(scope: Scope, name: &str) -> bool {
    let scoped: &[&str] = match scope {
        Scope::Shared => &[],
        Scope::Control | Scope::PerSample => SAMPLE_PLACEHOLDERS,
        Scope::Pair => PAIR_PLACEHOLDERS,
    };
    GLOBAL_PLACEHOLDERS.contains(&name)
        || INSTANCE_PLACEHOLDERS.contains(&name)
        || scoped.contains(&name)
}

/// Matches `{name}` placeholders.
pub fn placeholder_pattern() -> Result<Regex> {
    Regex::new(r"\{([a-z_]+)\}")
        .map_err(|e| PlanError::Other(anyhow::anyhow!("invalid placeholder pattern: {e}")))
}

/// Placeholder names in `template`, in order of appearance.
pub fn placeholders(pattern: &Regex, template: &str) -> Vec<String> {
    pattern
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Values bound for one task, layered over the renderer's globals.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: BTreeMap<&'static str, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Renders catalog templates into [`CommandDescriptor`]s.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    globals: BTreeMap<&'static str, String>,
    pattern: Regex,
}

impl CommandRenderer {
    pub fn new(cfg: &Configuration) -> Result<Self> {
        let mut globals = BTreeMap::new();
        let outdir = cfg.output_root();
        let reference = &cfg.reference;
        let install = cfg.workflow.install_base.clone();
        let base_dir = cfg.workflow.base_dir.clone();
        let refdir = format!("{outdir}/reference_files");

        globals.insert("timedir", format!("{outdir}/timings"));
        globals.insert("bbdir", format!("{outdir}/bbCounts"));
        globals.insert("genome_fa", format!("{refdir}/genome.fa"));
        globals.insert("ref", refdir);
        globals.insert("wrapper", format!("{base_dir}/bin/wrapper.sh {install}"));
        globals.insert("install", install);
        globals.insert("base_dir", base_dir);
        globals.insert("species", reference.species.clone());
        globals.insert("assembly", reference.assembly.clone());
        globals.insert("seq_type", reference.seq_type.clone());
        globals.insert("seq_protocol", seq_protocol(&reference.seq_type).to_string());
        globals.insert("gender_args", gender_args(&reference.gender));
        globals.insert("ref_exclude", reference.ref_exclude.clone());
        globals.insert("contam_one_in", reference.contam_down_samp_one_in.to_string());
        globals.insert("workflow", cfg.workflow.name.clone());
        globals.insert("date", cfg.workflow.date.clone());
        globals.insert("ref_from", reference.ref_from.clone());
        globals.insert("bb_from", reference.bb_from.clone());
        globals.insert(
            "cleanup_cmd",
            cleanup_command(cfg.cleanup.policy, cfg.upload.is_some(), &outdir),
        );
        globals.insert(
            "tumour_aliquots",
            cfg.samples.tumour_aliquot_ids.join(" "),
        );
        if let Some(upload) = &cfg.upload {
            globals.insert("archive_path", upload.archive_path.clone());
            globals.insert("upload_args", upload_args(cfg, upload, &outdir));
        } else {
            globals.insert("archive_path", String::new());
            globals.insert("upload_args", String::new());
        }
        globals.insert("outdir", outdir);

        Ok(Self {
            globals,
            pattern: placeholder_pattern()?,
        })
    }

    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals.get(name).map(String::as_str)
    }

    /// Substitute every placeholder in `template`.
    ///
    /// Instance bindings shadow globals. A placeholder with no value is a
    /// `CatalogError` against `stage`. Timed stages are wrapped so their
    /// resource usage lands in `{timedir}/<owner>_<stage>_<index>`.
    pub fn render(
        &self,
        stage: &str,
        template: &str,
        timed: bool,
        bindings: &Bindings,
    ) -> Result<CommandDescriptor> {
        let mut missing = None;
        let rendered = self.pattern.replace_all(template, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match bindings.get(name).or_else(|| self.global(name)) {
                Some(value) => value.to_string(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });
        if let Some(name) = missing {
            return Err(PlanError::catalog(
                stage,
                format!("placeholder {{{name}}} has no value"),
            ));
        }

        let mut cmd = rendered.into_owned();
        if timed {
            let owner = bindings.get("owner").unwrap_or("shared");
            let index = bindings.get("index").unwrap_or("1");
            let timedir = self.global("timedir").unwrap_or("timings");
            cmd = format!("/usr/bin/time --format=\"Wall_s %e\\nUser_s %U\\nSystem_s %S\\nMax_kb %M\" --output={timedir}/{owner}_{stage}_{index} {cmd}");
        }
        Ok(CommandDescriptor(cmd))
    }
}

fn seq_protocol(seq_type: &str) -> &'static str {
    match seq_type {
        "WXS" => "exome",
        _ => "genomic",
    }
}

fn gender_args(gender: &str) -> String {
    match gender {
        "L" => "-l Y:2654896-2655740 -g L".to_string(),
        other => format!("-g {other}"),
    }
}

const REMOVE_INPUT_BAMS: &str = "rm -f ./*/*.bam";

/// Results are only ever deleted after they have been uploaded.
fn cleanup_command(policy: CleanupPolicy, upload: bool, outdir: &str) -> String {
    match policy {
        CleanupPolicy::Keep => "true".to_string(),
        CleanupPolicy::Full if upload => format!("{REMOVE_INPUT_BAMS}; rm -rf {outdir}"),
        CleanupPolicy::Bams | CleanupPolicy::Full => REMOVE_INPUT_BAMS.to_string(),
    }
}

/// Arguments for the VCF upload script: metadata URLs for every sample and
/// the per-aliquot result archives.
fn upload_args(cfg: &Configuration, upload: &UploadSection, outdir: &str) -> String {
    let metadata_server = cfg
        .acquisition
        .gnos_server
        .as_deref()
        .unwrap_or(upload.server.as_str());
    let metadata_urls: Vec<String> = std::iter::once(&cfg.samples.control_analysis_id)
        .chain(&cfg.samples.tumour_analysis_ids)
        .map(|id| format!("{metadata_server}/cghub/metadata/analysisFull/{id}"))
        .collect();

    let mut vcfs = Vec::new();
    let mut tars = Vec::new();
    for aliquot in &cfg.samples.tumour_aliquot_ids {
        for kind in ["snv_mnv", "cnv", "sv", "indel"] {
            let stem = format!(
                "{outdir}/{aliquot}.{}.{}.somatic.{kind}",
                cfg.workflow.name, cfg.workflow.date
            );
            vcfs.push(format!("{stem}.vcf.gz"));
            tars.push(format!("{stem}.tar.gz"));
        }
    }
    let md5 = |files: &[String]| -> String {
        files
            .iter()
            .map(|f| format!("{f}.md5"))
            .collect::<Vec<_>>()
            .join(",")
    };
    let tbis: Vec<String> = vcfs.iter().map(|v| format!("{v}.tbi")).collect();

    let mut args = vec![
        format!("--metadata-urls {}", metadata_urls.join(",")),
        format!("--vcfs {}", vcfs.join(",")),
        format!("--vcf-md5sum-files {}", md5(&vcfs)),
        format!("--vcf-idxs {}", tbis.join(",")),
        format!("--vcf-idx-md5sum-files {}", md5(&tbis)),
        format!("--tarballs {}", tars.join(",")),
        format!("--tarball-md5sum-files {}", md5(&tars)),
        format!("--outdir {outdir}/upload"),
        format!("--upload-url {}", upload.server),
        format!("--qc-metrics-json {outdir}/qc_metrics.json"),
        format!("--timing-metrics-json {outdir}/process_metrics.json"),
        format!("--workflow-name {}", cfg.workflow.name),
    ];
    if let Some(pem) = upload.pem_file.as_ref().or(cfg.acquisition.pem_file.as_ref()) {
        args.push(format!("--key {pem}"));
    }
    if let Some(study) = &upload.study_refname_override {
        args.push(format!("--study-refname-override {study}"));
    }
    if let Some(center) = &upload.analysis_center_override {
        args.push(format!("--analysis-center-override {center}"));
    }
    if upload.test {
        args.push("--test".to_string());
    }
    if upload.skip {
        args.push("--skip-upload".to_string());
    }
    args.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_placeholders_in_order() {
        let pattern = placeholder_pattern().unwrap();
        assert_eq!(
            placeholders(&pattern, "{wrapper} pindel.pl -i {index} -o {outdir}/{pair}"),
            vec!["wrapper", "index", "outdir", "pair"]
        );
    }

    #[test]
    fn pair_placeholders_are_unknown_for_shared_stages() {
        assert!(is_known_placeholder(Scope::Pair, "tumour"));
        assert!(!is_known_placeholder(Scope::Shared, "tumour"));
        assert!(is_known_placeholder(Scope::Shared, "tumours"));
        assert!(!is_known_placeholder(Scope::PerSample, "nonsense"));
    }

    #[test]
    fn gender_l_adds_locus_check() {
        assert!(gender_args("L").starts_with("-l Y:"));
        assert_eq!(gender_args("XX"), "-g XX");
    }

    #[test]
    fn full_cleanup_depends_on_upload() {
        assert_eq!(cleanup_command(CleanupPolicy::Full, false, "out"), "rm -f ./*/*.bam");
        assert_eq!(
            cleanup_command(CleanupPolicy::Full, true, "out"),
            "rm -f ./*/*.bam; rm -rf out"
        );
        assert_eq!(cleanup_command(CleanupPolicy::Keep, true, "out"), "true");
        assert_eq!(cleanup_command(CleanupPolicy::Bams, true, "out"), "rm -f ./*/*.bam");
    }
}
