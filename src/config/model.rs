// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{AcquisitionMode, CleanupPolicy, DownloadSource, ParallelismForm};

/// Top-level run configuration as read from a TOML file.
///
/// ```toml
/// [workflow]
/// date = "20150617"
///
/// [host]
/// cores_addressable = 16
/// mem_host_mb_available = 64000
/// mem_workflow_overhead = 8000
///
/// [memory]
/// pindel_per_thread = 6000
///
/// [samples]
/// control_bam = "control.bam"
/// control_analysis_id = "c0ffee"
/// tumour_bams = ["tumour.bam"]
/// tumour_analysis_ids = ["beef01"]
/// tumour_aliquot_ids = ["aliquot01"]
/// ```
///
/// This is the raw, unvalidated form; convert it with
/// `Configuration::try_from` (see [`crate::config::validate`]).
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfiguration {
    pub workflow: WorkflowSection,
    pub host: HostSection,
    #[serde(default)]
    pub memory: BTreeMap<String, u64>,
    pub reference: ReferenceSection,
    pub samples: SamplesSection,
    #[serde(default)]
    pub acquisition: AcquisitionSection,
    /// Present only when results should be uploaded.
    #[serde(default)]
    pub upload: Option<UploadSection>,
    #[serde(default)]
    pub cleanup: CleanupSection,
}

/// A validated run configuration.
///
/// Immutable once built; threaded explicitly through the allocator, the
/// catalog and the builder.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub workflow: WorkflowSection,
    pub host: HostSection,
    pub memory: BTreeMap<String, u64>,
    pub reference: ReferenceSection,
    pub samples: SamplesSection,
    pub acquisition: AcquisitionSection,
    pub upload: Option<UploadSection>,
    pub cleanup: CleanupSection,
}

impl Configuration {
    pub(crate) fn new_unchecked(raw: RawConfiguration) -> Self {
        Self {
            workflow: raw.workflow,
            host: raw.host,
            memory: raw.memory,
            reference: raw.reference,
            samples: raw.samples,
            acquisition: raw.acquisition,
            upload: raw.upload,
            cleanup: raw.cleanup,
        }
    }

    /// Output directory with the optional prefix applied.
    pub fn output_root(&self) -> String {
        let prefix = self.workflow.output_prefix.as_str();
        if prefix.is_empty() {
            self.workflow.output_dir.clone()
        } else if prefix.ends_with('/') {
            format!("{prefix}{}", self.workflow.output_dir)
        } else {
            format!("{prefix}/{}", self.workflow.output_dir)
        }
    }

    /// Memory budget (MB) for a catalog memory key.
    pub fn memory_mb(&self, key: &str) -> Option<u64> {
        self.memory.get(key).copied()
    }

    pub fn is_test_mode(&self) -> bool {
        self.acquisition.mode == AcquisitionMode::TestFixture
    }
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    /// Date stamp used in result file names (e.g. `20150617`).
    pub date: String,

    #[serde(default = "default_workflow_name")]
    pub name: String,

    /// Directory holding the workflow's own helper scripts.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub output_prefix: String,

    #[serde(default = "default_install_base")]
    pub install_base: String,

    #[serde(default)]
    pub parallelism: ParallelismForm,
}

fn default_workflow_name() -> String {
    "svcp_1-0-0".to_string()
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_output_dir() -> String {
    "outdir".to_string()
}

fn default_install_base() -> String {
    "/opt/wtsi-cgp".to_string()
}

/// `[host]` section: the budget every normalized stage must fit in.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HostSection {
    pub cores_addressable: u32,
    pub mem_host_mb_available: u64,
    pub mem_workflow_overhead: u64,
}

/// `[reference]` section, including the genome partitioning descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceSection {
    pub species: String,
    pub assembly: String,
    pub seq_type: String,
    pub gender: String,
    pub ref_exclude: String,
    pub ref_from: String,
    pub bb_from: String,
    pub contam_down_samp_one_in: u32,

    /// Chromosomes processed one task each (indel calling).
    #[serde(default = "default_chromosomes")]
    pub chromosomes: Vec<String>,

    /// Number of genome sections the SNV caller splits into.
    #[serde(default = "default_calling_sections")]
    pub calling_sections: u32,

    /// Chromosomes with allele-count loci for the battenberg side pipeline.
    #[serde(default = "default_allele_count_chromosomes")]
    pub allele_count_chromosomes: Vec<String>,
}

pub fn default_chromosomes() -> Vec<String> {
    let mut chrs: Vec<String> = (1..=22).map(|c| c.to_string()).collect();
    chrs.push("X".to_string());
    chrs.push("Y".to_string());
    chrs
}

pub fn default_calling_sections() -> u32 {
    86
}

pub fn default_allele_count_chromosomes() -> Vec<String> {
    let mut chrs: Vec<String> = (1..=22).map(|c| c.to_string()).collect();
    chrs.push("X".to_string());
    chrs
}

/// `[samples]` section: parallel per-tumour lists plus the shared control.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplesSection {
    pub control_bam: String,
    pub control_analysis_id: String,
    pub tumour_bams: Vec<String>,
    pub tumour_analysis_ids: Vec<String>,
    pub tumour_aliquot_ids: Vec<String>,
}

/// `[acquisition]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AcquisitionSection {
    #[serde(default)]
    pub mode: AcquisitionMode,

    #[serde(default)]
    pub source: DownloadSource,

    #[serde(default)]
    pub gnos_server: Option<String>,

    #[serde(default)]
    pub pem_file: Option<String>,

    /// `s3://bucket/path`; each BAM is fetched from `<prefix>/<analysis id>/<bam>`.
    #[serde(default)]
    pub s3_prefix: Option<String>,

    /// Directory holding already-local BAMs (symlink mode).
    #[serde(default)]
    pub source_dir: Option<String>,

    /// Directory holding the static test data (test-fixture mode).
    #[serde(default)]
    pub fixture_dir: Option<String>,
}

/// `[upload]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSection {
    pub server: String,

    #[serde(default)]
    pub pem_file: Option<String>,

    #[serde(default = "default_archive_path")]
    pub archive_path: String,

    #[serde(default)]
    pub test: bool,

    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub study_refname_override: Option<String>,

    #[serde(default)]
    pub analysis_center_override: Option<String>,
}

fn default_archive_path() -> String {
    "upload_archive".to_string()
}

/// `[cleanup]` section.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct CleanupSection {
    #[serde(default)]
    pub policy: CleanupPolicy,
}
