#![allow(dead_code)]

use std::collections::BTreeMap;

use somaticdag::catalog::StageCatalog;
use somaticdag::config::{
    AcquisitionSection, CleanupSection, Configuration, HostSection, RawConfiguration,
    ReferenceSection, SamplesSection, UploadSection, WorkflowSection,
};
use somaticdag::types::{AcquisitionMode, CleanupPolicy, DownloadSource, ParallelismForm};

/// Memory given to every stage key unless overridden.
pub const DEFAULT_STAGE_MEMORY_MB: u64 = 2000;

/// Builder for `Configuration` to simplify test setup.
///
/// Starts from a one-tumour GNOS download run on a 16-core / 64 GB host with
/// every catalog memory key filled in.
pub struct ConfigurationBuilder {
    config: RawConfiguration,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            config: RawConfiguration {
                workflow: WorkflowSection {
                    date: "20150617".to_string(),
                    name: "svcp_1-0-0".to_string(),
                    base_dir: "/workflow".to_string(),
                    output_dir: "outdir".to_string(),
                    output_prefix: "./".to_string(),
                    install_base: "/opt/wtsi-cgp".to_string(),
                    parallelism: ParallelismForm::Threaded,
                },
                host: HostSection {
                    cores_addressable: 16,
                    mem_host_mb_available: 64000,
                    mem_workflow_overhead: 8000,
                },
                memory: BTreeMap::new(),
                reference: ReferenceSection {
                    species: "human".to_string(),
                    assembly: "GRCh37d5".to_string(),
                    seq_type: "WGS".to_string(),
                    gender: "L".to_string(),
                    ref_exclude: "MT,GL%,hs37d5,NC_007605".to_string(),
                    ref_from: "https://example.org/ref/GRCh37d5.tar.gz".to_string(),
                    bb_from: "https://example.org/ref/battenberg.tar.gz".to_string(),
                    contam_down_samp_one_in: 25,
                    chromosomes: somaticdag::config::model::default_chromosomes(),
                    calling_sections: somaticdag::config::model::default_calling_sections(),
                    allele_count_chromosomes:
                        somaticdag::config::model::default_allele_count_chromosomes(),
                },
                samples: SamplesSection {
                    control_bam: "control.bam".to_string(),
                    control_analysis_id: "ctl-0".to_string(),
                    tumour_bams: Vec::new(),
                    tumour_analysis_ids: Vec::new(),
                    tumour_aliquot_ids: Vec::new(),
                },
                acquisition: AcquisitionSection {
                    mode: AcquisitionMode::Download,
                    source: DownloadSource::Gnos,
                    gnos_server: Some("https://gtrepo-ebi.annailabs.com".to_string()),
                    pem_file: Some("/keys/gnos.pem".to_string()),
                    s3_prefix: None,
                    source_dir: None,
                    fixture_dir: None,
                },
                upload: None,
                cleanup: CleanupSection::default(),
            },
        };
        builder.fill_memory(DEFAULT_STAGE_MEMORY_MB);
        builder.with_tumours(1)
    }

    /// Set every memory key either catalog form reads to `mb`.
    pub fn fill_memory(&mut self, mb: u64) {
        for form in [ParallelismForm::Threaded, ParallelismForm::Workers] {
            for key in StageCatalog::somatic(form).memory_keys() {
                self.config.memory.insert(key, mb);
            }
        }
    }

    pub fn with_tumours(mut self, n: usize) -> Self {
        let samples = &mut self.config.samples;
        samples.tumour_bams = (0..n).map(|i| format!("tumour{i}.bam")).collect();
        samples.tumour_analysis_ids = (0..n).map(|i| format!("tum-{i}")).collect();
        samples.tumour_aliquot_ids = (0..n).map(|i| format!("aliquot-{i}")).collect();
        self
    }

    pub fn with_aliquot_ids(mut self, ids: &[&str]) -> Self {
        self.config.samples.tumour_aliquot_ids = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_host(mut self, cores: u32, mem_mb: u64, overhead_mb: u64) -> Self {
        self.config.host = HostSection {
            cores_addressable: cores,
            mem_host_mb_available: mem_mb,
            mem_workflow_overhead: overhead_mb,
        };
        self
    }

    pub fn with_memory(mut self, key: &str, mb: u64) -> Self {
        self.config.memory.insert(key.to_string(), mb);
        self
    }

    pub fn without_memory(mut self, key: &str) -> Self {
        self.config.memory.remove(key);
        self
    }

    pub fn with_parallelism(mut self, form: ParallelismForm) -> Self {
        self.config.workflow.parallelism = form;
        self
    }

    pub fn with_test_fixtures(mut self, dir: &str) -> Self {
        self.config.acquisition.mode = AcquisitionMode::TestFixture;
        self.config.acquisition.fixture_dir = Some(dir.to_string());
        self
    }

    pub fn with_symlinks(mut self, dir: &str) -> Self {
        self.config.acquisition.mode = AcquisitionMode::Symlink;
        self.config.acquisition.source_dir = Some(dir.to_string());
        self
    }

    pub fn with_s3(mut self, prefix: &str) -> Self {
        self.config.acquisition.source = DownloadSource::S3;
        self.config.acquisition.s3_prefix = Some(prefix.to_string());
        self
    }

    pub fn with_upload(mut self, server: &str) -> Self {
        self.config.upload = Some(UploadSection {
            server: server.to_string(),
            pem_file: None,
            archive_path: "upload_archive".to_string(),
            test: false,
            skip: false,
            study_refname_override: None,
            analysis_center_override: None,
        });
        self
    }

    pub fn with_cleanup(mut self, policy: CleanupPolicy) -> Self {
        self.config.cleanup.policy = policy;
        self
    }

    pub fn with_calling_sections(mut self, n: u32) -> Self {
        self.config.reference.calling_sections = n;
        self
    }

    /// The raw form, for tests that exercise validation themselves.
    pub fn raw(self) -> RawConfiguration {
        self.config
    }

    pub fn build(self) -> Configuration {
        Configuration::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
