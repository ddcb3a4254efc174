// src/acquisition/download.rs

use crate::acquisition::{Acquisition, SampleAcquisitionStrategy, required, workspace_path};
use crate::commands::CommandDescriptor;
use crate::config::model::Configuration;
use crate::dag::task::TaskSlot;
use crate::errors::Result;
use crate::samples::SampleDescriptor;
use crate::types::{AcquisitionMode, DownloadSource};

/// Where the download strategy fetches from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote {
    /// GNOS repository; the `.bas` metrics file is regenerated from the
    /// analysis metadata once the BAM is down.
    Gnos { server: String, pem_file: String },
    /// `s3://` prefix holding `<analysis id>/<bam>` and its `.bas`.
    S3 { prefix: String },
}

/// Fetch each BAM from a remote repository into `<analysis id>/<bam>`.
#[derive(Debug, Clone)]
pub struct DownloadStrategy {
    remote: Remote,
    wrapper: String,
}

impl DownloadStrategy {
    pub fn new(remote: Remote, wrapper: impl Into<String>) -> Self {
        Self {
            remote,
            wrapper: wrapper.into(),
        }
    }

    pub fn from_config(cfg: &Configuration) -> Result<Self> {
        let acq = &cfg.acquisition;
        let remote = match acq.source {
            DownloadSource::Gnos => Remote::Gnos {
                server: required(acq.gnos_server.as_ref(), "acquisition.gnos_server")?,
                pem_file: required(acq.pem_file.as_ref(), "acquisition.pem_file")?,
            },
            DownloadSource::S3 => Remote::S3 {
                prefix: required(acq.s3_prefix.as_ref(), "acquisition.s3_prefix")?,
            },
        };
        let wrapper = format!(
            "{}/bin/wrapper.sh {}",
            cfg.workflow.base_dir, cfg.workflow.install_base
        );
        Ok(Self::new(remote, wrapper))
    }

    fn command(&self, sample: &SampleDescriptor) -> String {
        let id = &sample.analysis_id;
        let bam = &sample.bam;
        match &self.remote {
            Remote::Gnos { server, pem_file } => format!(
                "gtdownload -c {pem_file} -v {server}/cghub/data/analysis/download/{id} && \
                 {} xml_to_bas.pl -d {server}/cghub/metadata/analysisFull/{id} -o {id}/{bam}.bas",
                self.wrapper
            ),
            Remote::S3 { prefix } => {
                let prefix = prefix.trim_end_matches('/');
                format!(
                    "mkdir -p {id} && aws s3 cp {prefix}/{id}/{bam} {id}/{bam} && \
                     aws s3 cp {prefix}/{id}/{bam}.bai {id}/{bam}.bai && \
                     aws s3 cp {prefix}/{id}/{bam}.bas {id}/{bam}.bas"
                )
            }
        }
    }
}

impl SampleAcquisitionStrategy for DownloadStrategy {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Download
    }

    fn acquire(&self, sample: &SampleDescriptor, slot: TaskSlot) -> Result<Acquisition> {
        let ready = slot.into_task(CommandDescriptor::new(self.command(sample)));
        Ok(Acquisition {
            ready,
            local_path: workspace_path(sample),
        })
    }
}
