// src/config/validate.rs

use crate::config::model::{Configuration, RawConfiguration};
use crate::errors::{PlanError, Result};
use crate::samples::resolve_sample_pairs;
use crate::types::{AcquisitionMode, DownloadSource};

impl TryFrom<RawConfiguration> for Configuration {
    type Error = crate::errors::PlanError;

    fn try_from(raw: RawConfiguration) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(Configuration::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfiguration) -> Result<()> {
    validate_workflow(cfg)?;
    validate_host(cfg)?;
    validate_reference(cfg)?;
    resolve_sample_pairs(&cfg.samples)?;
    validate_acquisition(cfg)?;
    validate_upload(cfg)?;
    Ok(())
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PlanError::config(field, "must not be empty"));
    }
    Ok(())
}

fn require_opt(field: &str, value: Option<&String>, reason: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(PlanError::config(field, reason)),
    }
}

fn validate_workflow(cfg: &RawConfiguration) -> Result<()> {
    require("workflow.date", &cfg.workflow.date)?;
    require("workflow.name", &cfg.workflow.name)?;
    require("workflow.output_dir", &cfg.workflow.output_dir)?;
    Ok(())
}

fn validate_host(cfg: &RawConfiguration) -> Result<()> {
    // Memory headroom is checked per stage by the allocator, which can name
    // the stage that does not fit.
    if cfg.host.cores_addressable == 0 {
        return Err(PlanError::config(
            "host.cores_addressable",
            "must be >= 1 (got 0)",
        ));
    }
    if cfg.host.mem_host_mb_available == 0 {
        return Err(PlanError::config(
            "host.mem_host_mb_available",
            "must be >= 1 (got 0)",
        ));
    }
    Ok(())
}

fn validate_reference(cfg: &RawConfiguration) -> Result<()> {
    let reference = &cfg.reference;
    require("reference.species", &reference.species)?;
    require("reference.assembly", &reference.assembly)?;
    require("reference.ref_from", &reference.ref_from)?;
    require("reference.bb_from", &reference.bb_from)?;

    match reference.seq_type.as_str() {
        "WGS" | "WXS" => {}
        other => {
            return Err(PlanError::config(
                "reference.seq_type",
                format!("unsupported sequencing type '{other}' (expected \"WGS\" or \"WXS\")"),
            ));
        }
    }

    match reference.gender.as_str() {
        "XX" | "XY" | "L" => {}
        other => {
            return Err(PlanError::config(
                "reference.gender",
                format!("unsupported gender '{other}' (expected \"XX\", \"XY\" or \"L\")"),
            ));
        }
    }

    if reference.contam_down_samp_one_in == 0 {
        return Err(PlanError::config(
            "reference.contam_down_samp_one_in",
            "must be >= 1 (got 0)",
        ));
    }
    if reference.chromosomes.is_empty() {
        return Err(PlanError::config(
            "reference.chromosomes",
            "must list at least one chromosome",
        ));
    }
    if reference.allele_count_chromosomes.is_empty() {
        return Err(PlanError::config(
            "reference.allele_count_chromosomes",
            "must list at least one chromosome",
        ));
    }
    if reference.calling_sections == 0 {
        return Err(PlanError::config(
            "reference.calling_sections",
            "must be >= 1 (got 0)",
        ));
    }
    Ok(())
}

fn validate_acquisition(cfg: &RawConfiguration) -> Result<()> {
    let acq = &cfg.acquisition;
    match acq.mode {
        AcquisitionMode::Download => match acq.source {
            DownloadSource::Gnos => {
                require_opt(
                    "acquisition.gnos_server",
                    acq.gnos_server.as_ref(),
                    "required when downloading from GNOS",
                )?;
                require_opt(
                    "acquisition.pem_file",
                    acq.pem_file.as_ref(),
                    "required when downloading from GNOS",
                )?;
            }
            DownloadSource::S3 => {
                require_opt(
                    "acquisition.s3_prefix",
                    acq.s3_prefix.as_ref(),
                    "required when downloading from S3",
                )?;
            }
        },
        AcquisitionMode::Symlink => {
            require_opt(
                "acquisition.source_dir",
                acq.source_dir.as_ref(),
                "required in symlink mode",
            )?;
        }
        AcquisitionMode::TestFixture => {
            require_opt(
                "acquisition.fixture_dir",
                acq.fixture_dir.as_ref(),
                "required in test_fixture mode",
            )?;
        }
    }
    Ok(())
}

fn validate_upload(cfg: &RawConfiguration) -> Result<()> {
    let Some(upload) = cfg.upload.as_ref() else {
        return Ok(());
    };
    require("upload.server", &upload.server)?;
    require("upload.archive_path", &upload.archive_path)?;
    if !upload.skip && upload.pem_file.is_none() && cfg.acquisition.pem_file.is_none() {
        return Err(PlanError::config(
            "upload.pem_file",
            "required unless upload.skip is set or acquisition.pem_file is given",
        ));
    }
    Ok(())
}
