// src/samples.rs

//! Sample descriptors and tumour/control pairing.

use serde::Serialize;

use crate::config::model::SamplesSection;
use crate::errors::{PlanError, Result};
use crate::types::SampleRole;

/// One input sample as described by the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleDescriptor {
    /// 0 for the control, 1..=n for tumours (configuration order).
    pub ordinal: usize,
    pub role: SampleRole,
    pub analysis_id: String,
    /// Raw BAM descriptor (file name as listed in the configuration).
    pub bam: String,
    /// Only tumours carry an aliquot id.
    pub aliquot_id: Option<String>,
}

/// One tumour matched against the shared control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePair {
    /// 0-based pair index; also the per-pair output subdirectory.
    pub index: usize,
    pub tumour: SampleDescriptor,
    pub control: SampleDescriptor,
}

/// Decode the parallel per-tumour lists into sample pairs.
///
/// Fails with a `ConfigError` naming the offending list when the lists
/// differ in length, or when no tumour is listed.
pub fn resolve_sample_pairs(samples: &SamplesSection) -> Result<Vec<SamplePair>> {
    let tumours = samples.tumour_bams.len();
    if tumours == 0 {
        return Err(PlanError::config(
            "samples.tumour_bams",
            "must list at least one tumour BAM",
        ));
    }
    if samples.tumour_analysis_ids.len() != tumours {
        return Err(PlanError::config(
            "samples.tumour_analysis_ids",
            format!(
                "decodes to {} entries but samples.tumour_bams has {}",
                samples.tumour_analysis_ids.len(),
                tumours
            ),
        ));
    }
    if samples.tumour_aliquot_ids.len() != tumours {
        return Err(PlanError::config(
            "samples.tumour_aliquot_ids",
            format!(
                "decodes to {} entries but samples.tumour_bams has {}",
                samples.tumour_aliquot_ids.len(),
                tumours
            ),
        ));
    }

    let control = control_descriptor(samples);
    let pairs = samples
        .tumour_bams
        .iter()
        .zip(&samples.tumour_analysis_ids)
        .zip(&samples.tumour_aliquot_ids)
        .enumerate()
        .map(|(index, ((bam, analysis_id), aliquot_id))| SamplePair {
            index,
            tumour: SampleDescriptor {
                ordinal: index + 1,
                role: SampleRole::Tumour,
                analysis_id: analysis_id.clone(),
                bam: bam.clone(),
                aliquot_id: Some(aliquot_id.clone()),
            },
            control: control.clone(),
        })
        .collect();

    Ok(pairs)
}

pub fn control_descriptor(samples: &SamplesSection) -> SampleDescriptor {
    SampleDescriptor {
        ordinal: 0,
        role: SampleRole::Control,
        analysis_id: samples.control_analysis_id.clone(),
        bam: samples.control_bam.clone(),
        aliquot_id: None,
    }
}

/// All samples in ordinal order: the control first, then each pair's tumour.
pub fn all_samples(pairs: &[SamplePair]) -> Vec<SampleDescriptor> {
    let mut out = Vec::with_capacity(pairs.len() + 1);
    if let Some(first) = pairs.first() {
        out.push(first.control.clone());
    }
    out.extend(pairs.iter().map(|p| p.tumour.clone()));
    out
}
