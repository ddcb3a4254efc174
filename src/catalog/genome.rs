// src/catalog/genome.rs

//! Reference-genome partitioning.
//!
//! Fan-out counts that depend on how the genome is cut up (chromosomes,
//! calling sections) come from here rather than from literals, so a stage and
//! the merge that waits on it always agree on the count.

use std::fmt;

use serde::Serialize;

use crate::config::model::{
    ReferenceSection, default_allele_count_chromosomes, default_calling_sections,
    default_chromosomes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// 1..22, X, Y for GRCh37.
    Chromosomes,
    /// Sections the SNV caller splits the genome into.
    CallingSections,
    /// Chromosomes with allele-count loci (1..22, X).
    AlleleCountChromosomes,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Chromosomes => write!(f, "chromosome"),
            Partition::CallingSections => write!(f, "calling-section"),
            Partition::AlleleCountChromosomes => write!(f, "allele-count-chromosome"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeLayout {
    chromosomes: Vec<String>,
    calling_sections: u32,
    allele_count_chromosomes: Vec<String>,
}

impl GenomeLayout {
    pub fn new(
        chromosomes: Vec<String>,
        calling_sections: u32,
        allele_count_chromosomes: Vec<String>,
    ) -> Self {
        Self {
            chromosomes,
            calling_sections,
            allele_count_chromosomes,
        }
    }

    /// GRCh37 as used by the pan-cancer somatic workflow: 24 / 86 / 23.
    pub fn grch37() -> Self {
        Self::new(
            default_chromosomes(),
            default_calling_sections(),
            default_allele_count_chromosomes(),
        )
    }

    pub fn from_reference(reference: &ReferenceSection) -> Self {
        Self::new(
            reference.chromosomes.clone(),
            reference.calling_sections,
            reference.allele_count_chromosomes.clone(),
        )
    }

    pub fn count(&self, partition: Partition) -> u32 {
        match partition {
            Partition::Chromosomes => self.chromosomes.len() as u32,
            Partition::CallingSections => self.calling_sections,
            Partition::AlleleCountChromosomes => self.allele_count_chromosomes.len() as u32,
        }
    }

    /// Label for 1-based instance `index` of `partition`.
    pub fn label(&self, partition: Partition, index: u32) -> String {
        let named = match partition {
            Partition::Chromosomes => &self.chromosomes,
            Partition::AlleleCountChromosomes => &self.allele_count_chromosomes,
            Partition::CallingSections => return index.to_string(),
        };
        named
            .get(index as usize - 1)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }
}

impl Default for GenomeLayout {
    fn default() -> Self {
        Self::grch37()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grch37_partition_counts() {
        let layout = GenomeLayout::grch37();
        assert_eq!(layout.count(Partition::Chromosomes), 24);
        assert_eq!(layout.count(Partition::CallingSections), 86);
        assert_eq!(layout.count(Partition::AlleleCountChromosomes), 23);
    }

    #[test]
    fn chromosome_labels_are_ordinal() {
        let layout = GenomeLayout::grch37();
        assert_eq!(layout.label(Partition::Chromosomes, 1), "1");
        assert_eq!(layout.label(Partition::Chromosomes, 23), "X");
        assert_eq!(layout.label(Partition::Chromosomes, 24), "Y");
        assert_eq!(layout.label(Partition::CallingSections, 86), "86");
    }
}
