// src/types.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// How each sample's BAM is made available to the pipeline.
///
/// Selected once when the configuration is resolved; the builder only ever
/// sees the matching [`SampleAcquisitionStrategy`](crate::acquisition::SampleAcquisitionStrategy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Fetch from a remote repository (GNOS or S3).
    Download,
    /// Link an already-local BAM into the workspace.
    Symlink,
    /// Prepare static test data; no network access.
    TestFixture,
}

impl Default for AcquisitionMode {
    fn default() -> Self {
        AcquisitionMode::Download
    }
}

/// Remote source used by the download strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadSource {
    Gnos,
    S3,
}

impl Default for DownloadSource {
    fn default() -> Self {
        DownloadSource::Gnos
    }
}

/// What the terminal cleanup task removes.
///
/// The policy only changes the cleanup command, never its place in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Nothing is removed.
    #[serde(rename = "none")]
    Keep,
    /// Input BAMs only; results are kept.
    Bams,
    /// The whole workspace once results are uploaded. Without an upload
    /// destination only the input BAMs are removed.
    Full,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        CleanupPolicy::Keep
    }
}

/// Shape used for stages whose tool can parallelise internally.
///
/// - `Threaded`: one memory-normalized multi-threaded task.
/// - `Workers`: N single-threaded tasks merged by a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParallelismForm {
    Threaded,
    Workers,
}

impl Default for ParallelismForm {
    fn default() -> Self {
        ParallelismForm::Threaded
    }
}

impl fmt::Display for ParallelismForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParallelismForm::Threaded => write!(f, "threaded"),
            ParallelismForm::Workers => write!(f, "workers"),
        }
    }
}

/// Which side of a pair a sample sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleRole {
    Control,
    Tumour,
}

impl fmt::Display for SampleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleRole::Control => write!(f, "control"),
            SampleRole::Tumour => write!(f, "tumour"),
        }
    }
}
