// src/config/mod.rs

//! Run configuration for somaticdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate sample lists and mode-specific settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{
    AcquisitionSection, CleanupSection, Configuration, HostSection, RawConfiguration,
    ReferenceSection, SamplesSection, UploadSection, WorkflowSection,
};
