// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! The three construction failures (`ConfigError`, `ResourceError`,
//! `CatalogError`) are fatal: the builder returns one of them instead of a
//! partial graph.

use thiserror::Error;

use crate::resources::ResourceShortfall;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Configuration error in `{field}`: {reason}")]
    ConfigError { field: String, reason: String },

    #[error("Resource error for stage '{stage}': {shortfall}")]
    ResourceError {
        stage: String,
        shortfall: ResourceShortfall,
    },

    #[error("Catalog error at stage '{stage}': {reason}")]
    CatalogError { stage: String, reason: String },

    #[error("Cycle detected in task graph: {0}")]
    GraphCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlanError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanError::ConfigError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn catalog(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanError::CatalogError {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PlanError>;
