// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Configuration, RawConfiguration};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfiguration`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfiguration> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

/// Deserialize a configuration from TOML text.
pub fn load_from_str(contents: &str) -> Result<RawConfiguration> {
    let config: RawConfiguration = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` default functions).
/// - Checks for:
///   - parallel sample lists of different lengths,
///   - required fields left empty,
///   - acquisition/upload settings missing for the selected mode.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Configuration> {
    let raw_config = load_from_path(&path)?;
    let config = Configuration::try_from(raw_config)?;
    Ok(config)
}

/// Default configuration path: `Somatic.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Somatic.toml")
}
