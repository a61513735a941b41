// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{RawReconConfig, ReconConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawReconConfig`.
///
/// This only performs TOML deserialization; durations and limits are checked
/// by [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawReconConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawReconConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ReconConfig> {
    let raw_config = load_from_path(&path)?;
    let config = ReconConfig::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ReconConfig> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(ReconConfig::default());
    }
    load_and_validate(path)
}
