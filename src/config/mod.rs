// src/config/mod.rs

//! Configuration loading and validation for reconpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate limits, durations and custom profile stage names (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    Delays, Limits, PipelineSection, ProfileSection, RawReconConfig, ReconConfig, Timeouts,
    TimeoutsSection, ToolsSection,
};
pub use validate::parse_duration;
