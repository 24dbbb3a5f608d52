// src/config/mod.rs

//! Configuration loading and validation for logtap.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants serde cannot check (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use crate::types::StreamBackend;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{AgentSection, ConfigFile, DEFAULT_MANIFEST_PATH, RawConfigFile};
pub use validate::validate_config;
