// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{LogtapError, Result};
use crate::types::StreamBackend;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = LogtapError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.agent))
    }
}

/// Check the semantic rules serde cannot express.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_manifest_path(cfg)?;
    validate_backend(cfg.agent.backend)?;
    Ok(())
}

fn validate_manifest_path(cfg: &RawConfigFile) -> Result<()> {
    let manifest = &cfg.agent.manifest;
    if manifest.as_os_str().is_empty() {
        return Err(LogtapError::ConfigError(
            "[agent].manifest must not be empty".to_string(),
        ));
    }
    if manifest.file_name().is_none() {
        return Err(LogtapError::ConfigError(format!(
            "[agent].manifest must name a file (got {:?})",
            manifest
        )));
    }
    Ok(())
}

fn validate_backend(backend: StreamBackend) -> Result<()> {
    if backend == StreamBackend::Socket && !cfg!(unix) {
        return Err(LogtapError::ConfigError(
            "[agent].backend = \"socket\" requires unix domain sockets".to_string(),
        ));
    }
    Ok(())
}
