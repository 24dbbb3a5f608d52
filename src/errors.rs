// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ManifestError;

#[derive(Error, Debug)]
pub enum LogtapError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("could not connect to {path:?} after {attempts} attempts: {source}")]
    ConnectFailed {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("task registry is no longer running")]
    RegistryClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LogtapError>;
