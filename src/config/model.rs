// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::StreamBackend;

/// Default location of the manifest on a DEA-style host.
pub const DEFAULT_MANIFEST_PATH: &str = "/var/vcap/data/dea_next/db/instances.json";

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [agent]
/// manifest = "/var/vcap/data/dea_next/db/instances.json"
/// backend = "socket"
/// poll_interval_ms = 0
/// metrics_interval_ms = 60000
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub agent: AgentSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub agent: AgentSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(agent: AgentSection) -> Self {
        Self { agent }
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// Manifest file listing the tasks on this host.
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// How task streams are opened.
    #[serde(default)]
    pub backend: StreamBackend,

    /// Periodic manifest re-read on top of change notifications. `0` disables.
    #[serde(default)]
    pub poll_interval_ms: u64,

    /// Periodic stream metrics log. `0` disables.
    #[serde(default = "default_metrics_interval_ms")]
    pub metrics_interval_ms: u64,
}

fn default_manifest() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST_PATH)
}

fn default_metrics_interval_ms() -> u64 {
    60_000
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            backend: StreamBackend::default(),
            poll_interval_ms: 0,
            metrics_interval_ms: default_metrics_interval_ms(),
        }
    }
}

impl AgentSection {
    pub fn poll_interval(&self) -> Option<Duration> {
        non_zero_millis(self.poll_interval_ms)
    }

    pub fn metrics_interval(&self) -> Option<Duration> {
        non_zero_millis(self.metrics_interval_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
