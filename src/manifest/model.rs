// src/manifest/model.rs

//! Raw JSON shape of the workload manifest.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level manifest document. Both lists are optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawManifest {
    #[serde(default)]
    pub instances: Vec<RawInstance>,

    #[serde(default)]
    pub staging_tasks: Vec<RawStagingTask>,
}

/// One application instance record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInstance {
    #[serde(default)]
    pub state: String,

    #[serde(alias = "droplet_id", default)]
    pub application_id: String,

    #[serde(alias = "dir", default)]
    pub warden_container_path: PathBuf,

    #[serde(default)]
    pub instance_index: u64,

    #[serde(default)]
    pub warden_job_id: u64,

    #[serde(alias = "drain_urls", default)]
    pub syslog_drain_urls: Vec<String>,
}

impl RawInstance {
    /// Only running or starting instances produce output worth following.
    pub fn is_live(&self) -> bool {
        self.state == "RUNNING" || self.state == "STARTING"
    }
}

/// One staging task record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStagingTask {
    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub task_id: String,

    #[serde(alias = "dir", default)]
    pub warden_container_path: PathBuf,

    #[serde(default)]
    pub warden_job_id: u64,
}
