// src/manifest/mod.rs

//! Turning the manifest file into the set of declared tasks.

pub mod model;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::task::{SourceKind, Task, TaskId};

pub use model::{RawInstance, RawManifest, RawStagingTask};

/// Declared tasks keyed by identifier. Later records win on duplicates.
pub type DeclaredTasks = BTreeMap<TaskId, Task>;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest is empty")]
    Empty,

    #[error("manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parsing knobs decided once at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestOptions {
    /// Keep the job handle so it becomes part of each task identifier.
    pub job_scoped: bool,
}

/// Parse manifest bytes into the declared task set.
pub fn parse_manifest(
    bytes: &[u8],
    options: ManifestOptions,
) -> Result<DeclaredTasks, ManifestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ManifestError::Empty);
    }

    let raw: RawManifest = serde_json::from_slice(bytes)?;
    Ok(declared_tasks(raw, options))
}

/// Filter and convert raw records.
pub fn declared_tasks(raw: RawManifest, options: ManifestOptions) -> DeclaredTasks {
    let job = |id: u64| options.job_scoped.then_some(id);
    let mut tasks = DeclaredTasks::new();

    for instance in raw.instances {
        if instance.warden_container_path.as_os_str().is_empty() || !instance.is_live() {
            continue;
        }
        let task = Task {
            application_id: instance.application_id,
            drain_urls: instance.syslog_drain_urls,
            index: instance.instance_index,
            container_path: instance.warden_container_path,
            job_id: job(instance.warden_job_id),
            source: SourceKind::App,
        };
        tasks.insert(task.identifier(), task);
    }

    for staging in raw.staging_tasks {
        if staging.warden_container_path.as_os_str().is_empty() {
            continue;
        }
        debug!(task_id = %staging.task_id, app_id = %staging.app_id, "staging task declared");
        let task = Task {
            application_id: staging.app_id,
            drain_urls: Vec::new(),
            index: 0,
            container_path: staging.warden_container_path,
            job_id: job(staging.warden_job_id),
            source: SourceKind::Staging,
        };
        tasks.insert(task.identifier(), task);
    }

    tasks
}
