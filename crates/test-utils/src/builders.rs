#![allow(dead_code)]

use std::path::{Path, PathBuf};

use logtap::manifest::DeclaredTasks;
use logtap::task::{SourceKind, Task};
use serde_json::{json, Value};

/// Builder for `Task` to simplify test setup.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    /// Application instance in `container`, index 0, no job handle.
    pub fn app(app_id: &str, container: impl Into<PathBuf>) -> Self {
        Self {
            task: Task {
                application_id: app_id.to_string(),
                drain_urls: vec![],
                index: 0,
                container_path: container.into(),
                job_id: None,
                source: SourceKind::App,
            },
        }
    }

    /// Staging task in `container`, no job handle.
    pub fn staging(app_id: &str, container: impl Into<PathBuf>) -> Self {
        Self {
            task: Task {
                application_id: app_id.to_string(),
                drain_urls: vec![],
                index: 0,
                container_path: container.into(),
                job_id: None,
                source: SourceKind::Staging,
            },
        }
    }

    pub fn index(mut self, index: u64) -> Self {
        self.task.index = index;
        self
    }

    pub fn job(mut self, job_id: u64) -> Self {
        self.task.job_id = Some(job_id);
        self
    }

    pub fn drain(mut self, url: &str) -> Self {
        self.task.drain_urls.push(url.to_string());
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Collect tasks into the declared set, keyed by identifier.
pub fn declared<I>(tasks: I) -> DeclaredTasks
where
    I: IntoIterator<Item = Task>,
{
    tasks.into_iter().map(|t| (t.identifier(), t)).collect()
}

/// Builder for manifest JSON documents.
#[derive(Default)]
pub struct ManifestBuilder {
    instances: Vec<Value>,
    staging_tasks: Vec<Value>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A RUNNING instance.
    pub fn instance(self, app_id: &str, container: &str, index: u64, job: u64) -> Self {
        self.instance_in_state(app_id, container, index, job, "RUNNING")
    }

    pub fn instance_in_state(
        mut self,
        app_id: &str,
        container: &str,
        index: u64,
        job: u64,
        state: &str,
    ) -> Self {
        self.instances.push(json!({
            "state": state,
            "application_id": app_id,
            "warden_container_path": container,
            "instance_index": index,
            "warden_job_id": job,
            "syslog_drain_urls": [],
        }));
        self
    }

    /// Attach drain URLs to the most recently added instance.
    pub fn with_drains(mut self, urls: &[&str]) -> Self {
        if let Some(last) = self.instances.last_mut() {
            last["syslog_drain_urls"] = json!(urls);
        }
        self
    }

    pub fn staging(mut self, app_id: &str, task_id: &str, container: &str, job: u64) -> Self {
        self.staging_tasks.push(json!({
            "app_id": app_id,
            "task_id": task_id,
            "warden_container_path": container,
            "warden_job_id": job,
        }));
        self
    }

    pub fn to_json(&self) -> String {
        json!({
            "instances": self.instances,
            "staging_tasks": self.staging_tasks,
        })
        .to_string()
    }

    /// Write the document in one go (truncate + write).
    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.to_json()).expect("failed to write manifest");
    }
}
