// src/task.rs

//! Identity and metadata of one followed workload.

use std::fmt;
use std::path::{Path, PathBuf};

/// Derived key that uniquely identifies a logical task.
///
/// Two [`Task`] values with the same `TaskId` are the same task as far as
/// reconciliation is concerned, whatever their other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(PathBuf);

impl TaskId {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for TaskId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for TaskId {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

/// What kind of workload produced the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A running application instance (stdout + stderr).
    App,
    /// A staging / build task (single combined log).
    Staging,
}

impl SourceKind {
    /// Wire name attached to every record.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::App => "App",
            SourceKind::Staging => "STG",
        }
    }

    /// Stream kinds a task of this kind is followed on.
    pub fn streams(&self) -> &'static [StreamKind] {
        match self {
            SourceKind::App => &[StreamKind::Out, StreamKind::Err],
            SourceKind::Staging => &[StreamKind::Out],
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which output stream of a task a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum StreamKind {
    #[serde(rename = "stdout")]
    Out,
    #[serde(rename = "stderr")]
    Err,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Out => "stdout",
            StreamKind::Err => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One workload whose output is being followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub application_id: String,
    pub drain_urls: Vec<String>,
    pub index: u64,
    pub container_path: PathBuf,
    /// Job handle inside the container. Only set on platforms where several
    /// jobs share a container path; it then becomes part of the identifier.
    pub job_id: Option<u64>,
    pub source: SourceKind,
}

impl Task {
    /// `<container>/jobs/<job>` when job-scoped, `<container>` otherwise.
    pub fn identifier(&self) -> TaskId {
        match self.job_id {
            Some(job) => TaskId(self.container_path.join("jobs").join(job.to_string())),
            None => TaskId(self.container_path.clone()),
        }
    }
}
