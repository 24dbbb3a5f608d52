// src/stream/source.rs

//! Pluggable "line-producing stream source" abstraction.
//!
//! A [`StreamSource`] knows where a task's stdout/stderr live and how to open
//! them. Two implementations exist and one is selected at startup:
//!
//! - [`SocketSource`]: unix domain sockets `stdout.sock` / `stderr.sock` under
//!   the task's job directory.
//! - [`FileTailSource`]: log files under `<container>/logs`, followed like
//!   `tail -f`.
//!
//! Supervisors and the reconciler only ever see the trait.

use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::config::StreamBackend;
use crate::errors::Result;
use crate::stream::follow::FollowFile;
use crate::task::{SourceKind, StreamKind, Task};

/// An open, readable stream handle. Dropping it closes the handle.
pub type BoxedStream = Box<dyn AsyncRead + Send + Unpin>;

pub type OpenFuture<'a> = Pin<Box<dyn Future<Output = io::Result<BoxedStream>> + Send + 'a>>;

pub trait StreamSource: Send + Sync + Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether task identity includes the job handle on this platform.
    fn job_scoped(&self) -> bool;

    /// Location of the given stream of the given task.
    fn stream_path(&self, task: &Task, kind: StreamKind) -> PathBuf;

    /// Single open attempt. Retrying is the caller's business.
    fn open<'a>(&'a self, path: &'a Path) -> OpenFuture<'a>;
}

/// Build the source for the configured backend.
pub fn build_source(backend: StreamBackend) -> Result<Arc<dyn StreamSource>> {
    match backend {
        #[cfg(unix)]
        StreamBackend::Socket => Ok(Arc::new(SocketSource)),
        #[cfg(not(unix))]
        StreamBackend::Socket => Err(crate::errors::LogtapError::ConfigError(
            "the socket backend requires unix domain sockets".to_string(),
        )),
        StreamBackend::File => Ok(Arc::new(FileTailSource)),
    }
}

/// `stdout.sock` / `stderr.sock` file name for a stream kind.
pub fn socket_name(kind: StreamKind) -> &'static str {
    match kind {
        StreamKind::Out => "stdout.sock",
        StreamKind::Err => "stderr.sock",
    }
}

/// Unix domain socket backend.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketSource;

#[cfg(unix)]
impl StreamSource for SocketSource {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn job_scoped(&self) -> bool {
        true
    }

    fn stream_path(&self, task: &Task, kind: StreamKind) -> PathBuf {
        task.identifier().as_path().join(socket_name(kind))
    }

    fn open<'a>(&'a self, path: &'a Path) -> OpenFuture<'a> {
        Box::pin(async move {
            let stream = tokio::net::UnixStream::connect(path).await?;
            Ok(Box::new(stream) as BoxedStream)
        })
    }
}

/// Log file backend for platforms without per-stream sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTailSource;

impl FileTailSource {
    fn log_name(kind: StreamKind) -> &'static str {
        match kind {
            StreamKind::Out => "stdout.log",
            StreamKind::Err => "stderr.log",
        }
    }
}

impl StreamSource for FileTailSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn job_scoped(&self) -> bool {
        false
    }

    fn stream_path(&self, task: &Task, kind: StreamKind) -> PathBuf {
        let root = task.identifier().as_path().to_path_buf();
        match task.source {
            SourceKind::Staging => root
                .join("staging")
                .join("tmp")
                .join("logs")
                .join("staging_task.log"),
            SourceKind::App => root.join("logs").join(Self::log_name(kind)),
        }
    }

    fn open<'a>(&'a self, path: &'a Path) -> OpenFuture<'a> {
        Box::pin(async move {
            let file = tokio::fs::File::open(path).await?;
            Ok(Box::new(FollowFile::new(file)) as BoxedStream)
        })
    }
}
