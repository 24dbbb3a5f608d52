// src/supervisor/mod.rs

//! Ownership of one task's stream transports for their whole lifetime.
//!
//! A [`TaskSupervisor`] is created by the registry when a new task appears in
//! the manifest. [`TaskSupervisor::run`] connects every required transport
//! (all or nothing), then waits until each read loop has ended. Stopping is
//! cooperative through a close-once signal shared with the transports.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::emit::Emitter;
use crate::errors::Result;
use crate::metrics::MetricsContext;
use crate::stream::{StreamSource, StreamTransport};
use crate::task::{Task, TaskId};

/// Collaborators every supervisor needs.
#[derive(Debug, Clone)]
pub struct SupervisorContext {
    pub source: Arc<dyn StreamSource>,
    pub emitter: Arc<dyn Emitter>,
}

/// How a supervisor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// Every stream reached its end on its own.
    Completed,
    /// The stop signal was fired.
    Stopped,
}

/// Cheap-to-clone handle on one task's supervision.
#[derive(Clone)]
pub struct TaskSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    id: TaskId,
    task: Arc<Task>,
    generation: u64,
    transports: Vec<Arc<StreamTransport>>,
    emitter: Arc<dyn Emitter>,
    stop: CancellationToken,
    finished: CancellationToken,
    launched: AtomicBool,
}

impl fmt::Debug for TaskSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSupervisor")
            .field("id", &self.inner.id)
            .field("generation", &self.inner.generation)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

impl TaskSupervisor {
    /// Build a supervisor. No I/O happens until [`run`](Self::run).
    ///
    /// `generation` distinguishes successive supervisors of the same task id.
    pub fn new(task: Task, generation: u64, ctx: &SupervisorContext) -> Self {
        let task = Arc::new(task);
        let stop = CancellationToken::new();
        let transports = task
            .source
            .streams()
            .iter()
            .map(|&kind| {
                Arc::new(StreamTransport::new(
                    Arc::clone(&task),
                    kind,
                    Arc::clone(&ctx.source),
                    stop.clone(),
                ))
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                id: task.identifier(),
                task,
                generation,
                transports,
                emitter: Arc::clone(&ctx.emitter),
                stop,
                finished: CancellationToken::new(),
                launched: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.inner.id
    }

    pub fn task(&self) -> &Task {
        &self.inner.task
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn transport_count(&self) -> usize {
        self.inner.transports.len()
    }

    pub fn metrics(&self) -> Vec<MetricsContext> {
        self.inner.transports.iter().map(|t| t.metrics()).collect()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stop.is_cancelled()
    }

    /// Fire the stop signal without waiting. Safe to call any number of times.
    pub fn signal_stop(&self) {
        self.inner.stop.cancel();
        if !self.inner.launched.load(Ordering::SeqCst) {
            // `run` will observe the signal and return at once.
            self.inner.finished.cancel();
        }
    }

    /// Fire the stop signal and wait until every read loop has exited.
    ///
    /// Bounded only by how quickly the underlying reads unblock.
    pub async fn stop(&self) {
        self.signal_stop();
        self.inner.finished.cancelled().await;
    }

    /// Connect all transports, then follow them until they all end.
    ///
    /// If any required transport cannot be opened, the ones already open are
    /// closed and the connect error is returned. May only be called once.
    pub async fn run(&self) -> Result<SupervisorExit> {
        let inner = &self.inner;
        if inner.launched.swap(true, Ordering::SeqCst) {
            return Err(anyhow!("supervisor for {} was already launched", inner.id).into());
        }
        let _finished = inner.finished.clone().drop_guard();

        if inner.stop.is_cancelled() {
            return Ok(SupervisorExit::Stopped);
        }

        info!(
            task = %inner.id,
            app_id = %inner.task.application_id,
            source = %inner.task.source,
            "starting to follow task"
        );

        let mut streams = Vec::with_capacity(inner.transports.len());
        for transport in &inner.transports {
            match transport.connect().await {
                Ok(stream) => streams.push((Arc::clone(transport), stream)),
                Err(err) => {
                    drop(streams);
                    if inner.stop.is_cancelled() {
                        return Ok(SupervisorExit::Stopped);
                    }
                    return Err(err);
                }
            }
        }

        let mut loops = JoinSet::new();
        for (transport, stream) in streams {
            let emitter = Arc::clone(&inner.emitter);
            loops.spawn(async move {
                let end = transport.read_loop(stream, emitter).await;
                (transport.kind(), end)
            });
        }

        while let Some(joined) = loops.join_next().await {
            match joined {
                Ok((kind, end)) => debug!(task = %inner.id, stream = %kind, ?end, "read loop exited"),
                Err(err) => warn!(task = %inner.id, error = %err, "read loop aborted"),
            }
        }

        if inner.stop.is_cancelled() {
            info!(task = %inner.id, "stopped following task");
            Ok(SupervisorExit::Stopped)
        } else {
            info!(task = %inner.id, "all task streams ended");
            Ok(SupervisorExit::Completed)
        }
    }
}
