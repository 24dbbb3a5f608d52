// src/registry/mod.rs

//! Single owner of the task id → supervisor mapping.
//!
//! The mapping lives inside one worker task ([`worker`]). Everything else
//! talks to it by submitting [`RegistryOp`]s through a [`RegistryHandle`];
//! operations are applied strictly in submission order.

pub mod worker;

use tokio::sync::{mpsc, oneshot};

use crate::errors::{LogtapError, Result};
use crate::manifest::DeclaredTasks;
use crate::metrics::MetricsContext;
use crate::task::TaskId;

pub use worker::spawn_registry;

/// Units of work applied by the registry worker with exclusive access.
#[derive(Debug)]
pub enum RegistryOp {
    /// Converge the active set to the declared set.
    Reconcile(DeclaredTasks),
    /// Self-cleanup of a supervisor. No-op if the entry is gone or belongs to
    /// a newer supervisor of the same task.
    RemoveIfPresent { id: TaskId, generation: u64 },
    /// Stop every supervisor and forget them all.
    ResetAll,
    /// Currently registered ids, sorted.
    ActiveIds(oneshot::Sender<Vec<TaskId>>),
    /// Counters of every registered supervisor's transports.
    Metrics(oneshot::Sender<Vec<MetricsContext>>),
    /// Stop everything, wait for all read loops to exit, reply, then exit.
    Shutdown(oneshot::Sender<()>),
}

/// Submission side of the registry. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::UnboundedSender<RegistryOp>,
}

impl RegistryHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<RegistryOp>) -> Self {
        Self { tx }
    }

    pub fn submit(&self, op: RegistryOp) -> Result<()> {
        self.tx.send(op).map_err(|_| LogtapError::RegistryClosed)
    }

    pub fn reconcile(&self, declared: DeclaredTasks) -> Result<()> {
        self.submit(RegistryOp::Reconcile(declared))
    }

    pub fn remove_if_present(&self, id: TaskId, generation: u64) -> Result<()> {
        self.submit(RegistryOp::RemoveIfPresent { id, generation })
    }

    pub fn reset_all(&self) -> Result<()> {
        self.submit(RegistryOp::ResetAll)
    }

    pub async fn active_ids(&self) -> Result<Vec<TaskId>> {
        let (reply, rx) = oneshot::channel();
        self.submit(RegistryOp::ActiveIds(reply))?;
        rx.await.map_err(|_| LogtapError::RegistryClosed)
    }

    pub async fn metrics(&self) -> Result<Vec<MetricsContext>> {
        let (reply, rx) = oneshot::channel();
        self.submit(RegistryOp::Metrics(reply))?;
        rx.await.map_err(|_| LogtapError::RegistryClosed)
    }

    /// Graceful stop of every supervisor. Returns once all have exited.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.submit(RegistryOp::Shutdown(reply))?;
        rx.await.map_err(|_| LogtapError::RegistryClosed)
    }
}
