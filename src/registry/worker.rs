// src/registry/worker.rs

//! The registry's worker loop.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::manifest::DeclaredTasks;
use crate::reconcile::ReconcilePlan;
use crate::registry::{RegistryHandle, RegistryOp};
use crate::supervisor::{SupervisorContext, SupervisorExit, TaskSupervisor};
use crate::task::TaskId;

/// Spawn the registry worker and return the handle used to submit work.
///
/// The worker exits after a `Shutdown` or once every handle (including the
/// ones held by running supervisors) has been dropped.
pub fn spawn_registry(ctx: SupervisorContext) -> RegistryHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<RegistryOp>();
    let mut worker = RegistryWorker {
        tasks: HashMap::new(),
        ctx,
        ops: tx.downgrade(),
        next_generation: 0,
        stopping: JoinSet::new(),
    };

    tokio::spawn(async move {
        info!("task registry started");

        while let Some(op) = rx.recv().await {
            if !worker.apply(op) {
                break;
            }
        }

        info!("task registry finished");
    });

    RegistryHandle::new(tx)
}

struct RegistryWorker {
    tasks: HashMap<TaskId, TaskSupervisor>,
    ctx: SupervisorContext,
    ops: mpsc::WeakUnboundedSender<RegistryOp>,
    next_generation: u64,
    /// Background stops of supervisors already dropped from `tasks`.
    stopping: JoinSet<()>,
}

impl RegistryWorker {
    /// Apply one operation. Returns `false` when the worker should exit.
    ///
    /// Never awaits: anything that blocks is handed to a spawned task.
    fn apply(&mut self, op: RegistryOp) -> bool {
        match op {
            RegistryOp::Reconcile(declared) => self.reconcile(declared),
            RegistryOp::RemoveIfPresent { id, generation } => {
                self.remove_if_present(id, generation)
            }
            RegistryOp::ResetAll => self.reset_all(),
            RegistryOp::ActiveIds(reply) => {
                let mut ids: Vec<TaskId> = self.tasks.keys().cloned().collect();
                ids.sort();
                let _ = reply.send(ids);
            }
            RegistryOp::Metrics(reply) => {
                let contexts = self.tasks.values().flat_map(|s| s.metrics()).collect();
                let _ = reply.send(contexts);
            }
            RegistryOp::Shutdown(reply) => {
                self.shutdown(reply);
                return false;
            }
        }
        true
    }

    fn reconcile(&mut self, declared: DeclaredTasks) {
        debug!(
            active = self.tasks.len(),
            declared = declared.len(),
            "reconciling declared tasks"
        );

        let plan = ReconcilePlan::compute(self.tasks.keys(), &declared);
        if plan.is_empty() {
            return;
        }

        for id in plan.stop {
            if let Some(supervisor) = self.tasks.remove(&id) {
                info!(task = %id, "removing stale task");
                self.stop_in_background(supervisor);
            }
        }

        for task in plan.start {
            let id = task.identifier();
            info!(task = %id, app_id = %task.application_id, "adding new task");
            let supervisor = TaskSupervisor::new(task, self.next_generation, &self.ctx);
            self.next_generation += 1;

            // Registered before launching so the next op already sees it.
            self.tasks.insert(id, supervisor.clone());
            self.launch(supervisor);
        }
    }

    fn remove_if_present(&mut self, id: TaskId, generation: u64) {
        match self.tasks.get(&id) {
            Some(current) if current.generation() == generation => {
                debug!(task = %id, "deregistering finished task");
                self.tasks.remove(&id);
            }
            Some(_) => debug!(task = %id, "ignoring removal for a superseded supervisor"),
            None => {}
        }
    }

    fn reset_all(&mut self) {
        info!(active = self.tasks.len(), "manifest gone; stopping all tasks");
        let supervisors: Vec<TaskSupervisor> = self.tasks.drain().map(|(_, s)| s).collect();
        for supervisor in supervisors {
            self.stop_in_background(supervisor);
        }
    }

    fn shutdown(&mut self, reply: oneshot::Sender<()>) {
        info!(active = self.tasks.len(), "shutting down task registry");
        let supervisors: Vec<TaskSupervisor> = self.tasks.drain().map(|(_, s)| s).collect();
        for supervisor in &supervisors {
            supervisor.signal_stop();
        }

        let mut stopping = std::mem::take(&mut self.stopping);
        debug!(pending = stopping.len(), "waiting for earlier stops too");

        tokio::spawn(async move {
            for supervisor in supervisors {
                supervisor.stop().await;
            }
            while stopping.join_next().await.is_some() {}
            let _ = reply.send(());
        });
    }

    /// Fire the stop signal now; wait for the read loops on a tracked task.
    fn stop_in_background(&mut self, supervisor: TaskSupervisor) {
        // Reap stops that already finished so the set stays small.
        while self.stopping.try_join_next().is_some() {}

        supervisor.signal_stop();
        self.stopping.spawn(async move {
            supervisor.stop().await;
            debug!(task = %supervisor.id(), "supervisor stopped");
        });
    }

    /// Run the supervisor on its own task; report back only by submitting ops.
    fn launch(&self, supervisor: TaskSupervisor) {
        let Some(tx) = self.ops.upgrade() else {
            warn!(task = %supervisor.id(), "registry is closing; not launching supervisor");
            return;
        };
        let registry = RegistryHandle::new(tx);

        tokio::spawn(async move {
            let id = supervisor.id().clone();
            let generation = supervisor.generation();

            match supervisor.run().await {
                Ok(SupervisorExit::Stopped) => return,
                Ok(SupervisorExit::Completed) => {}
                Err(err) => {
                    warn!(
                        task = %id,
                        error = %err,
                        "failed to start following task; retrying on next manifest read"
                    );
                }
            }

            if registry.remove_if_present(id.clone(), generation).is_err() {
                debug!(task = %id, "registry closed before self-removal");
            }
        });
    }
}
