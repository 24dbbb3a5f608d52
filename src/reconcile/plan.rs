// src/reconcile/plan.rs

//! Pure diff between active and declared task sets.

use std::collections::HashSet;

use crate::manifest::DeclaredTasks;
use crate::task::{Task, TaskId};

/// What has to change for the active set to match the declared set.
///
/// Only identity matters: a declared task whose id is already active is left
/// alone even if its other fields changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Active ids no longer declared, sorted.
    pub stop: Vec<TaskId>,
    /// Declared tasks not active yet, in id order.
    pub start: Vec<Task>,
}

impl ReconcilePlan {
    pub fn compute<'a, I>(active: I, declared: &DeclaredTasks) -> Self
    where
        I: IntoIterator<Item = &'a TaskId>,
    {
        let active: HashSet<&TaskId> = active.into_iter().collect();

        let mut stop: Vec<TaskId> = active
            .iter()
            .filter(|id| !declared.contains_key(**id))
            .map(|id| (*id).clone())
            .collect();
        stop.sort();

        let start = declared
            .iter()
            .filter(|(id, _)| !active.contains(id))
            .map(|(_, task)| task.clone())
            .collect();

        Self { stop, start }
    }

    pub fn is_empty(&self) -> bool {
        self.stop.is_empty() && self.start.is_empty()
    }
}
