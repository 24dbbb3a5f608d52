#![allow(dead_code)]

use std::sync::Arc;

use logtap::registry::{RegistryHandle, spawn_registry};
use logtap::supervisor::SupervisorContext;
use logtap::task::TaskId;
use logtap_test_utils::recording_emitter::RecordingEmitter;
use logtap_test_utils::scripted_source::ScriptedSource;

pub use logtap_test_utils::{eventually, init_tracing, with_timeout};

/// A registry wired to a scripted source and a recording emitter.
pub struct Harness {
    pub registry: RegistryHandle,
    pub source: Arc<ScriptedSource>,
    pub emitter: Arc<RecordingEmitter>,
}

impl Harness {
    pub fn new(source: ScriptedSource) -> Self {
        let source = Arc::new(source);
        let emitter = Arc::new(RecordingEmitter::new());
        let registry = spawn_registry(SupervisorContext {
            source: source.clone(),
            emitter: emitter.clone(),
        });
        Self {
            registry,
            source,
            emitter,
        }
    }

    pub fn context(&self) -> SupervisorContext {
        SupervisorContext {
            source: self.source.clone(),
            emitter: self.emitter.clone(),
        }
    }

    pub async fn active(&self) -> Vec<TaskId> {
        self.registry.active_ids().await.expect("registry closed")
    }

    /// Wait until the registry holds exactly `expected`.
    pub async fn wait_for_active(&self, expected: &[TaskId]) {
        let registry = self.registry.clone();
        eventually("registry reaches expected task set", || {
            let registry = registry.clone();
            async move { registry.active_ids().await.map(|ids| ids == expected).unwrap_or(false) }
        })
        .await;
    }

    /// Wait until exactly `n` streams are open on the scripted source.
    pub async fn wait_for_live_streams(&self, n: usize) {
        let source = self.source.clone();
        eventually("expected number of open streams", || {
            let source = source.clone();
            async move { source.live_streams() == n }
        })
        .await;
    }
}

pub fn ids(raw: &[&str]) -> Vec<TaskId> {
    raw.iter().map(|s| TaskId::from(*s)).collect()
}
