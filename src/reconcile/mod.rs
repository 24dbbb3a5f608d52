// src/reconcile/mod.rs

//! Converging the followed task set on the manifest.
//!
//! [`Reconciler`] reads and parses the manifest and submits the declared set
//! to the registry. The diff itself ([`ReconcilePlan`]) is computed by the
//! registry worker, so it always runs against the current mapping.

pub mod plan;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::manifest::{ManifestOptions, parse_manifest};
use crate::registry::RegistryHandle;

pub use plan::ReconcilePlan;

#[derive(Debug, Clone)]
pub struct Reconciler {
    manifest_path: PathBuf,
    options: ManifestOptions,
    registry: RegistryHandle,
}

impl Reconciler {
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        options: ManifestOptions,
        registry: RegistryHandle,
    ) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            options,
            registry,
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// One read → parse → submit pass. Returns the number of declared tasks.
    ///
    /// On error nothing is submitted, so the registry keeps its prior state.
    pub async fn reconcile_once(&self) -> Result<usize> {
        let bytes = tokio::fs::read(&self.manifest_path).await?;
        let declared = parse_manifest(&bytes, self.options)?;
        let count = declared.len();

        debug!(path = ?self.manifest_path, declared = count, "manifest read");
        self.registry.reconcile(declared)?;
        Ok(count)
    }

    /// The manifest disappeared: drop everything.
    pub fn manifest_removed(&self) -> Result<()> {
        self.registry.reset_all()
    }
}
