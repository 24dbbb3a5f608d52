// src/watch/mod.rs

//! Manifest change detection.
//!
//! Wires a cross-platform filesystem watcher (`notify`) on the manifest's
//! directory to a [`Reconciler`](crate::reconcile::Reconciler). It does not
//! know about supervisors; it only turns file events into reconcile passes
//! and resets.

pub mod watcher;

pub use watcher::{
    ManifestChange, WATCH_RETRY_DELAY, WatcherHandle, classify_event, spawn_manifest_watcher,
};
