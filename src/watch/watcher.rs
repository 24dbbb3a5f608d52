// src/watch/watcher.rs

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::reconcile::Reconciler;

/// Delay between attempts to start watching a directory that is not there yet.
pub const WATCH_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Handle for the manifest watcher.
///
/// The underlying `RecommendedWatcher` lives inside the spawned task; dropping
/// this handle aborts that task and with it the file watching.
pub struct WatcherHandle {
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// What a filesystem event means for the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestChange {
    /// Created or modified: read it again.
    Changed,
    /// Deleted: stop following everything.
    Removed,
}

/// Map a notify event to a manifest change, ignoring unrelated paths.
pub fn classify_event(event: &Event, manifest_name: &OsStr) -> Option<ManifestChange> {
    let concerns_manifest = event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(manifest_name));
    if !concerns_manifest {
        return None;
    }

    match event.kind {
        EventKind::Remove(_) => Some(ManifestChange::Removed),
        EventKind::Access(_) => None,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any | EventKind::Other => {
            Some(ManifestChange::Changed)
        }
    }
}

/// Spawn a watcher on the manifest's directory that drives `reconciler`.
///
/// - Waits (retrying) until the directory can be watched, then reads the
///   manifest once.
/// - Every create/modify event on the manifest triggers a re-read; a delete
///   resets the registry.
/// - With `poll_interval`, the manifest is also re-read periodically in case a
///   notification is missed.
pub fn spawn_manifest_watcher(
    reconciler: Reconciler,
    poll_interval: Option<Duration>,
) -> Result<WatcherHandle> {
    let manifest = reconciler.manifest_path().to_path_buf();
    let manifest_name: OsString = manifest
        .file_name()
        .map(ToOwned::to_owned)
        .with_context(|| format!("manifest path {:?} has no file name", manifest))?;
    let dir = watch_dir(&manifest);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Err(err) = event_tx.send(res) {
                eprintln!("logtap: failed to forward notify event: {err}");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    let task = tokio::spawn(async move {
        while let Err(err) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
            warn!(dir = ?dir, error = %err, "cannot watch manifest directory yet, retrying");
            tokio::time::sleep(WATCH_RETRY_DELAY).await;
        }
        info!(manifest = ?manifest, "manifest watcher started");

        info!("reading initial tasks data");
        reread(&reconciler).await;

        let mut poll = poll_interval.map(|every| {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.reset();
            ticker
        });

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let event = match event {
                        Some(Ok(event)) => event,
                        Some(Err(err)) => {
                            warn!(error = %err, "file system notification error");
                            continue;
                        }
                        None => break,
                    };
                    debug!(?event, "received notify event");

                    match classify_event(&event, &manifest_name) {
                        Some(ManifestChange::Changed) => reread(&reconciler).await,
                        Some(ManifestChange::Removed) => {
                            if reconciler.manifest_removed().is_err() {
                                break;
                            }
                        }
                        None => {}
                    }
                }
                _ = next_poll(&mut poll) => reread(&reconciler).await,
            }
        }

        drop(watcher);
        debug!("manifest watcher loop finished");
    });

    Ok(WatcherHandle { task })
}

fn watch_dir(manifest: &Path) -> PathBuf {
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn reread(reconciler: &Reconciler) {
    match reconciler.reconcile_once().await {
        Ok(count) => debug!(declared = count, "manifest reconciled"),
        Err(err) => warn!(
            path = ?reconciler.manifest_path(),
            error = %err,
            "reading manifest failed, will retry on next change"
        ),
    }
}
