// tests/manifest_watcher.rs

mod common;
use crate::common::{Harness, eventually, ids, init_tracing};

use std::path::PathBuf;

use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
use notify::{Event, EventKind};

use logtap::manifest::ManifestOptions;
use logtap::reconcile::Reconciler;
use logtap::watch::{ManifestChange, classify_event, spawn_manifest_watcher};
use logtap::task::StreamKind;
use logtap_test_utils::builders::{ManifestBuilder, TaskBuilder};
use logtap_test_utils::scripted_source::ScriptedSource;

const FLAT: ManifestOptions = ManifestOptions { job_scoped: false };

fn event(kind: EventKind, path: &str) -> Event {
    Event::new(kind).add_path(PathBuf::from(path))
}

#[test]
fn events_are_classified_by_kind() {
    let name = std::ffi::OsStr::new("instances.json");

    assert_eq!(
        classify_event(&event(EventKind::Create(CreateKind::File), "/db/instances.json"), name),
        Some(ManifestChange::Changed)
    );
    assert_eq!(
        classify_event(
            &event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                "/db/instances.json"
            ),
            name
        ),
        Some(ManifestChange::Changed)
    );
    assert_eq!(
        classify_event(&event(EventKind::Remove(RemoveKind::File), "/db/instances.json"), name),
        Some(ManifestChange::Removed)
    );
}

#[test]
fn events_on_other_files_are_ignored() {
    let name = std::ffi::OsStr::new("instances.json");

    assert_eq!(
        classify_event(&event(EventKind::Create(CreateKind::File), "/db/other.json"), name),
        None
    );
    assert_eq!(
        classify_event(&event(EventKind::Remove(RemoveKind::File), "/db/instances.json.tmp"), name),
        None
    );
}

#[tokio::test]
async fn reconcile_once_applies_the_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instances.json");
    ManifestBuilder::new()
        .instance("app-1", "/c/1", 0, 1)
        .instance("app-2", "/c/2", 1, 2)
        .write_to(&path);

    let h = Harness::new(ScriptedSource::new());
    let reconciler = Reconciler::new(&path, FLAT, h.registry.clone());

    assert_eq!(reconciler.reconcile_once().await.unwrap(), 2);
    assert_eq!(h.active().await, ids(&["/c/1", "/c/2"]));
}

#[tokio::test]
async fn unreadable_manifest_keeps_the_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instances.json");
    ManifestBuilder::new().instance("app-1", "/c/1", 0, 1).write_to(&path);

    let h = Harness::new(ScriptedSource::new());
    let reconciler = Reconciler::new(&path, FLAT, h.registry.clone());
    reconciler.reconcile_once().await.unwrap();

    std::fs::write(&path, "{ not json").unwrap();
    assert!(reconciler.reconcile_once().await.is_err());
    std::fs::write(&path, "").unwrap();
    assert!(reconciler.reconcile_once().await.is_err());
    std::fs::remove_file(&path).unwrap();
    assert!(reconciler.reconcile_once().await.is_err());

    assert_eq!(h.active().await, ids(&["/c/1"]));

    reconciler.manifest_removed().unwrap();
    assert!(h.active().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_tracks_manifest_changes() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instances.json");
    ManifestBuilder::new().instance("app-1", "/c/1", 0, 1).write_to(&path);

    let h = Harness::new(ScriptedSource::new());
    let reconciler = Reconciler::new(&path, FLAT, h.registry.clone());
    let _watcher = spawn_manifest_watcher(reconciler, None).unwrap();

    // Initial read.
    h.wait_for_active(&ids(&["/c/1"])).await;

    ManifestBuilder::new()
        .instance("app-1", "/c/1", 0, 1)
        .instance("app-2", "/c/2", 0, 2)
        .write_to(&path);
    h.wait_for_active(&ids(&["/c/1", "/c/2"])).await;

    ManifestBuilder::new().instance("app-2", "/c/2", 0, 2).write_to(&path);
    h.wait_for_active(&ids(&["/c/2"])).await;

    std::fs::remove_file(&path).unwrap();
    h.wait_for_active(&[]).await;
    h.wait_for_live_streams(0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_waits_for_the_directory_to_appear() {
    let root = tempfile::tempdir().unwrap();
    let db = root.path().join("db");
    let path = db.join("instances.json");

    let h = Harness::new(ScriptedSource::new());
    let reconciler = Reconciler::new(&path, FLAT, h.registry.clone());
    let _watcher = spawn_manifest_watcher(reconciler, None).unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    assert!(h.active().await.is_empty());

    std::fs::create_dir_all(&db).unwrap();
    ManifestBuilder::new().instance("app-1", "/c/1", 0, 1).write_to(&path);

    h.wait_for_active(&ids(&["/c/1"])).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_interval_rereads_without_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instances.json");
    ManifestBuilder::new().instance("app-1", "/c/1", 0, 1).write_to(&path);

    let h = Harness::new(ScriptedSource::new());
    let reconciler = Reconciler::new(&path, FLAT, h.registry.clone());
    let _watcher = spawn_manifest_watcher(reconciler, Some(std::time::Duration::from_millis(200)))
        .unwrap();
    h.wait_for_active(&ids(&["/c/1"])).await;

    h.wait_for_live_streams(2).await;

    // Something outside the watcher dropped the task; a later poll restores it.
    h.registry.reset_all().unwrap();

    let task = TaskBuilder::app("app-1", "/c/1").build();
    let source = h.source.clone();
    eventually("task re-opened by a poll", || {
        let source = source.clone();
        let task = task.clone();
        async move { source.open_attempts(&task, StreamKind::Out) == 2 }
    })
    .await;
    h.wait_for_active(&ids(&["/c/1"])).await;
}
