// tests/registry_reconcile.rs

mod common;
use crate::common::{Harness, ids, init_tracing, with_timeout};

use tokio::io::AsyncWriteExt;

use logtap::metrics::RECEIVED_MESSAGE_COUNT;
use logtap::task::StreamKind;
use logtap_test_utils::builders::{TaskBuilder, declared};
use logtap_test_utils::scripted_source::{Script, ScriptedSource};

#[tokio::test]
async fn active_set_follows_the_declared_set() {
    init_tracing();

    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();
    let b = TaskBuilder::app("app-b", "/c/b").build();

    h.registry.reconcile(declared([a.clone()])).unwrap();
    assert_eq!(h.active().await, ids(&["/c/a"]));
    h.wait_for_live_streams(2).await;

    h.registry.reconcile(declared([a.clone(), b.clone()])).unwrap();
    assert_eq!(h.active().await, ids(&["/c/a", "/c/b"]));
    h.wait_for_live_streams(4).await;
    // A was left alone.
    assert_eq!(h.source.open_attempts(&a, StreamKind::Out), 1);

    h.registry.reconcile(declared([b.clone()])).unwrap();
    assert_eq!(h.active().await, ids(&["/c/b"]));
    h.wait_for_live_streams(2).await;
    assert_eq!(h.source.open_attempts(&b, StreamKind::Out), 1);
}

#[tokio::test]
async fn reconciling_twice_changes_nothing() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();

    h.registry.reconcile(declared([a.clone()])).unwrap();
    h.wait_for_live_streams(2).await;
    h.registry.reconcile(declared([a.clone()])).unwrap();

    assert_eq!(h.active().await, ids(&["/c/a"]));
    assert_eq!(h.source.open_attempts(&a, StreamKind::Out), 1);
    assert_eq!(h.source.open_attempts(&a, StreamKind::Err), 1);
    assert_eq!(h.source.live_streams(), 2);
}

#[tokio::test]
async fn drain_url_change_alone_does_not_restart_a_task() {
    let h = Harness::new(ScriptedSource::new());
    let before = TaskBuilder::app("app-a", "/c/a").build();
    let after = TaskBuilder::app("app-a", "/c/a")
        .drain("syslog://new-drain:514")
        .build();

    h.registry.reconcile(declared([before.clone()])).unwrap();
    h.wait_for_live_streams(2).await;
    h.registry.reconcile(declared([after])).unwrap();

    assert_eq!(h.active().await, ids(&["/c/a"]));
    assert_eq!(h.source.total_open_attempts(), 2);
}

#[tokio::test]
async fn job_handle_is_part_of_identity() {
    let h = Harness::new(ScriptedSource::new().job_scoped(true));
    let first = TaskBuilder::app("app-a", "/c/a").job(1).build();
    let second = TaskBuilder::app("app-a", "/c/a").job(2).build();

    h.registry
        .reconcile(declared([first.clone(), second.clone()]))
        .unwrap();

    assert_eq!(h.active().await, ids(&["/c/a/jobs/1", "/c/a/jobs/2"]));
    h.wait_for_live_streams(4).await;
}

#[tokio::test]
async fn reset_all_stops_everything() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();
    let b = TaskBuilder::staging("app-b", "/c/b").build();

    h.registry.reconcile(declared([a, b])).unwrap();
    h.wait_for_live_streams(3).await;

    h.registry.reset_all().unwrap();

    assert!(h.active().await.is_empty());
    h.wait_for_live_streams(0).await;
}

#[tokio::test]
async fn tasks_come_back_after_a_reset() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();

    h.registry.reconcile(declared([a.clone()])).unwrap();
    h.wait_for_live_streams(2).await;
    h.registry.reset_all().unwrap();
    h.wait_for_live_streams(0).await;
    h.registry.reconcile(declared([a.clone()])).unwrap();

    assert_eq!(h.active().await, ids(&["/c/a"]));
    h.wait_for_live_streams(2).await;
    assert_eq!(h.source.open_attempts(&a, StreamKind::Out), 2);
}

#[tokio::test]
async fn finished_task_removes_itself() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();
    h.source.script(&a, StreamKind::Out, Script::lines(&["bye"]));
    h.source.script(&a, StreamKind::Err, Script::lines(&[]));

    h.registry.reconcile(declared([a])).unwrap();

    h.wait_for_active(&[]).await;
    assert_eq!(h.emitter.texts(), vec!["bye"]);
}

#[tokio::test(start_paused = true)]
async fn failed_start_is_retried_on_next_reconcile() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();
    h.source.script(
        &a,
        StreamKind::Err,
        Script::FailThen(10, Box::new(Script::Live)),
    );

    h.registry.reconcile(declared([a.clone()])).unwrap();
    h.wait_for_active(&[]).await;
    assert_eq!(h.source.live_streams(), 0);

    h.registry.reconcile(declared([a.clone()])).unwrap();
    assert_eq!(h.active().await, ids(&["/c/a"]));
    h.wait_for_live_streams(2).await;
    assert_eq!(h.source.open_attempts(&a, StreamKind::Out), 2);
    assert_eq!(h.source.open_attempts(&a, StreamKind::Err), 11);
}

#[tokio::test]
async fn removal_for_an_old_generation_is_ignored() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();

    h.registry.reconcile(declared([a.clone()])).unwrap();
    h.registry
        .remove_if_present(a.identifier(), u64::MAX)
        .unwrap();

    assert_eq!(h.active().await, ids(&["/c/a"]));

    // Unknown ids are a no-op too.
    h.registry.remove_if_present("/c/nope".into(), 0).unwrap();
    assert_eq!(h.active().await, ids(&["/c/a"]));
}

#[tokio::test]
async fn metrics_report_each_active_stream() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();

    h.registry.reconcile(declared([a.clone()])).unwrap();
    h.wait_for_live_streams(2).await;

    let mut out = h.source.take_writer(&a, StreamKind::Out).unwrap();
    out.write_all(b"one\ntwo\n").await.unwrap();
    with_timeout(h.emitter.wait_for(2)).await;

    let mut contexts = h.registry.metrics().await.unwrap();
    contexts.sort_by(|x, y| x.name.cmp(&y.name));

    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0].name, "stream:/c/a type stderr");
    assert_eq!(contexts[0].value(RECEIVED_MESSAGE_COUNT), Some(0));
    assert_eq!(contexts[1].name, "stream:/c/a type stdout");
    assert_eq!(contexts[1].value(RECEIVED_MESSAGE_COUNT), Some(2));
}

#[tokio::test]
async fn shutdown_waits_for_every_stream_to_close() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();
    let b = TaskBuilder::app("app-b", "/c/b").build();

    h.registry.reconcile(declared([a, b])).unwrap();
    h.wait_for_live_streams(4).await;

    with_timeout(h.registry.shutdown()).await.unwrap();

    assert_eq!(h.source.live_streams(), 0);
    assert!(h.registry.active_ids().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn metrics_reporter_exits_with_the_registry() {
    let h = Harness::new(ScriptedSource::new());
    h.registry
        .reconcile(declared([TaskBuilder::app("app-a", "/c/a").build()]))
        .unwrap();

    let reporter = logtap::metrics::spawn_metrics_reporter(
        h.registry.clone(),
        std::time::Duration::from_secs(1),
    );
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    assert!(!reporter.is_finished());

    with_timeout(h.registry.shutdown()).await.unwrap();
    with_timeout(reporter).await.unwrap();
}

#[tokio::test]
async fn shutdown_also_waits_for_tasks_already_being_stopped() {
    let h = Harness::new(ScriptedSource::new());
    let a = TaskBuilder::app("app-a", "/c/a").build();
    let b = TaskBuilder::app("app-b", "/c/b").build();

    h.registry.reconcile(declared([a.clone(), b.clone()])).unwrap();
    h.wait_for_live_streams(4).await;

    // A leaves the map through a reconcile, B through a reset; neither is
    // registered any more when shutdown arrives right behind them.
    h.registry.reconcile(declared([b])).unwrap();
    h.registry.reset_all().unwrap();
    with_timeout(h.registry.shutdown()).await.unwrap();

    assert_eq!(h.source.live_streams(), 0);
}
