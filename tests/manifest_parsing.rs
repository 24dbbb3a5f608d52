// tests/manifest_parsing.rs

use std::path::PathBuf;

use logtap::manifest::{ManifestError, ManifestOptions, parse_manifest};
use logtap::task::{SourceKind, TaskId};
use logtap_test_utils::builders::ManifestBuilder;

const FLAT: ManifestOptions = ManifestOptions { job_scoped: false };
const JOBS: ManifestOptions = ManifestOptions { job_scoped: true };

#[test]
fn running_and_starting_instances_are_declared() {
    let json = ManifestBuilder::new()
        .instance_in_state("app-1", "/c/1", 0, 11, "RUNNING")
        .instance_in_state("app-2", "/c/2", 1, 12, "STARTING")
        .instance_in_state("app-3", "/c/3", 0, 13, "CRASHED")
        .instance_in_state("app-4", "/c/4", 0, 14, "STOPPED")
        .to_json();

    let tasks = parse_manifest(json.as_bytes(), FLAT).unwrap();

    let ids: Vec<&TaskId> = tasks.keys().collect();
    assert_eq!(ids, vec![&TaskId::from("/c/1"), &TaskId::from("/c/2")]);
}

#[test]
fn instance_fields_are_carried_over() {
    let json = ManifestBuilder::new()
        .instance("app-1", "/c/1", 4, 99)
        .with_drains(&["syslog://a:514", "syslog://b:514"])
        .to_json();

    let tasks = parse_manifest(json.as_bytes(), FLAT).unwrap();
    let task = &tasks[&TaskId::from("/c/1")];

    assert_eq!(task.application_id, "app-1");
    assert_eq!(task.index, 4);
    assert_eq!(task.container_path, PathBuf::from("/c/1"));
    assert_eq!(task.drain_urls, vec!["syslog://a:514", "syslog://b:514"]);
    assert_eq!(task.source, SourceKind::App);
    assert_eq!(task.job_id, None);
}

#[test]
fn job_scoped_identity_includes_the_job_handle() {
    let json = ManifestBuilder::new()
        .instance("app-1", "/c/1", 0, 7)
        .staging("app-2", "task-9", "/c/2", 8)
        .to_json();

    let tasks = parse_manifest(json.as_bytes(), JOBS).unwrap();

    assert!(tasks.contains_key(&TaskId::from("/c/1/jobs/7")));
    assert!(tasks.contains_key(&TaskId::from("/c/2/jobs/8")));
}

#[test]
fn staging_tasks_are_declared_as_stg() {
    let json = ManifestBuilder::new()
        .staging("app-2", "task-9", "/c/stg", 3)
        .to_json();

    let tasks = parse_manifest(json.as_bytes(), FLAT).unwrap();
    let task = &tasks[&TaskId::from("/c/stg")];

    assert_eq!(task.source, SourceKind::Staging);
    assert_eq!(task.application_id, "app-2");
    assert_eq!(task.index, 0);
    assert!(task.drain_urls.is_empty());
}

#[test]
fn records_without_a_container_path_are_skipped() {
    let json = ManifestBuilder::new()
        .instance("app-1", "", 0, 1)
        .staging("app-2", "t", "", 2)
        .instance("app-3", "/c/3", 0, 3)
        .to_json();

    let tasks = parse_manifest(json.as_bytes(), FLAT).unwrap();

    assert_eq!(tasks.len(), 1);
}

#[test]
fn later_duplicate_wins() {
    let json = ManifestBuilder::new()
        .instance("first", "/c/1", 0, 1)
        .instance("second", "/c/1", 1, 1)
        .to_json();

    let tasks = parse_manifest(json.as_bytes(), FLAT).unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[&TaskId::from("/c/1")].application_id, "second");
}

#[test]
fn legacy_field_names_are_accepted() {
    let json = r#"{
        "instances": [{
            "state": "RUNNING",
            "droplet_id": "legacy-app",
            "dir": "/c/legacy",
            "instance_index": 2,
            "drain_urls": ["syslog://x:1"]
        }]
    }"#;

    let tasks = parse_manifest(json.as_bytes(), FLAT).unwrap();
    let task = &tasks[&TaskId::from("/c/legacy")];

    assert_eq!(task.application_id, "legacy-app");
    assert_eq!(task.drain_urls, vec!["syslog://x:1"]);
}

#[test]
fn missing_lists_mean_no_tasks() {
    let tasks = parse_manifest(b"{}", FLAT).unwrap();
    assert!(tasks.is_empty());
}

#[test]
fn empty_manifest_is_an_error() {
    assert!(matches!(parse_manifest(b"", FLAT), Err(ManifestError::Empty)));
    assert!(matches!(
        parse_manifest(b"  \n\t", FLAT),
        Err(ManifestError::Empty)
    ));
}

#[test]
fn malformed_manifest_is_an_error() {
    assert!(matches!(
        parse_manifest(b"{\"instances\": [", FLAT),
        Err(ManifestError::Json(_))
    ));
    assert!(matches!(
        parse_manifest(b"{\"instances\": 5}", FLAT),
        Err(ManifestError::Json(_))
    ));
}
