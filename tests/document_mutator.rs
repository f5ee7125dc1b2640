//! Document Mutator Tests
//!
//! Tests for validated writes:
//! - create -> find round trip with server-controlled timestamps
//! - merge patch semantics on update
//! - NotFound is reported before validation
//! - hooks run in stage order and validation failures never persist
//! - post-save failures surface after the write committed

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use resourcekit::document::{
    BoxError, DocumentMutator, FixedClock, HookStage, Hooks, MergePatch, ResourceError,
};
use resourcekit::schema::{FieldSpec, Schema};
use resourcekit::store::InMemoryStore;
use serde_json::{json, Value};
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

fn post_schema() -> Arc<Schema> {
    Arc::new(
        Schema::new("post", "posts")
            .with_id()
            .with_timestamps()
            .with_property("title", FieldSpec::string())
            .with_property("body", FieldSpec::string())
            .with_property("meta", FieldSpec::object(Default::default()))
            .requiring(["title"]),
    )
}

fn setup() -> (Arc<InMemoryStore>, DocumentMutator) {
    let store = Arc::new(InMemoryStore::new());
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    let mutator = DocumentMutator::new(post_schema(), store.clone())
        .unwrap()
        .with_clock(Arc::new(clock));
    (store, mutator)
}

/// Open schema declaring no timestamps
fn note_mutator() -> DocumentMutator {
    let schema = Schema::new("note", "notes").with_property("title", FieldSpec::string());
    DocumentMutator::new(Arc::new(schema), Arc::new(InMemoryStore::new())).unwrap()
}

fn missing_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[tokio::test]
async fn test_create_find_round_trip() {
    let (_store, mutator) = setup();

    let created = mutator.create(json!({ "title": "Hello" })).await.unwrap();
    let found = mutator.find(&created.id.to_string()).await.unwrap();

    assert_eq!(found, created);
    assert_eq!(found.fields["createdAt"], json!("2024-03-01T12:30:00.000Z"));
    assert_eq!(found.fields["createdAt"], found.fields["updatedAt"]);
}

#[tokio::test]
async fn test_update_keeps_created_at() {
    let (store, mutator) = setup();
    let created = mutator.create(json!({ "title": "Hello" })).await.unwrap();

    let later = FixedClock(Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap());
    let mutator = DocumentMutator::new(post_schema(), store)
        .unwrap()
        .with_clock(Arc::new(later));

    let patch = MergePatch::from_value(json!({ "body": "text" })).unwrap();
    let updated = mutator.update(&created.id.to_string(), patch).await.unwrap();

    assert_eq!(updated.fields["createdAt"], json!("2024-03-01T12:30:00.000Z"));
    assert_eq!(updated.fields["updatedAt"], json!("2024-03-02T08:00:00.000Z"));
}

#[tokio::test]
async fn test_replace_keeps_undeclared_timestamps() {
    let mutator = note_mutator();
    let created = mutator
        .create(json!({
            "title": "a",
            "createdAt": "2020-01-01T00:00:00.000Z",
            "updatedAt": "2020-01-02T00:00:00.000Z",
        }))
        .await
        .unwrap();
    let id = created.id.to_string();

    let replaced = mutator
        .replace(&id, json!({ "title": "b", "createdAt": "1999-01-01T00:00:00.000Z" }))
        .await
        .unwrap();

    assert_eq!(
        Value::Object(replaced.fields.clone()),
        json!({
            "title": "b",
            "createdAt": "2020-01-01T00:00:00.000Z",
            "updatedAt": "2020-01-02T00:00:00.000Z",
        })
    );
    assert_eq!(mutator.find(&id).await.unwrap(), replaced);
}

// =============================================================================
// Merge Patch Tests
// =============================================================================

#[tokio::test]
async fn test_merge_patch_on_stored_document() {
    let mutator = note_mutator();
    let created = mutator
        .create(json!({ "foo": { "bar": "baz" }, "boo": "hoo" }))
        .await
        .unwrap();
    let id = created.id.to_string();

    let patch = MergePatch::from_value(json!({ "foo": { "bar": null }, "boo": null })).unwrap();
    let updated = mutator.update(&id, patch).await.unwrap();

    assert_eq!(Value::Object(updated.fields.clone()), json!({ "foo": {} }));
    assert_eq!(mutator.find(&id).await.unwrap().fields, updated.fields);
}

#[tokio::test]
async fn test_merge_patch_deletes_nested_nulls() {
    let (_store, mutator) = setup();
    let created = mutator
        .create(json!({ "title": "Hello", "body": "boo", "meta": { "bar": 1, "keep": true } }))
        .await
        .unwrap();

    let patch = MergePatch::from_value(json!({ "meta": { "bar": null }, "body": null })).unwrap();
    let updated = mutator.update(&created.id.to_string(), patch).await.unwrap();

    assert_eq!(updated.fields["meta"], json!({ "keep": true }));
    assert!(!updated.fields.contains_key("body"));
    assert_eq!(updated.fields["title"], json!("Hello"));
}

#[tokio::test]
async fn test_merge_patch_replay_is_idempotent() {
    let (_store, mutator) = setup();
    let created = mutator
        .create(json!({ "title": "Hello", "meta": { "a": 1 } }))
        .await
        .unwrap();
    let id = created.id.to_string();
    let patch = json!({ "meta": { "a": null, "b": [1, null] }, "title": "Again" });

    let once = mutator
        .update(&id, MergePatch::from_value(patch.clone()).unwrap())
        .await
        .unwrap();
    let twice = mutator
        .update(&id, MergePatch::from_value(patch).unwrap())
        .await
        .unwrap();

    assert_eq!(once.fields, twice.fields);
    assert_eq!(twice.fields["meta"], json!({ "b": [1, null] }));
}

// =============================================================================
// NotFound Ordering Tests
// =============================================================================

#[tokio::test]
async fn test_not_found_before_validation() {
    let (_store, mutator) = setup();
    let invalid = json!({ "title": 42 });

    let err = mutator.replace(&missing_id(), invalid.clone()).await.unwrap_err();
    assert!(err.is_not_found());

    let patch = MergePatch::from_value(invalid).unwrap();
    let err = mutator.update(&missing_id(), patch).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);

    let err = mutator.delete(&missing_id()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_malformed_id_is_not_found() {
    let (_store, mutator) = setup();
    let err = mutator.find("not-a-uuid").await.unwrap_err();
    assert!(matches!(err, ResourceError::NotFound { ref id, .. } if id == "not-a-uuid"));
}

#[tokio::test]
async fn test_delete_returns_last_value() {
    let (store, mutator) = setup();
    let created = mutator.create(json!({ "title": "Bye" })).await.unwrap();

    let removed = mutator.delete(&created.id.to_string()).await.unwrap();
    assert_eq!(removed, created);
    assert_eq!(store.table_len("posts").await, 0);
}

// =============================================================================
// Hook Tests
// =============================================================================

fn recording_hooks(log: &Arc<Mutex<Vec<String>>>, failing_post_save: bool) -> Hooks {
    let mut hooks = Hooks::new();

    let pre_validate = Arc::clone(log);
    hooks.pre_validate("stamp", move |fields| {
        let log = Arc::clone(&pre_validate);
        Box::pin(async move {
            fields.insert("body".into(), json!("filled in"));
            log.lock().unwrap().push("pre validate 1".to_string());
            Ok(())
        })
    });

    let pre_save = Arc::clone(log);
    hooks.pre_save("audit", move |_| {
        let log = Arc::clone(&pre_save);
        Box::pin(async move {
            log.lock().unwrap().push("pre save 1".to_string());
            Ok(())
        })
    });

    let post_save = Arc::clone(log);
    hooks.post_save("notify", move |_| {
        let log = Arc::clone(&post_save);
        Box::pin(async move {
            log.lock().unwrap().push("post save 1".to_string());
            if failing_post_save {
                return Err::<(), BoxError>("mailer down".into());
            }
            Ok(())
        })
    });

    hooks
}

#[tokio::test]
async fn test_hooks_run_in_stage_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (_store, mutator) = setup();
    let mut mutator = mutator.with_hooks(recording_hooks(&log, false));
    assert_eq!(mutator.hooks_mut().count(HookStage::PreSave), 1);

    let created = mutator.create(json!({ "title": "Hooked" })).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["pre validate 1", "pre save 1", "post save 1"]
    );
    assert_eq!(created.fields["body"], json!("filled in"));
}

#[tokio::test]
async fn test_validation_failure_never_persists() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (store, mutator) = setup();
    let mutator = mutator.with_hooks(recording_hooks(&log, false));

    let err = mutator.create(json!({ "title": ["not", "a", "string"] })).await.unwrap_err();

    assert_eq!(err.status_code(), 422);
    assert_eq!(err.to_string(), "`title` must be string");
    assert_eq!(*log.lock().unwrap(), vec!["pre validate 1"]);
    assert_eq!(store.table_len("posts").await, 0);
}

#[tokio::test]
async fn test_post_save_failure_after_commit() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (store, mutator) = setup();
    let mutator = mutator.with_hooks(recording_hooks(&log, true));

    let err = mutator.create(json!({ "title": "Committed" })).await.unwrap_err();

    assert!(matches!(err, ResourceError::Hook(ref e) if e.stage == HookStage::PostSave));
    assert_eq!(err.status_code(), 500);
    assert_eq!(store.table_len("posts").await, 1);

    let stored = mutator.all(&Default::default()).await.unwrap();
    assert_eq!(stored[0].fields["title"], Value::from("Committed"));
}
