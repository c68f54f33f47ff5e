use chrono::Duration;
use std::sync::Arc;

use crate::db::models::{derive_output_key, id_to_sort_key, sort_key_to_id, S3Location, Size};
use crate::db::sqlite::SqliteProjectBackend;
use crate::db::state::ProjectState;
use crate::db::{FakeProjectBackend, ProjectBackend, ProjectStore, StoreError};
use crate::test_utils::{test_hint, test_size};

// Type alias to simplify the backend factory type
type BackendFactory = Box<dyn Fn() -> Arc<dyn ProjectBackend>>;

/// Every test runs against both the fake and an in-memory SQLite backend.
fn get_test_backends() -> Vec<BackendFactory> {
    vec![
        Box::new(|| Arc::new(FakeProjectBackend::new())),
        Box::new(|| {
            Arc::new(
                SqliteProjectBackend::new(":memory:")
                    .expect("Failed to create in-memory SQLite backend"),
            )
        }),
    ]
}

fn store_with(backend: Arc<dyn ProjectBackend>, max_track_hints: usize) -> ProjectStore {
    ProjectStore::new(backend, max_track_hints)
}

fn test_location(key: &str) -> S3Location {
    S3Location {
        bucket: "test-bucket".to_string(),
        key: key.to_string(),
    }
}

#[tokio::test]
async fn create_sets_initial_fields_and_expiry() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);

        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        assert_eq!(project.owner_id, "u1");
        assert_eq!(project.title, "My clip");
        assert_eq!(project.state, ProjectState::Created);
        assert_eq!(project.size, test_size());
        assert_eq!(
            project.expires_at,
            project.created_at + Duration::seconds(172_800)
        );
        assert!(project.input_file.is_none());
        assert!(project.output_file.is_none());
        assert!(project.tracker_options.is_none());
        assert_eq!(project.version, 1);
    }
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);

        let empty_title = store.create("u1", "   ", test_size()).await;
        assert!(matches!(empty_title, Err(StoreError::Validation(_))));

        let zero_size = store
            .create(
                "u1",
                "My clip",
                Size {
                    width: 0,
                    height: 1280,
                },
            )
            .await;
        assert!(matches!(zero_size, Err(StoreError::Validation(_))));
    }
}

#[tokio::test]
async fn get_missing_project_is_not_found() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);

        let result = store.get("u1", "nonexistent").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}

#[tokio::test]
async fn cross_owner_access_is_not_found() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);

        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        // Another owner must not be able to observe the project at all.
        let result = store.get("u2", &project.id).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.list("u2").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn list_orders_by_last_modified_descending() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);

        let first = store.create("u1", "first", test_size()).await.unwrap();
        let _second = store.create("u1", "second", test_size()).await.unwrap();
        let _third = store.create("u1", "third", test_size()).await.unwrap();

        // Persisted timestamps have whole-second precision, so make sure the
        // touch lands in a later second than the creates.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        // Touching the oldest project moves it to the front of the list.
        store
            .append_track_hint("u1", &first.id, test_hint(1.0))
            .await
            .unwrap();

        let listed = store.list("u1").await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, first.id);
        assert!(listed[0].last_modified_at >= listed[1].last_modified_at);
        assert!(listed[1].last_modified_at >= listed[2].last_modified_at);
    }
}

#[tokio::test]
async fn update_files_merges_without_clobbering() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        let input = test_location("tmp/u1/p1/in.mp4");
        let output = test_location("tmp/u1/p1/out/in.mp4");
        store
            .update_files("u1", &project.id, Some(input.clone()), Some(output.clone()))
            .await
            .unwrap();

        // A later update that only carries an input file must not clear the
        // stored output file.
        let new_input = test_location("tmp/u1/p1/in2.mp4");
        let updated = store
            .update_files("u1", &project.id, Some(new_input.clone()), None)
            .await
            .unwrap();

        assert_eq!(updated.input_file, Some(new_input));
        assert_eq!(updated.output_file, Some(output));

        let fetched = store.get("u1", &project.id).await.unwrap();
        assert_eq!(fetched.input_file, updated.input_file);
        assert_eq!(fetched.output_file, updated.output_file);
    }
}

#[tokio::test]
async fn update_files_on_missing_project_is_not_found() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);

        let result = store
            .update_files("u1", "nonexistent", Some(test_location("in.mp4")), None)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}

#[tokio::test]
async fn append_track_hint_preserves_insertion_order() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        let hints = [test_hint(1.0), test_hint(2.5), test_hint(2.5)];
        for hint in &hints {
            store
                .append_track_hint("u1", &project.id, hint.clone())
                .await
                .unwrap();
        }

        let stored = store.get("u1", &project.id).await.unwrap();
        let stored_hints = stored
            .tracker_options
            .unwrap()
            .track_hints
            .unwrap();
        // Duplicates are allowed; the log is pure append.
        assert_eq!(stored_hints.as_slice(), &hints);
    }
}

#[tokio::test]
async fn append_track_hint_rejects_malformed_hints() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        let mut negative_time = test_hint(1.0);
        negative_time.time_secs = -0.5;
        let result = store
            .append_track_hint("u1", &project.id, negative_time)
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let mut out_of_range = test_hint(1.0);
        out_of_range.normalized_box = [0.2, 0.2, 1.5, 0.5];
        let result = store
            .append_track_hint("u1", &project.id, out_of_range)
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }
}

#[tokio::test]
async fn append_track_hint_enforces_cap_loudly() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 2);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        store
            .append_track_hint("u1", &project.id, test_hint(1.0))
            .await
            .unwrap();
        store
            .append_track_hint("u1", &project.id, test_hint(2.0))
            .await
            .unwrap();

        let result = store
            .append_track_hint("u1", &project.id, test_hint(3.0))
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        // The hint must be rejected, not silently dropped: the stored log is
        // unchanged.
        let stored = store.get("u1", &project.id).await.unwrap();
        assert_eq!(
            stored.tracker_options.unwrap().track_hints.unwrap().len(),
            2
        );
    }
}

#[tokio::test]
async fn set_state_enforces_transition_preconditions() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        // Created -> Ready requires both file references.
        let result = store.set_state("u1", &project.id, ProjectState::Ready).await;
        assert!(matches!(result, Err(StoreError::Precondition(_))));

        store
            .update_files(
                "u1",
                &project.id,
                Some(test_location("tmp/u1/p/in.mp4")),
                Some(test_location("tmp/u1/p/out/in.mp4")),
            )
            .await
            .unwrap();
        let ready = store
            .set_state("u1", &project.id, ProjectState::Ready)
            .await
            .unwrap();
        assert_eq!(ready.state, ProjectState::Ready);

        // Ready -> Processing additionally requires tracker options.
        let result = store
            .set_state("u1", &project.id, ProjectState::Processing)
            .await;
        assert!(matches!(result, Err(StoreError::Precondition(_))));

        store
            .append_track_hint("u1", &project.id, test_hint(1.0))
            .await
            .unwrap();
        let processing = store
            .set_state("u1", &project.id, ProjectState::Processing)
            .await
            .unwrap();
        assert_eq!(processing.state, ProjectState::Processing);
    }
}

#[tokio::test]
async fn set_state_rejects_backwards_and_skipping_transitions() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        // Created -> Processing skips the Ready gate.
        let result = store
            .set_state("u1", &project.id, ProjectState::Processing)
            .await;
        assert!(matches!(result, Err(StoreError::IllegalTransition { .. })));

        store
            .update_files(
                "u1",
                &project.id,
                Some(test_location("in.mp4")),
                Some(test_location("out.mp4")),
            )
            .await
            .unwrap();
        store
            .set_state("u1", &project.id, ProjectState::Ready)
            .await
            .unwrap();

        // Backwards is never legal.
        let result = store.set_state("u1", &project.id, ProjectState::Created).await;
        assert!(matches!(result, Err(StoreError::IllegalTransition { .. })));
    }
}

#[tokio::test]
async fn set_state_error_reachable_from_non_terminal_only() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        let failed = store
            .set_state("u1", &project.id, ProjectState::Error)
            .await
            .unwrap();
        assert_eq!(failed.state, ProjectState::Error);

        // Terminal states accept nothing further.
        let result = store
            .set_state("u1", &project.id, ProjectState::Ready)
            .await;
        assert!(matches!(result, Err(StoreError::IllegalTransition { .. })));
    }
}

#[tokio::test]
async fn set_state_same_state_is_a_noop() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        let before = store.get("u1", &project.id).await.unwrap();
        let after = store
            .set_state("u1", &project.id, ProjectState::Created)
            .await
            .unwrap();
        assert_eq!(after.version, before.version);
    }
}

#[tokio::test]
async fn delete_is_idempotent() {
    for factory in get_test_backends() {
        let store = store_with(factory(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        store.delete("u1", &project.id).await.unwrap();
        assert!(matches!(
            store.get("u1", &project.id).await,
            Err(StoreError::NotFound(_))
        ));

        // Deleting again is not an error.
        store.delete("u1", &project.id).await.unwrap();
    }
}

#[tokio::test]
async fn backend_update_detects_version_conflicts() {
    for factory in get_test_backends() {
        let backend = factory();
        let store = store_with(backend.clone(), 100);
        let project = store.create("u1", "My clip", test_size()).await.unwrap();

        // A concurrent writer bumps the version first.
        store
            .append_track_hint("u1", &project.id, test_hint(1.0))
            .await
            .unwrap();

        // Writing back through the stale version must fail, not clobber.
        let mut stale = project.clone();
        stale.title = "stale write".to_string();
        let result = backend.update(&stale, project.version).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        let stored = store.get("u1", &project.id).await.unwrap();
        assert_eq!(stored.title, "My clip");
    }
}

#[tokio::test]
async fn store_append_retries_after_lost_race() {
    // The CAS loop in the store re-reads and reapplies the mutation, so an
    // append raced by another writer is retried instead of lost.
    let backend = FakeProjectBackend::new();
    let store = store_with(Arc::new(backend.clone()), 100);
    let project = store.create("u1", "My clip", test_size()).await.unwrap();

    backend.fake_conflict_next_updates(1);
    let updated = store
        .append_track_hint("u1", &project.id, test_hint(1.0))
        .await
        .unwrap();
    assert_eq!(
        updated.tracker_options.unwrap().track_hints.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn store_gives_up_after_repeated_conflicts() {
    let backend = FakeProjectBackend::new();
    let store = store_with(Arc::new(backend.clone()), 100);
    let project = store.create("u1", "My clip", test_size()).await.unwrap();

    backend.fake_conflict_next_updates(10);
    let result = store
        .append_track_hint("u1", &project.id, test_hint(1.0))
        .await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[test]
fn sort_key_encoding_round_trips() {
    let sort_key = id_to_sort_key("abc-123");
    assert_eq!(sort_key, "project#abc-123");
    assert_eq!(sort_key_to_id(&sort_key), "abc-123");
}

#[test]
fn output_key_derivation_matches_convention() {
    assert_eq!(
        derive_output_key("tmp", "u1", "p1", "tmp/u1/p1/video.mov"),
        "tmp/u1/p1/out/video.mp4"
    );
    // Extension is always rewritten to .mp4.
    assert_eq!(
        derive_output_key("tmp", "u2", "p2", "uploads/clip.final.mp4"),
        "tmp/u2/p2/out/clip.final.mp4"
    );
}

#[test]
fn state_transition_table() {
    use ProjectState::*;

    assert!(Created.can_transition_to(Ready));
    assert!(Ready.can_transition_to(Processing));
    assert!(Processing.can_transition_to(Completed));

    assert!(Created.can_transition_to(Error));
    assert!(Ready.can_transition_to(Error));
    assert!(Processing.can_transition_to(Error));
    assert!(!Completed.can_transition_to(Error));
    assert!(!Error.can_transition_to(Error));

    assert!(!Created.can_transition_to(Processing));
    assert!(!Processing.can_transition_to(Ready));
    assert!(!Completed.can_transition_to(Processing));
}

#[test]
fn project_record_serialization_is_stable() {
    let mut project = crate::db::models::Project::new("u1", "My clip", test_size());
    project.tracker_options = Some(crate::db::models::TrackerOptions {
        exclude_limbs: Some(true),
        padding_ratio: None,
        smoothing_window_secs: None,
        track_hints: Some(vec![test_hint(3.5)]),
    });

    let json = serde_json::to_value(&project).unwrap();
    assert_eq!(json["ownerId"], "u1");
    assert_eq!(json["state"], "Created");
    assert!(json["createdAt"].is_i64());
    assert_eq!(
        json["expiresAt"].as_i64().unwrap() - json["createdAt"].as_i64().unwrap(),
        172_800
    );
    assert_eq!(json["trackerOptions"]["excludeLimbs"], true);
    assert_eq!(json["trackerOptions"]["trackHints"][0]["timeSecs"], 3.5);
    assert!(json["trackerOptions"]["trackHints"][0]["normalizedBox"].is_array());

    // Timestamps persist at whole-second precision, so compare fields
    // rather than whole records.
    let parsed: crate::db::models::Project = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.id, project.id);
    assert_eq!(parsed.owner_id, project.owner_id);
    assert_eq!(parsed.state, project.state);
    assert_eq!(parsed.size, project.size);
    assert_eq!(parsed.created_at.timestamp(), project.created_at.timestamp());
    assert_eq!(parsed.tracker_options, project.tracker_options);
}
