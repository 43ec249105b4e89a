//! End-to-end pipeline scenarios against the in-memory collaborators.

use app_state::AppSettings;
use chrono::Utc;
use common_services::state::{Pagination, StateStore};
use common_services::testing::{MemoryEventBus, MemoryMediaStore, MemoryStateStore};
use common_types::{
    AnalysisStatus, CHANNEL_PHOTO_ANALYZED, CHANNEL_PHOTO_DELETED, PhotoAnalyzed, PhotoUploaded,
};
use face_engine::FaceExtractor;
use face_engine::testing::{FlakyExtractor, ScriptedExtractor, face_with_embedding};
use std::sync::Arc;
use uuid::Uuid;
use worker::context::WorkerContext;
use worker::handlers::handle_event;
use worker::pipeline::{UploadOutcome, process_upload};

const IMAGE: &[u8] = b"fake-jpeg-bytes";
const LOCATION: &str = "uploads/2026/photo.jpg";

fn test_settings(threshold: f32) -> AppSettings {
    app_state::settings_from_yaml(&format!(
        r"
api:
  host: 127.0.0.1
  port: 8000
  public_url: http://localhost:8000
  allowed_origins: []
logging:
  level: info
database:
  max_connections: 5
  min_connections: 1
  max_lifetime: 1800
  idle_timeout: 600
  acquire_timeout: 30
worker:
  max_attempts: 3
  operation_timeout_secs: 5
  stale_claim_secs: 600
matcher:
  similarity_threshold: {threshold}
  embedding_dim: 128
inference:
  url: http://localhost:8500
  timeout_secs: 5
storage:
  kind: local
  media_folder: .
secrets:
  database_url: postgres://localhost/unused
"
    ))
    .expect("test settings parse")
}

struct Harness {
    ctx: WorkerContext,
    store: Arc<MemoryStateStore>,
    media: Arc<MemoryMediaStore>,
    events: Arc<MemoryEventBus>,
}

fn harness(threshold: f32, media: MemoryMediaStore, extractor: Arc<dyn FaceExtractor>) -> Harness {
    let store = Arc::new(MemoryStateStore::new());
    let media = Arc::new(media);
    let events = Arc::new(MemoryEventBus::new());
    let ctx = WorkerContext {
        worker_id: "test-wrk".to_owned(),
        settings: test_settings(threshold),
        store: store.clone(),
        media: media.clone(),
        extractor,
        events: events.clone(),
    };
    Harness {
        ctx,
        store,
        media,
        events,
    }
}

fn upload(owner: Uuid) -> PhotoUploaded {
    PhotoUploaded {
        photo_id: Uuid::new_v4(),
        owner_id: owner,
        storage_location: LOCATION.to_owned(),
    }
}

fn scripted(embedding: Vec<f32>) -> Arc<ScriptedExtractor> {
    Arc::new(ScriptedExtractor::new().with_image(IMAGE, vec![face_with_embedding(embedding)]))
}

fn analyzed_events(harness: &Harness) -> Vec<PhotoAnalyzed> {
    harness.events.published_on(CHANNEL_PHOTO_ANALYZED)
}

#[tokio::test]
async fn clear_match_is_auto_assigned() {
    let owner = Uuid::new_v4();
    // cos([1, 0], [0.92, 0.392]) ≈ 0.92, comfortably above the 0.6 floor.
    let extractor = scripted(vec![0.92, 0.392]);
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        extractor,
    );

    let person = h.store.add_person(owner);
    h.store
        .add_assigned_face(owner, Uuid::new_v4(), person, vec![1.0, 0.0], Utc::now());

    let event = upload(owner);
    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert_eq!(outcome, UploadOutcome::Completed { face_count: 1 });

    let analysis = h.store.analysis(event.photo_id).expect("analysis row");
    assert_eq!(analysis.status, AnalysisStatus::Complete);
    assert_eq!(analysis.face_count, 1);

    let faces = h.store.faces_for_media(event.photo_id);
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].person_id, Some(person));

    let assignment = h
        .store
        .assignment(event.photo_id, person)
        .expect("assignment created automatically");
    assert!(!assignment.confirmed);

    let published = analyzed_events(&h);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].photo_id, event.photo_id);
    assert_eq!(published[0].face_count, 1);
    assert_eq!(published[0].status, AnalysisStatus::Complete);
}

#[tokio::test]
async fn weak_match_stays_unassigned() {
    let owner = Uuid::new_v4();
    // cos([1, 0], [0.3, 0.954]) ≈ 0.3, below the floor.
    let extractor = scripted(vec![0.3, 0.954]);
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        extractor,
    );

    let person = h.store.add_person(owner);
    h.store
        .add_assigned_face(owner, Uuid::new_v4(), person, vec![1.0, 0.0], Utc::now());

    let event = upload(owner);
    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert_eq!(outcome, UploadOutcome::Completed { face_count: 1 });

    let faces = h.store.faces_for_media(event.photo_id);
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].person_id, None);
    assert!(h.store.assignments_for_media(event.photo_id).is_empty());

    // The face is waiting in the manual review queue.
    let unassigned = h
        .store
        .unassigned_faces(owner, Pagination::default())
        .await
        .expect("list");
    assert_eq!(unassigned.len(), 1);
    assert_eq!(unassigned[0].id, faces[0].id);
}

#[tokio::test]
async fn unreadable_image_fails_without_face_rows() {
    let owner = Uuid::new_v4();
    // The extractor knows nothing about these bytes: undecodable image.
    let extractor = Arc::new(ScriptedExtractor::new());
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        extractor.clone(),
    );

    let event = upload(owner);
    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert!(matches!(outcome, UploadOutcome::Failed { .. }));

    let analysis = h.store.analysis(event.photo_id).expect("analysis row");
    assert_eq!(analysis.status, AnalysisStatus::Failed);
    let message = analysis.error_message.expect("error message populated");
    assert!(message.contains("face extraction failed"));

    assert!(h.store.faces_for_media(event.photo_id).is_empty());

    // Undecodable input is not retried.
    assert_eq!(extractor.calls(), 1);

    // A failure-flavored event, never a COMPLETE one.
    let published = analyzed_events(&h);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].status, AnalysisStatus::Failed);
    assert_eq!(published[0].face_count, 0);
}

#[tokio::test]
async fn duplicate_delivery_is_discarded() {
    let owner = Uuid::new_v4();
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        scripted(vec![0.1, 0.2]),
    );

    let event = upload(owner);
    let first = process_upload(&h.ctx, &event).await.expect("first");
    assert_eq!(first, UploadOutcome::Completed { face_count: 1 });

    let second = process_upload(&h.ctx, &event).await.expect("second");
    assert_eq!(second, UploadOutcome::Discarded);

    // No duplicated face rows, no second terminal event.
    assert_eq!(h.store.faces_for_media(event.photo_id).len(), 1);
    assert_eq!(analyzed_events(&h).len(), 1);
}

#[tokio::test]
async fn concurrent_claims_grant_exactly_one_winner() {
    let h = harness(0.6, MemoryMediaStore::new(), Arc::new(ScriptedExtractor::new()));
    let media_id = Uuid::new_v4();
    h.store
        .ensure_pending(media_id, Uuid::new_v4())
        .await
        .expect("pending");

    let stale_after = h.ctx.settings.worker.stale_claim_age();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = h.store.clone();
        handles.push(tokio::spawn(async move {
            store
                .claim_for_processing(media_id, stale_after)
                .await
                .expect("claim")
        }));
    }

    let mut won = 0;
    for handle in handles {
        if handle.await.expect("join") {
            won += 1;
        }
    }
    assert_eq!(won, 1);
}

#[tokio::test]
async fn matches_never_cross_owner_boundaries() {
    let owner_a = Uuid::new_v4();
    let owner_b = Uuid::new_v4();
    // Identical embedding, so similarity would be 1.0 if owners could mix.
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        scripted(vec![1.0, 0.0]),
    );

    let person_b = h.store.add_person(owner_b);
    h.store
        .add_assigned_face(owner_b, Uuid::new_v4(), person_b, vec![1.0, 0.0], Utc::now());

    let event = upload(owner_a);
    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert_eq!(outcome, UploadOutcome::Completed { face_count: 1 });

    let faces = h.store.faces_for_media(event.photo_id);
    assert_eq!(faces[0].person_id, None);
    assert!(h.store.assignments_for_media(event.photo_id).is_empty());
}

#[tokio::test]
async fn similarity_exactly_at_threshold_matches() {
    let owner = Uuid::new_v4();
    // cos([1,0,0,0], [1,1,1,1]) = 1/2, exactly representable.
    let extractor = scripted(vec![1.0, 0.0, 0.0, 0.0]);
    let h = harness(
        0.5,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        extractor,
    );

    let person = h.store.add_person(owner);
    h.store.add_assigned_face(
        owner,
        Uuid::new_v4(),
        person,
        vec![1.0, 1.0, 1.0, 1.0],
        Utc::now(),
    );

    let event = upload(owner);
    process_upload(&h.ctx, &event).await.expect("process");
    let faces = h.store.faces_for_media(event.photo_id);
    assert_eq!(faces[0].person_id, Some(person));
}

#[tokio::test]
async fn similarity_just_below_threshold_does_not_match() {
    let owner = Uuid::new_v4();
    let extractor = scripted(vec![1.0, 0.0, 0.0, 0.0]);
    // Same corpus, floor nudged above 1/2.
    let h = harness(
        0.500_001,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        extractor,
    );

    let person = h.store.add_person(owner);
    h.store.add_assigned_face(
        owner,
        Uuid::new_v4(),
        person,
        vec![1.0, 1.0, 1.0, 1.0],
        Utc::now(),
    );

    let event = upload(owner);
    process_upload(&h.ctx, &event).await.expect("process");
    let faces = h.store.faces_for_media(event.photo_id);
    assert_eq!(faces[0].person_id, None);
}

#[tokio::test(start_paused = true)]
async fn transient_storage_failures_are_retried_with_backoff() {
    let owner = Uuid::new_v4();
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        scripted(vec![0.1, 0.2]),
    );
    // Two failures fit inside the three-attempt budget.
    h.media.fail_next_fetches(2);

    let event = upload(owner);
    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert_eq!(outcome, UploadOutcome::Completed { face_count: 1 });
}

#[tokio::test(start_paused = true)]
async fn storage_failures_beyond_the_budget_fail_the_photo() {
    let owner = Uuid::new_v4();
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        scripted(vec![0.1, 0.2]),
    );
    h.media.fail_next_fetches(10);

    let event = upload(owner);
    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert!(matches!(outcome, UploadOutcome::Failed { .. }));

    let analysis = h.store.analysis(event.photo_id).expect("analysis row");
    assert_eq!(analysis.status, AnalysisStatus::Failed);
    assert!(
        analysis
            .error_message
            .expect("message")
            .contains("storage retrieval failed")
    );
}

#[tokio::test(start_paused = true)]
async fn transient_inference_outage_is_retried() {
    let owner = Uuid::new_v4();
    let inner = ScriptedExtractor::new().with_image(IMAGE, vec![face_with_embedding(vec![0.5, 0.5])]);
    let flaky = Arc::new(FlakyExtractor::new(inner, 1));
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        flaky,
    );

    let event = upload(owner);
    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert_eq!(outcome, UploadOutcome::Completed { face_count: 1 });
}

#[tokio::test]
async fn stale_claims_can_be_retaken() {
    let owner = Uuid::new_v4();
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        scripted(vec![0.1, 0.2]),
    );

    let event = upload(owner);
    let stale_after = h.ctx.settings.worker.stale_claim_age();

    // A worker claimed the photo and died without reaching a terminal
    // state; its claim has aged past the threshold.
    h.store
        .ensure_pending(event.photo_id, owner)
        .await
        .expect("pending");
    assert!(
        h.store
            .claim_for_processing(event.photo_id, stale_after)
            .await
            .expect("claim")
    );
    h.store
        .backdate_claim(event.photo_id, stale_after + std::time::Duration::from_secs(60));

    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert_eq!(outcome, UploadOutcome::Completed { face_count: 1 });
}

#[tokio::test]
async fn fresh_claims_are_not_retaken() {
    let owner = Uuid::new_v4();
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        scripted(vec![0.1, 0.2]),
    );

    let event = upload(owner);
    h.store
        .ensure_pending(event.photo_id, owner)
        .await
        .expect("pending");
    assert!(
        h.store
            .claim_for_processing(event.photo_id, h.ctx.settings.worker.stale_claim_age())
            .await
            .expect("claim")
    );

    // Another worker is actively processing; the event is a duplicate.
    let outcome = process_upload(&h.ctx, &event).await.expect("process");
    assert_eq!(outcome, UploadOutcome::Discarded);
}

#[tokio::test]
async fn deleted_photo_event_removes_derived_records() {
    let owner = Uuid::new_v4();
    let h = harness(
        0.6,
        MemoryMediaStore::new().with_object(LOCATION, IMAGE),
        scripted(vec![0.1, 0.2]),
    );

    let event = upload(owner);
    process_upload(&h.ctx, &event).await.expect("process");
    assert!(h.store.analysis(event.photo_id).is_some());

    handle_event(
        &h.ctx,
        common_services::events::IncomingEvent {
            channel: CHANNEL_PHOTO_DELETED.to_owned(),
            payload: format!(r#"{{"photoId":"{}"}}"#, event.photo_id),
        },
    )
    .await;

    assert!(h.store.analysis(event.photo_id).is_none());
    assert!(h.store.faces_for_media(event.photo_id).is_empty());
}

#[tokio::test]
async fn malformed_payloads_are_ignored() {
    let h = harness(0.6, MemoryMediaStore::new(), Arc::new(ScriptedExtractor::new()));
    handle_event(
        &h.ctx,
        common_services::events::IncomingEvent {
            channel: "photo:uploaded".to_owned(),
            payload: "not json".to_owned(),
        },
    )
    .await;
    // Nothing to assert beyond "did not panic and wrote no state".
    assert!(h.events.published().is_empty());
}
