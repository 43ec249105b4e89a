use crate::api::faces::error::FaceError;
use crate::api::faces::interfaces::{
    AssignFaceResponse, IgnoreFaceResponse, UnassignFaceResponse,
};
use crate::database::tables::UnassignedFace;
use crate::events::{EventPublisher, publish_event};
use crate::state::{FaceRef, Pagination, StateStore};
use common_types::{CHANNEL_PHOTO_REINDEX, PhotoReindex};
use tracing::{info, warn};
use uuid::Uuid;

/// Confirm a face-to-person binding on behalf of `owner_id`.
///
/// Validation happens before any write: unknown faces and persons are
/// rejected, cross-owner bindings are refused, and a face already linked to
/// a *different* person must be unassigned first. Re-confirming the same
/// person is an idempotent no-op on the assignment row.
pub async fn assign_face<S, P>(
    store: &S,
    events: &P,
    owner_id: Uuid,
    face_id: Uuid,
    person_id: Uuid,
) -> Result<AssignFaceResponse, FaceError>
where
    S: StateStore + ?Sized,
    P: EventPublisher + ?Sized,
{
    let face = owned_face(store, owner_id, face_id).await?;

    let Some(person_owner) = store.person_owner(person_id).await? else {
        return Err(FaceError::PersonNotFound(person_id));
    };
    if person_owner != face.owner_id {
        return Err(FaceError::CrossOwner);
    }

    if let Some(current) = face.person_id
        && current != person_id
    {
        return Err(FaceError::AlreadyAssigned);
    }

    store.confirm_assignment(&face, person_id).await?;
    info!("Assigned face {face_id} to person {person_id}");

    emit_reindex(events, face.media_id).await;

    Ok(AssignFaceResponse {
        face_id,
        person_id,
        photo_id: face.media_id,
    })
}

/// Clear a face's person link. The confirmed assignment history for the
/// photo is deliberately kept; only the advisory link goes away.
pub async fn unassign_face<S, P>(
    store: &S,
    events: &P,
    owner_id: Uuid,
    face_id: Uuid,
) -> Result<UnassignFaceResponse, FaceError>
where
    S: StateStore + ?Sized,
    P: EventPublisher + ?Sized,
{
    let face = owned_face(store, owner_id, face_id).await?;

    store.clear_face_person(face_id).await?;
    info!("Unassigned face {face_id}");

    emit_reindex(events, face.media_id).await;

    Ok(UnassignFaceResponse {
        face_id,
        photo_id: face.media_id,
    })
}

/// Hide a face from the unassigned queue.
pub async fn ignore_face<S>(
    store: &S,
    owner_id: Uuid,
    face_id: Uuid,
) -> Result<IgnoreFaceResponse, FaceError>
where
    S: StateStore + ?Sized,
{
    owned_face(store, owner_id, face_id).await?;
    store.ignore_face(owner_id, face_id).await?;
    Ok(IgnoreFaceResponse { face_id })
}

pub async fn list_unassigned<S>(
    store: &S,
    owner_id: Uuid,
    page: Pagination,
) -> Result<Vec<UnassignedFace>, FaceError>
where
    S: StateStore + ?Sized,
{
    Ok(store.unassigned_faces(owner_id, page).await?)
}

/// Resolve a face and verify the requester owns the photo it belongs to.
/// Foreign faces are indistinguishable from missing ones.
async fn owned_face<S>(store: &S, owner_id: Uuid, face_id: Uuid) -> Result<FaceRef, FaceError>
where
    S: StateStore + ?Sized,
{
    let Some(face) = store.face_ref(face_id).await? else {
        return Err(FaceError::FaceNotFound(face_id));
    };
    if face.owner_id != owner_id {
        return Err(FaceError::FaceNotFound(face_id));
    }
    Ok(face)
}

/// The mutation already committed; a lost reindex notification is logged,
/// not surfaced to the caller.
async fn emit_reindex<P>(events: &P, photo_id: Uuid)
where
    P: EventPublisher + ?Sized,
{
    let event = PhotoReindex { photo_id };
    if let Err(e) = publish_event(events, CHANNEL_PHOTO_REINDEX, &event).await {
        warn!("Failed to publish reindex event for {photo_id}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryEventBus, MemoryStateStore};
    use chrono::Utc;
    use uuid::Uuid;

    struct Fixture {
        store: MemoryStateStore,
        events: MemoryEventBus,
        owner: Uuid,
        media: Uuid,
        face: Uuid,
        person: Uuid,
    }

    /// One unassigned face in one analyzed photo, plus a person to bind it
    /// to.
    fn fixture() -> Fixture {
        let store = MemoryStateStore::new();
        let owner = Uuid::new_v4();
        let media = Uuid::new_v4();
        let person = store.add_person(owner);
        let face = store.add_unassigned_face(owner, media, vec![1.0, 0.0], Utc::now());

        Fixture {
            store,
            events: MemoryEventBus::new(),
            owner,
            media,
            face,
            person,
        }
    }

    #[tokio::test]
    async fn manual_assign_updates_face_creates_assignment_and_reindexes() {
        let f = fixture();

        let response = assign_face(&f.store, &f.events, f.owner, f.face, f.person)
            .await
            .expect("assign");
        assert_eq!(response.photo_id, f.media);

        let face = f.store.face(f.face).expect("face exists");
        assert_eq!(face.person_id, Some(f.person));

        let assignment = f.store.assignment(f.media, f.person).expect("assignment");
        assert!(assignment.confirmed);
        assert_eq!(assignment.face_embedding_id, Some(f.face));

        let reindexed: Vec<PhotoReindex> = f.events.published_on(CHANNEL_PHOTO_REINDEX);
        assert_eq!(reindexed.len(), 1);
        assert_eq!(reindexed[0].photo_id, f.media);
    }

    #[tokio::test]
    async fn assigning_twice_leaves_exactly_one_assignment_row() {
        let f = fixture();

        assign_face(&f.store, &f.events, f.owner, f.face, f.person)
            .await
            .expect("first assign");
        assign_face(&f.store, &f.events, f.owner, f.face, f.person)
            .await
            .expect("second assign");

        assert_eq!(f.store.assignments_for_media(f.media).len(), 1);
    }

    #[tokio::test]
    async fn reassignment_to_another_person_requires_unassign_first() {
        let f = fixture();
        let other_person = f.store.add_person(f.owner);

        assign_face(&f.store, &f.events, f.owner, f.face, f.person)
            .await
            .expect("assign");

        let err = assign_face(&f.store, &f.events, f.owner, f.face, other_person)
            .await
            .unwrap_err();
        assert!(matches!(err, FaceError::AlreadyAssigned));

        unassign_face(&f.store, &f.events, f.owner, f.face)
            .await
            .expect("unassign");
        assign_face(&f.store, &f.events, f.owner, f.face, other_person)
            .await
            .expect("assign after unassign");
    }

    #[tokio::test]
    async fn unassign_keeps_the_assignment_history() {
        let f = fixture();

        assign_face(&f.store, &f.events, f.owner, f.face, f.person)
            .await
            .expect("assign");
        unassign_face(&f.store, &f.events, f.owner, f.face)
            .await
            .expect("unassign");

        assert_eq!(f.store.face(f.face).expect("face").person_id, None);
        // The human decision survives as a confirmed assignment row.
        assert!(f.store.assignment(f.media, f.person).expect("row").confirmed);
    }

    #[tokio::test]
    async fn cross_owner_assignment_is_rejected_without_mutation() {
        let f = fixture();
        let foreign_person = f.store.add_person(Uuid::new_v4());

        let err = assign_face(&f.store, &f.events, f.owner, f.face, foreign_person)
            .await
            .unwrap_err();
        assert!(matches!(err, FaceError::CrossOwner));

        assert_eq!(f.store.face(f.face).expect("face").person_id, None);
        assert!(f.store.assignments_for_media(f.media).is_empty());
        assert!(f.events.published().is_empty());
    }

    #[tokio::test]
    async fn foreign_faces_look_missing() {
        let f = fixture();
        let stranger = Uuid::new_v4();

        let err = assign_face(&f.store, &f.events, stranger, f.face, f.person)
            .await
            .unwrap_err();
        assert!(matches!(err, FaceError::FaceNotFound(_)));
    }

    #[tokio::test]
    async fn unknown_person_is_not_found() {
        let f = fixture();
        let err = assign_face(&f.store, &f.events, f.owner, f.face, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, FaceError::PersonNotFound(_)));
    }

    #[tokio::test]
    async fn unassigned_list_hides_assigned_and_ignored_faces() {
        let f = fixture();
        let listed = list_unassigned(&f.store, f.owner, Pagination::default())
            .await
            .expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, f.face);

        ignore_face(&f.store, f.owner, f.face).await.expect("ignore");
        let listed = list_unassigned(&f.store, f.owner, Pagination::default())
            .await
            .expect("list");
        assert!(listed.is_empty());

        // Assignment un-ignores; the face is linked now, so still hidden.
        assign_face(&f.store, &f.events, f.owner, f.face, f.person)
            .await
            .expect("assign");
        let listed = list_unassigned(&f.store, f.owner, Pagination::default())
            .await
            .expect("list");
        assert!(listed.is_empty());
    }
}
