use crate::database::tables::{AnalysisResult, UnassignedFace};
use crate::matching::{self, MatchCandidate};
use crate::state::{AnalysisOutcome, FaceRef, Pagination, StateStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common_types::{AnalysisStatus, BoundingBox};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// A face row as held by the in-memory store; exposed for assertions.
#[derive(Debug, Clone)]
pub struct MemoryFace {
    pub id: Uuid,
    pub media_id: Uuid,
    pub person_id: Option<Uuid>,
    pub embedding: Vec<f32>,
    pub bounding_box: BoundingBox,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

/// An assignment row as held by the in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryAssignment {
    pub media_id: Uuid,
    pub person_id: Uuid,
    pub face_embedding_id: Option<Uuid>,
    pub confirmed: bool,
}

#[derive(Default)]
struct Inner {
    analyses: HashMap<Uuid, AnalysisResult>,
    faces: BTreeMap<Uuid, MemoryFace>,
    persons: HashMap<Uuid, Uuid>,
    assignments: BTreeMap<(Uuid, Uuid), MemoryAssignment>,
    ignored: HashSet<(Uuid, Uuid)>,
}

/// In-memory [`StateStore`] with the same semantics as the Postgres
/// implementation, including the claim predicate and the all-or-nothing
/// completion write.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: Mutex<Inner>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- seeding helpers ---

    pub fn add_person(&self, owner_id: Uuid) -> Uuid {
        let person_id = Uuid::new_v4();
        self.lock().persons.insert(person_id, owner_id);
        person_id
    }

    /// Register an already-analyzed face linked to a person, backdated to
    /// `registered_at` so tie-break behavior is controllable.
    pub fn add_assigned_face(
        &self,
        owner_id: Uuid,
        media_id: Uuid,
        person_id: Uuid,
        embedding: Vec<f32>,
        registered_at: DateTime<Utc>,
    ) -> Uuid {
        let face_id = Uuid::new_v4();
        let mut inner = self.lock();
        inner
            .analyses
            .entry(media_id)
            .or_insert_with(|| blank_analysis(media_id, owner_id, AnalysisStatus::Complete));
        inner.faces.insert(
            face_id,
            MemoryFace {
                id: face_id,
                media_id,
                person_id: Some(person_id),
                embedding,
                bounding_box: BoundingBox {
                    x: 0,
                    y: 0,
                    width: 32,
                    height: 32,
                },
                confidence: 0.99,
                created_at: registered_at,
            },
        );
        face_id
    }

    /// Register an analyzed face with no person link, ready for manual
    /// review.
    pub fn add_unassigned_face(
        &self,
        owner_id: Uuid,
        media_id: Uuid,
        embedding: Vec<f32>,
        registered_at: DateTime<Utc>,
    ) -> Uuid {
        let face_id = Uuid::new_v4();
        let mut inner = self.lock();
        inner
            .analyses
            .entry(media_id)
            .or_insert_with(|| blank_analysis(media_id, owner_id, AnalysisStatus::Complete));
        inner.faces.insert(
            face_id,
            MemoryFace {
                id: face_id,
                media_id,
                person_id: None,
                embedding,
                bounding_box: BoundingBox {
                    x: 0,
                    y: 0,
                    width: 32,
                    height: 32,
                },
                confidence: 0.99,
                created_at: registered_at,
            },
        );
        face_id
    }

    // --- inspection helpers ---

    #[must_use]
    pub fn analysis(&self, media_id: Uuid) -> Option<AnalysisResult> {
        self.lock().analyses.get(&media_id).cloned()
    }

    #[must_use]
    pub fn faces_for_media(&self, media_id: Uuid) -> Vec<MemoryFace> {
        self.lock()
            .faces
            .values()
            .filter(|f| f.media_id == media_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn face(&self, face_id: Uuid) -> Option<MemoryFace> {
        self.lock().faces.get(&face_id).cloned()
    }

    #[must_use]
    pub fn assignment(&self, media_id: Uuid, person_id: Uuid) -> Option<MemoryAssignment> {
        self.lock()
            .assignments
            .get(&(media_id, person_id))
            .cloned()
    }

    #[must_use]
    pub fn assignments_for_media(&self, media_id: Uuid) -> Vec<MemoryAssignment> {
        self.lock()
            .assignments
            .values()
            .filter(|a| a.media_id == media_id)
            .cloned()
            .collect()
    }

    /// Age a PROCESSING claim, as if the worker holding it crashed a while
    /// ago.
    pub fn backdate_claim(&self, media_id: Uuid, by: Duration) {
        if let Some(analysis) = self.lock().analyses.get_mut(&media_id)
            && let Some(claimed_at) = analysis.claimed_at
        {
            analysis.claimed_at =
                Some(claimed_at - ChronoDuration::seconds(by.as_secs() as i64));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("state store poisoned")
    }
}

fn blank_analysis(media_id: Uuid, owner_id: Uuid, status: AnalysisStatus) -> AnalysisResult {
    let now = Utc::now();
    AnalysisResult {
        id: Uuid::new_v4(),
        media_id,
        owner_id,
        status,
        face_count: 0,
        taken_at: None,
        latitude: None,
        longitude: None,
        camera_make: None,
        camera_model: None,
        error_message: None,
        claimed_at: None,
        analyzed_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn claim_is_stale(claimed_at: Option<DateTime<Utc>>, stale_after: Duration) -> bool {
    claimed_at.is_some_and(|at| {
        Utc::now() - at > ChronoDuration::seconds(stale_after.as_secs() as i64)
    })
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn ensure_pending(&self, media_id: Uuid, owner_id: Uuid) -> Result<(), StoreError> {
        self.lock()
            .analyses
            .entry(media_id)
            .or_insert_with(|| blank_analysis(media_id, owner_id, AnalysisStatus::Pending));
        Ok(())
    }

    async fn claim_for_processing(
        &self,
        media_id: Uuid,
        stale_after: Duration,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(analysis) = inner.analyses.get_mut(&media_id) else {
            return Ok(false);
        };

        let eligible = match analysis.status {
            AnalysisStatus::Pending | AnalysisStatus::Failed => true,
            AnalysisStatus::Processing => claim_is_stale(analysis.claimed_at, stale_after),
            AnalysisStatus::Complete => false,
        };
        if !eligible {
            return Ok(false);
        }

        analysis.status = AnalysisStatus::Processing;
        analysis.claimed_at = Some(Utc::now());
        analysis.error_message = None;
        analysis.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_completion(
        &self,
        media_id: Uuid,
        outcome: &AnalysisOutcome,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();

        match inner.analyses.get(&media_id).map(|a| a.status) {
            Some(AnalysisStatus::Processing) => {}
            _ => {
                return Err(StoreError::Conflict(format!(
                    "analysis for media {media_id} is no longer PROCESSING"
                )));
            }
        }

        // Replace any leftover faces for this photo, mirroring the delete
        // the Postgres transaction starts with.
        let removed: Vec<Uuid> = inner
            .faces
            .values()
            .filter(|f| f.media_id == media_id)
            .map(|f| f.id)
            .collect();
        for face_id in &removed {
            inner.faces.remove(face_id);
            inner.ignored.retain(|(_, ignored_face)| ignored_face != face_id);
            for assignment in inner.assignments.values_mut() {
                if assignment.face_embedding_id == Some(*face_id) {
                    assignment.face_embedding_id = None;
                }
            }
        }

        for face in &outcome.faces {
            let face_id = Uuid::new_v4();
            inner.faces.insert(
                face_id,
                MemoryFace {
                    id: face_id,
                    media_id,
                    person_id: face.person_id,
                    embedding: face.detection.embedding.clone(),
                    bounding_box: face.detection.bounding_box,
                    confidence: face.detection.confidence,
                    created_at: Utc::now(),
                },
            );

            if let Some(person_id) = face.person_id {
                inner
                    .assignments
                    .entry((media_id, person_id))
                    .and_modify(|a| a.face_embedding_id = Some(face_id))
                    .or_insert(MemoryAssignment {
                        media_id,
                        person_id,
                        face_embedding_id: Some(face_id),
                        confirmed: false,
                    });
            }
        }

        let metadata = &outcome.metadata;
        let analysis = inner
            .analyses
            .get_mut(&media_id)
            .expect("checked above");
        analysis.status = AnalysisStatus::Complete;
        analysis.face_count = i32::try_from(outcome.faces.len()).unwrap_or(i32::MAX);
        analysis.taken_at = metadata.taken_at;
        analysis.latitude = metadata.latitude;
        analysis.longitude = metadata.longitude;
        analysis.camera_make = metadata.camera_make.clone();
        analysis.camera_model = metadata.camera_model.clone();
        analysis.error_message = None;
        analysis.analyzed_at = Some(Utc::now());
        analysis.updated_at = Utc::now();
        Ok(())
    }

    async fn record_failure(&self, media_id: Uuid, message: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(analysis) = inner.analyses.get_mut(&media_id)
            && analysis.status == AnalysisStatus::Processing
        {
            analysis.status = AnalysisStatus::Failed;
            analysis.error_message = Some(message.to_owned());
            analysis.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn analysis_by_media(
        &self,
        media_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AnalysisResult>, StoreError> {
        Ok(self
            .lock()
            .analyses
            .get(&media_id)
            .filter(|a| a.owner_id == owner_id)
            .cloned())
    }

    async fn nearest_assigned_face(
        &self,
        owner_id: Uuid,
        embedding: &[f32],
    ) -> Result<Option<MatchCandidate>, StoreError> {
        let inner = self.lock();
        let candidates = inner.faces.values().filter_map(|face| {
            let person_id = face.person_id?;
            // Owner scoping follows the person's owner, like the SQL join.
            if inner.persons.get(&person_id) != Some(&owner_id) {
                return None;
            }
            Some(MatchCandidate {
                face_id: face.id,
                person_id,
                similarity: matching::cosine_similarity(embedding, &face.embedding),
                registered_at: face.created_at,
            })
        });
        Ok(matching::select_best(candidates))
    }

    async fn face_ref(&self, face_id: Uuid) -> Result<Option<FaceRef>, StoreError> {
        let inner = self.lock();
        let Some(face) = inner.faces.get(&face_id) else {
            return Ok(None);
        };
        let Some(analysis) = inner.analyses.get(&face.media_id) else {
            return Ok(None);
        };
        Ok(Some(FaceRef {
            id: face.id,
            media_id: face.media_id,
            owner_id: analysis.owner_id,
            person_id: face.person_id,
        }))
    }

    async fn person_owner(&self, person_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self.lock().persons.get(&person_id).copied())
    }

    async fn confirm_assignment(&self, face: &FaceRef, person_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(stored) = inner.faces.get_mut(&face.id) {
            stored.person_id = Some(person_id);
        }
        inner.ignored.retain(|(_, ignored_face)| *ignored_face != face.id);
        inner
            .assignments
            .entry((face.media_id, person_id))
            .and_modify(|a| {
                a.face_embedding_id = Some(face.id);
                a.confirmed = true;
            })
            .or_insert(MemoryAssignment {
                media_id: face.media_id,
                person_id,
                face_embedding_id: Some(face.id),
                confirmed: true,
            });
        Ok(())
    }

    async fn clear_face_person(&self, face_id: Uuid) -> Result<(), StoreError> {
        if let Some(face) = self.lock().faces.get_mut(&face_id) {
            face.person_id = None;
        }
        Ok(())
    }

    async fn ignore_face(&self, owner_id: Uuid, face_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.ignored.insert((owner_id, face_id));
        inner
            .assignments
            .retain(|_, a| a.confirmed || a.face_embedding_id != Some(face_id));
        Ok(())
    }

    async fn unassigned_faces(
        &self,
        owner_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<UnassignedFace>, StoreError> {
        let page = page.clamped();
        let inner = self.lock();
        let mut faces: Vec<&MemoryFace> = inner
            .faces
            .values()
            .filter(|face| {
                face.person_id.is_none()
                    && inner
                        .analyses
                        .get(&face.media_id)
                        .is_some_and(|a| a.owner_id == owner_id)
                    && !inner.ignored.contains(&(owner_id, face.id))
            })
            .collect();
        faces.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(faces
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(0))
            .take(usize::try_from(page.limit).unwrap_or(0))
            .map(|face| UnassignedFace {
                id: face.id,
                media_id: face.media_id,
                bbox_x: face.bounding_box.x,
                bbox_y: face.bounding_box.y,
                bbox_width: face.bounding_box.width,
                bbox_height: face.bounding_box.height,
                confidence: face.confidence,
                created_at: face.created_at,
            })
            .collect())
    }

    async fn delete_media_records(&self, media_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let removed: Vec<Uuid> = inner
            .faces
            .values()
            .filter(|f| f.media_id == media_id)
            .map(|f| f.id)
            .collect();
        for face_id in removed {
            inner.faces.remove(&face_id);
            inner.ignored.retain(|(_, ignored_face)| *ignored_face != face_id);
        }
        inner.assignments.retain(|_, a| a.media_id != media_id);
        inner.analyses.remove(&media_id);
        Ok(())
    }

    async fn release_stale_claims(&self, stale_after: Duration) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let mut released = 0;
        for analysis in inner.analyses.values_mut() {
            if analysis.status == AnalysisStatus::Processing
                && claim_is_stale(analysis.claimed_at, stale_after)
            {
                analysis.status = AnalysisStatus::Failed;
                analysis.error_message =
                    Some("processing timed out; claim released".to_owned());
                analysis.updated_at = Utc::now();
                released += 1;
            }
        }
        Ok(released)
    }
}
