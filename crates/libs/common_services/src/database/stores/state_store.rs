use crate::database::tables::{AnalysisResult, UnassignedFace};
use crate::matching::MatchCandidate;
use crate::state::{AnalysisOutcome, FaceRef, Pagination, StateStore, StoreError};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Postgres-backed [`StateStore`]. Concurrency correctness rests on the
/// single conditional UPDATE in [`StateStore::claim_for_processing`]; no
/// application-side locking anywhere.
#[derive(Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct FaceRefRow {
    id: Uuid,
    media_id: Uuid,
    owner_id: Uuid,
    person_id: Option<Uuid>,
}

impl PgStateStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn ensure_pending(&self, media_id: Uuid, owner_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO analysis_results (media_id, owner_id)
            VALUES ($1, $2)
            ON CONFLICT (media_id) DO NOTHING
            ",
        )
        .bind(media_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn claim_for_processing(
        &self,
        media_id: Uuid,
        stale_after: Duration,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE analysis_results
            SET status        = 'PROCESSING',
                claimed_at    = now(),
                error_message = NULL,
                updated_at    = now()
            WHERE media_id = $1
              AND (status IN ('PENDING', 'FAILED')
                OR (status = 'PROCESSING' AND claimed_at < now() - $2 * interval '1 second'))
            ",
        )
        .bind(media_id)
        .bind(stale_after.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_completion(
        &self,
        media_id: Uuid,
        outcome: &AnalysisOutcome,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // A retried pass must never duplicate face rows for this photo.
        sqlx::query("DELETE FROM face_embeddings WHERE media_id = $1")
            .bind(media_id)
            .execute(&mut *tx)
            .await?;

        for face in &outcome.faces {
            let bbox = face.detection.bounding_box;
            let face_id: Uuid = sqlx::query_scalar(
                r"
                INSERT INTO face_embeddings
                    (media_id, person_id, embedding, bbox_x, bbox_y, bbox_width, bbox_height, confidence)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                ",
            )
            .bind(media_id)
            .bind(face.person_id)
            .bind(Vector::from(face.detection.embedding.clone()))
            .bind(bbox.x)
            .bind(bbox.y)
            .bind(bbox.width)
            .bind(bbox.height)
            .bind(face.detection.confidence)
            .fetch_one(&mut *tx)
            .await?;

            if let Some(person_id) = face.person_id {
                // Automatic match: unconfirmed assignment. A confirmed row
                // for the same pair keeps its confirmation.
                sqlx::query(
                    r"
                    INSERT INTO photo_persons (media_id, person_id, face_embedding_id, confirmed)
                    VALUES ($1, $2, $3, false)
                    ON CONFLICT (media_id, person_id)
                        DO UPDATE SET face_embedding_id = EXCLUDED.face_embedding_id
                    ",
                )
                .bind(media_id)
                .bind(person_id)
                .bind(face_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let metadata = &outcome.metadata;
        let face_count = i32::try_from(outcome.faces.len()).unwrap_or(i32::MAX);
        let updated = sqlx::query(
            r"
            UPDATE analysis_results
            SET status        = 'COMPLETE',
                face_count    = $2,
                taken_at      = $3,
                latitude      = $4,
                longitude     = $5,
                camera_make   = $6,
                camera_model  = $7,
                error_message = NULL,
                analyzed_at   = now(),
                updated_at    = now()
            WHERE media_id = $1 AND status = 'PROCESSING'
            ",
        )
        .bind(media_id)
        .bind(face_count)
        .bind(metadata.taken_at)
        .bind(metadata.latitude)
        .bind(metadata.longitude)
        .bind(&metadata.camera_make)
        .bind(&metadata.camera_model)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            // The claim was lost (stale re-claim by another worker); none
            // of this pass's writes may land.
            return Err(StoreError::Conflict(format!(
                "analysis for media {media_id} is no longer PROCESSING"
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn record_failure(&self, media_id: Uuid, message: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE analysis_results
            SET status        = 'FAILED',
                error_message = $2,
                updated_at    = now()
            WHERE media_id = $1 AND status = 'PROCESSING'
            ",
        )
        .bind(media_id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!("Failure for media {media_id} not recorded; row is not PROCESSING");
        }
        Ok(())
    }

    async fn analysis_by_media(
        &self,
        media_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AnalysisResult>, StoreError> {
        let analysis = sqlx::query_as::<_, AnalysisResult>(
            "SELECT * FROM analysis_results WHERE media_id = $1 AND owner_id = $2",
        )
        .bind(media_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(analysis)
    }

    async fn nearest_assigned_face(
        &self,
        owner_id: Uuid,
        embedding: &[f32],
    ) -> Result<Option<MatchCandidate>, StoreError> {
        // `<=>` is cosine distance; the ivfflat index makes this an
        // approximate scan. Ordering mirrors matching::select_best.
        let candidate = sqlx::query_as::<_, MatchCandidate>(
            r"
            SELECT fe.id                      AS face_id,
                   fe.person_id               AS person_id,
                   1 - (fe.embedding <=> $1)  AS similarity,
                   fe.created_at              AS registered_at
            FROM face_embeddings fe
            JOIN persons p ON p.id = fe.person_id
            WHERE p.owner_id = $2
            ORDER BY fe.embedding <=> $1, fe.created_at, fe.id
            LIMIT 1
            ",
        )
        .bind(Vector::from(embedding.to_vec()))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidate)
    }

    async fn face_ref(&self, face_id: Uuid) -> Result<Option<FaceRef>, StoreError> {
        let row = sqlx::query_as::<_, FaceRefRow>(
            r"
            SELECT fe.id, fe.media_id, ar.owner_id, fe.person_id
            FROM face_embeddings fe
            JOIN analysis_results ar ON ar.media_id = fe.media_id
            WHERE fe.id = $1
            ",
        )
        .bind(face_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| FaceRef {
            id: r.id,
            media_id: r.media_id,
            owner_id: r.owner_id,
            person_id: r.person_id,
        }))
    }

    async fn person_owner(&self, person_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let owner = sqlx::query_scalar("SELECT owner_id FROM persons WHERE id = $1")
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    async fn confirm_assignment(&self, face: &FaceRef, person_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE face_embeddings SET person_id = $2 WHERE id = $1")
            .bind(face.id)
            .bind(person_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM ignored_faces WHERE face_embedding_id = $1")
            .bind(face.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO photo_persons (media_id, person_id, face_embedding_id, confirmed)
            VALUES ($1, $2, $3, true)
            ON CONFLICT (media_id, person_id)
                DO UPDATE SET face_embedding_id = EXCLUDED.face_embedding_id,
                              confirmed         = true
            ",
        )
        .bind(face.media_id)
        .bind(person_id)
        .bind(face.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn clear_face_person(&self, face_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE face_embeddings SET person_id = NULL WHERE id = $1")
            .bind(face_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ignore_face(&self, owner_id: Uuid, face_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO ignored_faces (owner_id, face_embedding_id)
            VALUES ($1, $2)
            ON CONFLICT (owner_id, face_embedding_id) DO NOTHING
            ",
        )
        .bind(owner_id)
        .bind(face_id)
        .execute(&mut *tx)
        .await?;

        // Drop automatic suggestions; a confirmed assignment survives.
        sqlx::query("DELETE FROM photo_persons WHERE face_embedding_id = $1 AND confirmed = false")
            .bind(face_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn unassigned_faces(
        &self,
        owner_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<UnassignedFace>, StoreError> {
        let page = page.clamped();
        let faces = sqlx::query_as::<_, UnassignedFace>(
            r"
            SELECT fe.id, fe.media_id, fe.bbox_x, fe.bbox_y,
                   fe.bbox_width, fe.bbox_height, fe.confidence, fe.created_at
            FROM face_embeddings fe
            JOIN analysis_results ar ON ar.media_id = fe.media_id
            LEFT JOIN ignored_faces ig
                ON ig.face_embedding_id = fe.id AND ig.owner_id = ar.owner_id
            WHERE ar.owner_id = $1
              AND fe.person_id IS NULL
              AND ig.id IS NULL
            ORDER BY fe.created_at DESC, fe.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(owner_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(faces)
    }

    async fn delete_media_records(&self, media_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM photo_persons WHERE media_id = $1")
            .bind(media_id)
            .execute(&mut *tx)
            .await?;
        // Cascades the ignore markers pointing at these faces.
        sqlx::query("DELETE FROM face_embeddings WHERE media_id = $1")
            .bind(media_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM analysis_results WHERE media_id = $1")
            .bind(media_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn release_stale_claims(&self, stale_after: Duration) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE analysis_results
            SET status        = 'FAILED',
                error_message = 'processing timed out; claim released',
                updated_at    = now()
            WHERE status = 'PROCESSING'
              AND claimed_at < now() - $1 * interval '1 second'
            ",
        )
        .bind(stale_after.as_secs_f64())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
