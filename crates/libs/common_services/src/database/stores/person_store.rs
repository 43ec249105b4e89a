use crate::database::DbError;
use crate::database::tables::{CreatePerson, Person, PersonWithPhotoCount, UpdatePerson};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PersonStore;

impl PersonStore {
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        request: &CreatePerson,
    ) -> Result<Person, DbError> {
        let person = sqlx::query_as::<_, Person>(
            r"
            INSERT INTO persons (owner_id, name, relationship, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(owner_id)
        .bind(&request.name)
        .bind(&request.relationship)
        .bind(&request.notes)
        .fetch_one(pool)
        .await?;
        Ok(person)
    }

    /// All persons for an owner, with the number of photos each is linked
    /// to, ordered by name.
    pub async fn list(pool: &PgPool, owner_id: Uuid) -> Result<Vec<PersonWithPhotoCount>, DbError> {
        let persons = sqlx::query_as::<_, PersonWithPhotoCount>(
            r"
            SELECT p.*,
                   (SELECT COUNT(*) FROM photo_persons pp WHERE pp.person_id = p.id) AS photo_count
            FROM persons p
            WHERE p.owner_id = $1
            ORDER BY p.name, p.id
            ",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
        Ok(persons)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        owner_id: Uuid,
        person_id: Uuid,
    ) -> Result<Option<Person>, DbError> {
        let person =
            sqlx::query_as::<_, Person>("SELECT * FROM persons WHERE id = $1 AND owner_id = $2")
                .bind(person_id)
                .bind(owner_id)
                .fetch_optional(pool)
                .await?;
        Ok(person)
    }

    /// Partial update: absent fields keep their current values.
    pub async fn update(
        pool: &PgPool,
        owner_id: Uuid,
        person_id: Uuid,
        request: &UpdatePerson,
    ) -> Result<Option<Person>, DbError> {
        let person = sqlx::query_as::<_, Person>(
            r"
            UPDATE persons
            SET name         = COALESCE($3, name),
                relationship = COALESCE($4, relationship),
                notes        = COALESCE($5, notes),
                updated_at   = now()
            WHERE id = $1 AND owner_id = $2
            RETURNING *
            ",
        )
        .bind(person_id)
        .bind(owner_id)
        .bind(&request.name)
        .bind(&request.relationship)
        .bind(&request.notes)
        .fetch_optional(pool)
        .await?;
        Ok(person)
    }

    /// Delete a person. The schema cascades confirmed assignments and nulls
    /// face links; face rows themselves survive.
    pub async fn delete(pool: &PgPool, owner_id: Uuid, person_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM persons WHERE id = $1 AND owner_id = $2")
            .bind(person_id)
            .bind(owner_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
