use crate::api::person::error::PersonError;
use crate::database::stores::PersonStore;
use crate::database::tables::{CreatePerson, Person, PersonWithPhotoCount, UpdatePerson};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

pub async fn create_person(
    pool: &PgPool,
    owner_id: Uuid,
    request: &CreatePerson,
) -> Result<Person, PersonError> {
    let person = PersonStore::create(pool, owner_id, request).await?;
    info!("Created person {} for owner {}", person.id, owner_id);
    Ok(person)
}

pub async fn list_persons(
    pool: &PgPool,
    owner_id: Uuid,
) -> Result<Vec<PersonWithPhotoCount>, PersonError> {
    Ok(PersonStore::list(pool, owner_id).await?)
}

pub async fn get_person(
    pool: &PgPool,
    owner_id: Uuid,
    person_id: Uuid,
) -> Result<Person, PersonError> {
    PersonStore::find_by_id(pool, owner_id, person_id)
        .await?
        .ok_or(PersonError::NotFound(person_id))
}

pub async fn update_person(
    pool: &PgPool,
    owner_id: Uuid,
    person_id: Uuid,
    request: &UpdatePerson,
) -> Result<Person, PersonError> {
    PersonStore::update(pool, owner_id, person_id, request)
        .await?
        .ok_or(PersonError::NotFound(person_id))
}

/// Delete a person. Confirmed assignments referencing it are removed by the
/// schema; face rows keep existing with a nulled person link.
pub async fn delete_person(
    pool: &PgPool,
    owner_id: Uuid,
    person_id: Uuid,
) -> Result<(), PersonError> {
    if PersonStore::delete(pool, owner_id, person_id).await? {
        info!("Deleted person {person_id}");
        Ok(())
    } else {
        Err(PersonError::NotFound(person_id))
    }
}
