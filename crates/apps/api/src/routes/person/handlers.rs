use crate::api_state::ApiContext;
use crate::routes::Owner;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common_services::api::person::error::PersonError;
use common_services::api::person::service;
use common_services::database::tables::{CreatePerson, Person, PersonWithPhotoCount, UpdatePerson};
use uuid::Uuid;

/// Create a person.
#[utoipa::path(
    post,
    path = "/persons",
    tag = "Persons",
    request_body = CreatePerson,
    responses(
        (status = 200, description = "The created person.", body = Person),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn create_person_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Json(request): Json<CreatePerson>,
) -> Result<Json<Person>, PersonError> {
    let person = service::create_person(&context.pool, owner_id, &request).await?;
    Ok(Json(person))
}

/// List the requester's persons, with per-person photo counts.
#[utoipa::path(
    get,
    path = "/persons",
    tag = "Persons",
    responses(
        (status = 200, description = "All persons owned by the requester.", body = [PersonWithPhotoCount]),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn list_persons_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
) -> Result<Json<Vec<PersonWithPhotoCount>>, PersonError> {
    Ok(Json(service::list_persons(&context.pool, owner_id).await?))
}

/// Get one person.
#[utoipa::path(
    get,
    path = "/persons/{person_id}",
    tag = "Persons",
    params(("person_id" = Uuid, Path, description = "Person id")),
    responses(
        (status = 200, description = "The person.", body = Person),
        (status = 404, description = "No such person for this owner."),
    )
)]
pub async fn get_person_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Path(person_id): Path<Uuid>,
) -> Result<Json<Person>, PersonError> {
    Ok(Json(
        service::get_person(&context.pool, owner_id, person_id).await?,
    ))
}

/// Update a person; omitted fields are left unchanged.
#[utoipa::path(
    put,
    path = "/persons/{person_id}",
    tag = "Persons",
    params(("person_id" = Uuid, Path, description = "Person id")),
    request_body = UpdatePerson,
    responses(
        (status = 200, description = "The updated person.", body = Person),
        (status = 404, description = "No such person for this owner."),
    )
)]
pub async fn update_person_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Path(person_id): Path<Uuid>,
    Json(request): Json<UpdatePerson>,
) -> Result<Json<Person>, PersonError> {
    Ok(Json(
        service::update_person(&context.pool, owner_id, person_id, &request).await?,
    ))
}

/// Delete a person. Face records survive with their person link cleared;
/// confirmed assignments referencing the person are removed.
#[utoipa::path(
    delete,
    path = "/persons/{person_id}",
    tag = "Persons",
    params(("person_id" = Uuid, Path, description = "Person id")),
    responses(
        (status = 204, description = "Deleted."),
        (status = 404, description = "No such person for this owner."),
    )
)]
pub async fn delete_person_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Path(person_id): Path<Uuid>,
) -> Result<StatusCode, PersonError> {
    service::delete_person(&context.pool, owner_id, person_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
