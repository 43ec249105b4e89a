use crate::api_state::ApiContext;
use crate::routes::Owner;
use axum::Json;
use axum::extract::{Path, Query, State};
use common_services::api::faces::error::FaceError;
use common_services::api::faces::interfaces::{
    AssignFaceRequest, AssignFaceResponse, IgnoreFaceResponse, UnassignFaceResponse,
    UnassignedFacesParams,
};
use common_services::api::faces::service;
use common_services::database::tables::UnassignedFace;
use uuid::Uuid;

/// Faces awaiting manual identification, most recently detected first.
#[utoipa::path(
    get,
    path = "/faces/unassigned",
    tag = "Faces",
    params(UnassignedFacesParams),
    responses(
        (status = 200, description = "Unassigned faces for the requester.", body = [UnassignedFace]),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn list_unassigned_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Query(params): Query<UnassignedFacesParams>,
) -> Result<Json<Vec<UnassignedFace>>, FaceError> {
    let faces = service::list_unassigned(&context.store, owner_id, params.into()).await?;
    Ok(Json(faces))
}

/// Confirm that a face belongs to a person. Reassigning a face that is
/// linked to a different person requires an explicit unassign first.
#[utoipa::path(
    post,
    path = "/faces/{face_id}/assign",
    tag = "Faces",
    params(("face_id" = Uuid, Path, description = "Face id")),
    request_body = AssignFaceRequest,
    responses(
        (status = 200, description = "Face assigned; a reindex was requested.", body = AssignFaceResponse),
        (status = 404, description = "Unknown face or person."),
        (status = 403, description = "Face and person belong to different owners."),
        (status = 409, description = "Face is already assigned to a different person."),
    )
)]
pub async fn assign_face_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Path(face_id): Path<Uuid>,
    Json(request): Json<AssignFaceRequest>,
) -> Result<Json<AssignFaceResponse>, FaceError> {
    let response = service::assign_face(
        &context.store,
        &context.events,
        owner_id,
        face_id,
        request.person_id,
    )
    .await?;
    Ok(Json(response))
}

/// Clear a face's person link. Assignment history for the photo is kept.
#[utoipa::path(
    post,
    path = "/faces/{face_id}/unassign",
    tag = "Faces",
    params(("face_id" = Uuid, Path, description = "Face id")),
    responses(
        (status = 200, description = "Face unassigned; a reindex was requested.", body = UnassignFaceResponse),
        (status = 404, description = "Unknown face."),
    )
)]
pub async fn unassign_face_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Path(face_id): Path<Uuid>,
) -> Result<Json<UnassignFaceResponse>, FaceError> {
    let response =
        service::unassign_face(&context.store, &context.events, owner_id, face_id).await?;
    Ok(Json(response))
}

/// Hide a face from the unassigned queue (e.g. a stranger in the
/// background). Assigning the face later un-hides it.
#[utoipa::path(
    post,
    path = "/faces/{face_id}/ignore",
    tag = "Faces",
    params(("face_id" = Uuid, Path, description = "Face id")),
    responses(
        (status = 200, description = "Face ignored.", body = IgnoreFaceResponse),
        (status = 404, description = "Unknown face."),
    )
)]
pub async fn ignore_face_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Path(face_id): Path<Uuid>,
) -> Result<Json<IgnoreFaceResponse>, FaceError> {
    let response = service::ignore_face(&context.store, owner_id, face_id).await?;
    Ok(Json(response))
}
