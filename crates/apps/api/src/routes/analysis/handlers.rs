use crate::api_state::ApiContext;
use crate::routes::Owner;
use axum::Json;
use axum::extract::{Path, State};
use common_services::api::analysis::error::AnalysisError;
use common_services::api::analysis::service;
use common_services::database::tables::AnalysisResult;
use uuid::Uuid;

/// Processing state for one photo. A FAILED analysis is returned with its
/// human-readable error message rather than hidden.
#[utoipa::path(
    get,
    path = "/analysis/{media_id}",
    tag = "Analysis",
    params(("media_id" = Uuid, Path, description = "Photo id")),
    responses(
        (status = 200, description = "The analysis record.", body = AnalysisResult),
        (status = 404, description = "No analysis for this photo and owner."),
    )
)]
pub async fn get_analysis_handler(
    State(context): State<ApiContext>,
    Owner(owner_id): Owner,
    Path(media_id): Path<Uuid>,
) -> Result<Json<AnalysisResult>, AnalysisError> {
    Ok(Json(
        service::get_analysis(&context.store, owner_id, media_id).await?,
    ))
}
