use crate::api::analysis::error::AnalysisError;
use crate::database::tables::AnalysisResult;
use crate::state::StateStore;
use uuid::Uuid;

/// Processing state for one photo, owner-scoped. A FAILED analysis is
/// returned like any other, with its human-readable error message.
pub async fn get_analysis<S>(
    store: &S,
    owner_id: Uuid,
    media_id: Uuid,
) -> Result<AnalysisResult, AnalysisError>
where
    S: StateStore + ?Sized,
{
    store
        .analysis_by_media(media_id, owner_id)
        .await?
        .ok_or(AnalysisError::NotFound(media_id))
}
