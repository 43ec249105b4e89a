use crate::routes::{analysis, faces, person, root};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::handlers::root,
        root::handlers::health_check,
        // Person handlers
        person::handlers::create_person_handler,
        person::handlers::list_persons_handler,
        person::handlers::get_person_handler,
        person::handlers::update_person_handler,
        person::handlers::delete_person_handler,
        // Face handlers
        faces::handlers::list_unassigned_handler,
        faces::handlers::assign_face_handler,
        faces::handlers::unassign_face_handler,
        faces::handlers::ignore_face_handler,
        // Analysis handlers
        analysis::handlers::get_analysis_handler,
    ),
    tags(
        (name = "Persons", description = "Identity management for recognized people"),
        (name = "Faces", description = "Manual review of detected faces"),
        (name = "Analysis", description = "Per-photo analysis status"),
        (name = "System", description = "Health check"),
    )
)]
pub struct ApiDoc;
