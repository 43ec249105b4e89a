use crate::api_state::ApiContext;
use crate::routes::person::handlers::{
    create_person_handler, delete_person_handler, get_person_handler, list_persons_handler,
    update_person_handler,
};
use axum::routing::get;
use axum::{Router, routing::post};

pub fn person_router() -> Router<ApiContext> {
    Router::new()
        .route(
            "/persons",
            post(create_person_handler).get(list_persons_handler),
        )
        .route(
            "/persons/{person_id}",
            get(get_person_handler)
                .put(update_person_handler)
                .delete(delete_person_handler),
        )
}
