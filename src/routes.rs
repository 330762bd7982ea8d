use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;
use crate::service::PollService;

pub fn create_router(service: PollService) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route(
            "/api/polls",
            get(handlers::list_polls).post(handlers::create_poll),
        )
        .route(
            "/api/polls/{id}",
            get(handlers::get_poll).delete(handlers::delete_poll),
        )
        .route("/api/polls/{id}/vote", post(handlers::vote))
        .route("/api/polls/{id}/results", get(handlers::results))
        .route("/api/user", get(handlers::get_user))
        .route("/api/user/username", put(handlers::update_username))
        .layer(cors)
        .with_state(service)
}
