use axum::{routing::delete, routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/:id", get(handlers::get_user))
        .route(
            "/users/:id/infractions",
            post(handlers::add_infraction).delete(handlers::clear_infractions),
        )
        .route(
            "/users/:id/temporary-infractions",
            post(handlers::add_temporary_infraction),
        )
        .route(
            "/users/:id/temporary-infractions/:kind",
            delete(handlers::clear_temporary_infraction),
        )
}

pub fn infractions() -> Router<AppState> {
    Router::new()
        .route(
            "/infractions/:id",
            get(handlers::get_infraction)
                .patch(handlers::update_infraction)
                .delete(handlers::delete_infraction),
        )
        .route(
            "/temporary-infractions",
            get(handlers::list_temporary_infractions),
        )
}
