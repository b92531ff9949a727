use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;
use super::middleware::v1_auth_middleware;

pub fn v1_router(state: AppState) -> Router<AppState> {
    let scopes = Router::new()
        .route("/{scopeId}", delete(handlers::scopes::delete_scope))
        .route(
            "/{scopeId}/conversations",
            post(handlers::conversations::store_conversations),
        )
        .route("/{scopeId}/search", post(handlers::search::search))
        .route(
            "/{scopeId}/memories:update",
            post(handlers::memories::update_memory),
        )
        .route(
            "/{scopeId}/memories:extract",
            post(handlers::memories::extract_memory),
        )
        .route(
            "/{scopeId}/memories:import",
            post(handlers::memories::import_memories),
        )
        .route("/{scopeId}/conflicts", get(handlers::conflicts::list_conflicts))
        .route("/{scopeId}/summary", get(handlers::scopes::get_summary));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let protected_routes = Router::new()
        .nest("/scopes", scopes)
        .route_layer(middleware::from_fn_with_state(state, v1_auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
