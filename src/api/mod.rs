//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Notify and inspection endpoints are mounted under `/api/v1` behind the
//! optional shared-key guard; health and API docs sit at the root.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router(state: &AppState) -> Router<AppState> {
    let v1 = handlers::routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::require_api_key,
    ));

    Router::new()
        .nest("/api/v1", v1)
        .merge(handlers::system::routes())
        .merge(docs_router())
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;
    use utoipa::OpenApi;

    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(openapi::ApiDoc::openapi()) }),
    )
}
