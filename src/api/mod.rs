//! REST API layer: route handlers, DTOs, OpenAPI document and router
//! composition.
//!
//! Rankings reads and `/health` are mounted at the root, administrative
//! catalog writes under `/api/v1`.

pub mod dto;
pub mod extract;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document covering every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "POAP Rankings",
        description = "Collection rankings and collector leaderboards for attendance badges."
    ),
    paths(
        handlers::rankings::get_rankings,
        handlers::rankings::get_global_rankings,
        handlers::rankings::get_wallet_rankings,
        handlers::catalog::create_collection,
        handlers::catalog::set_collection_active,
        handlers::catalog::refresh_collection,
        handlers::catalog::create_event,
        handlers::catalog::close_event,
        handlers::catalog::issue_badge,
        handlers::catalog::transfer_badge,
        handlers::catalog::burn_badge,
        handlers::catalog::flush_rankings_cache,
        handlers::system::health_handler,
    ),
    tags(
        (name = "Rankings", description = "Cached rankings views"),
        (name = "Catalog", description = "Administrative catalog writes"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::rankings::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route(
        "/api-docs/openapi.json",
        axum::routing::get(|| async { axum::Json(ApiDoc::openapi()) }),
    );

    router
}

/// Builds the served application: routes, tracing, CORS and timeout layers.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
