//! Administrative catalog handlers.
//!
//! Every successful write invalidates the cached rankings views.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, patch, post};
use axum::{Json, Router};

use crate::api::dto::{
    CacheFlushResponse, CreateCollectionRequest, CreateEventRequest, IssueBadgeRequest,
    SetActiveRequest, TransferBadgeRequest,
};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::domain::{Badge, BadgeId, Collection, CollectionId, Event, EventId};
use crate::error::{ErrorResponse, ServiceError};

fn parse_id<T: FromStr>(entity: &str, raw: &str) -> Result<T, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::InvalidInput(format!("{raw} is not a valid {entity} id")))
}

/// `POST /collections` — Register a collection.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input or a duplicate mint authority.
#[utoipa::path(
    post,
    path = "/api/v1/collections",
    tag = "Catalog",
    summary = "Create a collection",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Collection created", body = Collection),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Mint authority already registered", body = ErrorResponse),
    )
)]
pub async fn create_collection(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateCollectionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let collection = state.catalog.create_collection(req.into()).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// `PATCH /collections/{id}/active` — Activate or deactivate a collection.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the collection does not exist.
#[utoipa::path(
    patch,
    path = "/api/v1/collections/{id}/active",
    tag = "Catalog",
    summary = "Toggle a collection",
    params(("id" = uuid::Uuid, Path, description = "Collection UUID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Updated collection", body = Collection),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Collection not found", body = ErrorResponse),
    )
)]
pub async fn set_collection_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SetActiveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id: CollectionId = parse_id("collection", &id)?;
    let collection = state.catalog.set_collection_active(id, req.active).await?;
    Ok(Json(collection))
}

/// `POST /collections/{id}/refresh` — Recompute stored counters.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the collection does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/collections/{id}/refresh",
    tag = "Catalog",
    summary = "Refresh collection totals",
    description = "Recounts live badges and current holders and stores both on the collection.",
    params(("id" = uuid::Uuid, Path, description = "Collection UUID")),
    responses(
        (status = 200, description = "Corrected collection", body = Collection),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Collection not found", body = ErrorResponse),
    )
)]
pub async fn refresh_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id: CollectionId = parse_id("collection", &id)?;
    let collection = state.catalog.refresh_collection(id).await?;
    Ok(Json(collection))
}

/// `POST /collections/{id}/events` — Create an event.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input or an unknown collection.
#[utoipa::path(
    post,
    path = "/api/v1/collections/{id}/events",
    tag = "Catalog",
    summary = "Create an event",
    params(("id" = uuid::Uuid, Path, description = "Collection UUID")),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Collection not found", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id: CollectionId = parse_id("collection", &id)?;
    let event = state.catalog.create_event(id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `POST /events/{id}/close` — Stop issuance for an event.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the event does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/close",
    tag = "Catalog",
    summary = "Close an event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Closed event", body = Event),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn close_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id: EventId = parse_id("event", &id)?;
    let event = state.catalog.close_event(id).await?;
    Ok(Json(event))
}

/// `POST /events/{id}/badges` — Record a minted badge.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input, an unknown event, or an event
/// that cannot issue more badges.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/badges",
    tag = "Catalog",
    summary = "Issue a badge",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = IssueBadgeRequest,
    responses(
        (status = 201, description = "Badge issued", body = Badge),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (
            status = 409,
            description = "Event closed, supply reached or asset known",
            body = ErrorResponse
        ),
    )
)]
pub async fn issue_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<IssueBadgeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id: EventId = parse_id("event", &id)?;
    let badge = state.catalog.issue_badge(id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(badge)))
}

/// `POST /badges/{id}/transfer` — Move a badge to another wallet.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input, an unknown badge, or a badge
/// that cannot move.
#[utoipa::path(
    post,
    path = "/api/v1/badges/{id}/transfer",
    tag = "Catalog",
    summary = "Transfer a badge",
    params(("id" = uuid::Uuid, Path, description = "Badge UUID")),
    request_body = TransferBadgeRequest,
    responses(
        (status = 200, description = "Transferred badge", body = Badge),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Badge not found", body = ErrorResponse),
        (status = 409, description = "Badge burned, frozen or already held", body = ErrorResponse),
    )
)]
pub async fn transfer_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TransferBadgeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id: BadgeId = parse_id("badge", &id)?;
    let badge = state.catalog.transfer_badge(id, &req.to_wallet).await?;
    Ok(Json(badge))
}

/// `POST /badges/{id}/burn` — Burn a badge.
///
/// # Errors
///
/// Returns [`ServiceError`] for an unknown or already burned badge.
#[utoipa::path(
    post,
    path = "/api/v1/badges/{id}/burn",
    tag = "Catalog",
    summary = "Burn a badge",
    params(("id" = uuid::Uuid, Path, description = "Badge UUID")),
    responses(
        (status = 200, description = "Burned badge", body = Badge),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Badge not found", body = ErrorResponse),
        (status = 409, description = "Badge already burned", body = ErrorResponse),
    )
)]
pub async fn burn_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id: BadgeId = parse_id("badge", &id)?;
    let badge = state.catalog.burn_badge(id).await?;
    Ok(Json(badge))
}

/// `DELETE /rankings/cache` — Drop every cached rankings view.
#[utoipa::path(
    delete,
    path = "/api/v1/rankings/cache",
    tag = "Catalog",
    summary = "Flush the rankings cache",
    responses(
        (status = 200, description = "Cache flushed", body = CacheFlushResponse),
    )
)]
pub async fn flush_rankings_cache(State(state): State<AppState>) -> impl IntoResponse {
    let dropped = state.rankings.invalidate().await;
    tracing::info!(dropped, "rankings cache flushed on request");
    Json(CacheFlushResponse { dropped })
}

/// Catalog routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/collections", post(create_collection))
        .route("/collections/{id}/active", patch(set_collection_active))
        .route("/collections/{id}/refresh", post(refresh_collection))
        .route("/collections/{id}/events", post(create_event))
        .route("/events/{id}/close", post(close_event))
        .route("/events/{id}/badges", post(issue_badge))
        .route("/badges/{id}/transfer", post(transfer_badge))
        .route("/badges/{id}/burn", post(burn_badge))
        .route("/rankings/cache", delete(flush_rankings_cache))
}
