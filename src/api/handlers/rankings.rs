//! Rankings read handlers: collection pages, global leaderboard, wallets.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{GlobalRankingsParams, RankingsParams};
use crate::api::extract::ApiQuery;
use crate::app_state::AppState;
use crate::domain::{GlobalCollector, RankingsPage, WalletCollectionHoldings};
use crate::error::{ErrorResponse, ServiceError};

/// `GET /rankings` — One page of collection rankings.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidInput`] for malformed parameters and a
/// server error if the data store is unavailable.
#[utoipa::path(
    get,
    path = "/rankings",
    tag = "Rankings",
    summary = "Collection rankings",
    description = "Up to 20 collections by badge count, with busiest month and top collectors.",
    params(RankingsParams),
    responses(
        (status = 200, description = "Rankings page", body = RankingsPage),
        (status = 400, description = "Malformed page or id", body = ErrorResponse),
        (status = 500, description = "Data store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_rankings(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RankingsParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let query = params.into_query()?;
    let page = state.rankings.rankings(query).await?;
    Ok(Json(page))
}

/// `GET /rankings/global` — Cross-collection leaderboard.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidInput`] for a non-integer limit and a
/// server error if the data store is unavailable.
#[utoipa::path(
    get,
    path = "/rankings/global",
    tag = "Rankings",
    summary = "Global top collectors",
    description = "Ranks wallets by badges currently held across every active collection.",
    params(GlobalRankingsParams),
    responses(
        (status = 200, description = "Leaderboard", body = Vec<GlobalCollector>),
        (status = 400, description = "Malformed limit", body = ErrorResponse),
        (status = 500, description = "Data store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_global_rankings(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<GlobalRankingsParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = params.limit()?;
    let board = state.rankings.global_top_collectors(limit).await?;
    Ok(Json(board))
}

/// `GET /rankings/wallets/{address}` — A wallet's holdings per collection.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidInput`] for a malformed address and a
/// server error if the data store is unavailable.
#[utoipa::path(
    get,
    path = "/rankings/wallets/{address}",
    tag = "Rankings",
    summary = "Wallet holdings",
    description = "Lists the badges a wallet currently holds, grouped by collection.",
    params(
        ("address" = String, Path, description = "Base58 wallet address"),
    ),
    responses(
        (
            status = 200,
            description = "Holdings per collection",
            body = Vec<WalletCollectionHoldings>
        ),
        (status = 400, description = "Malformed address", body = ErrorResponse),
        (status = 500, description = "Data store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_wallet_rankings(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let holdings = state.rankings.wallet_rankings(&address).await?;
    Ok(Json(holdings))
}

/// Rankings routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rankings", get(get_rankings))
        .route("/rankings/global", get(get_global_rankings))
        .route("/rankings/wallets/{address}", get(get_wallet_rankings))
}
