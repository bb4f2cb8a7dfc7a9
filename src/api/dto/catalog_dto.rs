//! Request bodies for the administrative catalog endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::persistence::{NewBadge, NewCollection, NewEvent};

/// Request body for `POST /api/v1/collections`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional mint authority (base58 address).
    #[serde(default)]
    pub mint_authority: Option<String>,
}

impl From<CreateCollectionRequest> for NewCollection {
    fn from(req: CreateCollectionRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            mint_authority: req.mint_authority,
        }
    }
}

/// Request body for `PATCH /api/v1/collections/{id}/active`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    /// `false` hides the collection from every rankings view.
    pub active: bool,
}

/// Request body for `POST /api/v1/collections/{id}/events`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Display name.
    pub name: String,
    /// English month name, e.g. `"February"`.
    pub month: String,
    /// Calendar year.
    pub year: i32,
    /// Event start.
    pub start_date: DateTime<Utc>,
    /// Event end.
    pub end_date: DateTime<Utc>,
    /// Issuing authority.
    pub authority: String,
    /// Optional supply cap.
    #[serde(default)]
    pub max_supply: Option<u32>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            name: req.name,
            month: req.month,
            year: req.year,
            start_date: req.start_date,
            end_date: req.end_date,
            authority: req.authority,
            max_supply: req.max_supply,
        }
    }
}

/// Request body for `POST /api/v1/events/{id}/badges`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueBadgeRequest {
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Image reference.
    pub image: String,
    /// On-chain asset id.
    pub asset_id: String,
    /// Wallet receiving the badge.
    pub wallet_address: String,
}

impl From<IssueBadgeRequest> for NewBadge {
    fn from(req: IssueBadgeRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            image: req.image,
            asset_id: req.asset_id,
            wallet_address: req.wallet_address,
        }
    }
}

/// Request body for `POST /api/v1/badges/{id}/transfer`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferBadgeRequest {
    /// Destination wallet.
    pub to_wallet: String,
}
