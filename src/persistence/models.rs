//! Database row models for the catalog tables.
//!
//! Rows mirror the PostgreSQL column types; conversion into domain types
//! checks the numeric ranges the domain relies on.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::store::StoreError;
use crate::domain::{Badge, Collection, Event, Holder, WalletHolding};

/// A row from the `collections` table.
#[derive(Debug, Clone, FromRow)]
pub struct CollectionRow {
    /// Primary key.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional unique mint authority.
    pub mint_authority: Option<String>,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Denormalized badge count.
    pub total_poaps: i64,
    /// Denormalized distinct holder count.
    pub unique_holders: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning collection.
    pub collection_id: Uuid,
    /// Display name.
    pub name: String,
    /// Stored month label.
    pub month: String,
    /// Stored year.
    pub year: i32,
    /// Event start.
    pub start_date: DateTime<Utc>,
    /// Event end.
    pub end_date: DateTime<Utc>,
    /// Issuing authority.
    pub authority: String,
    /// Active flag.
    pub is_active: bool,
    /// Closed flag.
    pub is_closed: bool,
    /// Optional supply cap.
    pub max_supply: Option<i32>,
}

/// A row from the `badges` table.
#[derive(Debug, Clone, FromRow)]
pub struct BadgeRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning collection.
    pub collection_id: Uuid,
    /// Owning event.
    pub event_id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Image reference.
    pub image: String,
    /// Unique on-chain asset id.
    pub asset_id: String,
    /// Burned flag.
    pub is_burned: bool,
    /// Frozen flag.
    pub is_frozen: bool,
    /// Mint timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `badge_holders` table.
#[derive(Debug, Clone, FromRow)]
pub struct HolderRow {
    /// Primary key.
    pub id: Uuid,
    /// Held badge.
    pub badge_id: Uuid,
    /// Holding wallet.
    pub wallet_address: String,
    /// Acquisition time.
    pub acquired_at: DateTime<Utc>,
    /// Transfer-out time.
    pub transferred_at: Option<DateTime<Utc>>,
    /// Transfer destination.
    pub transferred_to: Option<String>,
}

/// A current holding joined with collection and event names.
#[derive(Debug, Clone, FromRow)]
pub struct HoldingRow {
    /// Collection id.
    pub collection_id: Uuid,
    /// Collection name.
    pub collection_name: String,
    /// Event id.
    pub event_id: Uuid,
    /// Event name.
    pub event_name: String,
    /// Badge id.
    pub badge_id: Uuid,
    /// Badge name.
    pub badge_name: String,
    /// Badge image.
    pub image: String,
    /// Badge mint time.
    pub minted_at: DateTime<Utc>,
}

fn non_negative(value: i64, field: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Malformed(format!("negative {field}: {value}")))
}

impl TryFrom<CollectionRow> for Collection {
    type Error = StoreError;

    fn try_from(row: CollectionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            mint_authority: row.mint_authority,
            is_active: row.is_active,
            total_poaps: non_negative(row.total_poaps, "total_poaps")?,
            unique_holders: non_negative(row.unique_holders, "unique_holders")?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let max_supply = row
            .max_supply
            .map(|v| {
                u32::try_from(v)
                    .map_err(|_| StoreError::Malformed(format!("negative max_supply: {v}")))
            })
            .transpose()?;
        Ok(Self {
            id: row.id.into(),
            collection_id: row.collection_id.into(),
            name: row.name,
            month: row.month,
            year: row.year,
            start_date: row.start_date,
            end_date: row.end_date,
            authority: row.authority,
            is_active: row.is_active,
            is_closed: row.is_closed,
            max_supply,
        })
    }
}

impl From<BadgeRow> for Badge {
    fn from(row: BadgeRow) -> Self {
        Self {
            id: row.id.into(),
            collection_id: row.collection_id.into(),
            event_id: row.event_id.into(),
            name: row.name,
            description: row.description,
            image: row.image,
            asset_id: row.asset_id,
            is_burned: row.is_burned,
            is_frozen: row.is_frozen,
            created_at: row.created_at,
        }
    }
}

impl From<HolderRow> for Holder {
    fn from(row: HolderRow) -> Self {
        Self {
            id: row.id.into(),
            badge_id: row.badge_id.into(),
            wallet_address: row.wallet_address,
            acquired_at: row.acquired_at,
            transferred_at: row.transferred_at,
            transferred_to: row.transferred_to,
        }
    }
}

impl From<HoldingRow> for WalletHolding {
    fn from(row: HoldingRow) -> Self {
        Self {
            collection_id: row.collection_id.into(),
            collection_name: row.collection_name,
            event_id: row.event_id.into(),
            event_name: row.event_name,
            badge_id: row.badge_id.into(),
            badge_name: row.badge_name,
            image: row.image,
            minted_at: row.minted_at,
        }
    }
}
