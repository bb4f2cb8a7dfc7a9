//! Catalog entities: collections, events, badges and their holders.
//!
//! The catalog is a strict tree. A [`Collection`] owns [`Event`]s, an event
//! owns [`Badge`]s, and a badge owns one or more [`Holder`] rows describing
//! its ownership history. The `*Record` types are the fully materialized
//! form handed out by the data store for aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{BadgeId, CollectionId, EventId, HolderId};

/// A named grouping of badge-issuing events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Unique collection identifier.
    pub id: CollectionId,
    /// Display name.
    pub name: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// On-chain mint authority for the collection, if known.
    pub mint_authority: Option<String>,
    /// Soft-delete flag. Inactive collections never appear in rankings.
    pub is_active: bool,
    /// Denormalized count of non-burned badges issued under the collection.
    pub total_poaps: u64,
    /// Denormalized count of distinct wallets currently holding a badge.
    pub unique_holders: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A single occurrence within a collection.
///
/// `month` and `year` are stored as supplied by the source system and are
/// never derived from `start_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Owning collection.
    pub collection_id: CollectionId,
    /// Display name.
    pub name: String,
    /// Calendar month label (e.g. `"January"`).
    pub month: String,
    /// Calendar year.
    pub year: i32,
    /// Event start.
    pub start_date: DateTime<Utc>,
    /// Event end.
    pub end_date: DateTime<Utc>,
    /// Identifier of the issuing authority.
    pub authority: String,
    /// Whether the event is active.
    pub is_active: bool,
    /// Whether the event is closed for issuance.
    pub is_closed: bool,
    /// Optional cap on the number of badges issued.
    pub max_supply: Option<u32>,
}

impl Event {
    /// Returns the `"<Month> <Year>"` activity label for this event.
    #[must_use]
    pub fn month_label(&self) -> String {
        format!("{} {}", self.month, self.year)
    }
}

/// A single issued attendance badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    /// Unique badge identifier.
    pub id: BadgeId,
    /// Owning collection; must agree with the event's collection.
    pub collection_id: CollectionId,
    /// Owning event.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Image reference (URL or content hash).
    pub image: String,
    /// Unique on-chain asset identifier.
    pub asset_id: String,
    /// Burned badges are excluded from every count.
    pub is_burned: bool,
    /// Frozen badges cannot be transferred.
    pub is_frozen: bool,
    /// Mint timestamp.
    pub created_at: DateTime<Utc>,
}

/// One ownership period of a badge.
///
/// The row without `transferred_at` is the badge's current holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    /// Unique row identifier.
    pub id: HolderId,
    /// Badge being held.
    pub badge_id: BadgeId,
    /// Holding wallet address.
    pub wallet_address: String,
    /// When the wallet acquired the badge.
    pub acquired_at: DateTime<Utc>,
    /// When the badge left the wallet, if it did.
    pub transferred_at: Option<DateTime<Utc>>,
    /// Destination wallet of the transfer, if any.
    pub transferred_to: Option<String>,
}

impl Holder {
    /// Returns `true` if this row describes current ownership.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.transferred_at.is_none()
    }
}

/// A badge together with its full holder history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeRecord {
    /// The badge itself.
    pub badge: Badge,
    /// Holder rows ordered by acquisition time.
    pub holders: Vec<Holder>,
}

/// An event with all of its badges materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// The event itself.
    pub event: Event,
    /// Badges issued under the event, ordered by mint time.
    pub badges: Vec<BadgeRecord>,
}

/// A collection with its events, badges and holders materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRecord {
    /// The collection itself.
    pub collection: Collection,
    /// Events ordered by start date, newest first.
    pub events: Vec<EventRecord>,
}

/// A badge currently held by a wallet, joined with its collection and event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletHolding {
    /// Collection of the badge.
    pub collection_id: CollectionId,
    /// Collection display name.
    pub collection_name: String,
    /// Event of the badge.
    pub event_id: EventId,
    /// Event display name.
    pub event_name: String,
    /// Badge identifier.
    pub badge_id: BadgeId,
    /// Badge display name.
    pub badge_name: String,
    /// Badge image reference.
    pub image: String,
    /// Badge mint timestamp.
    pub minted_at: DateTime<Utc>,
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Returns `true` if `address` looks like a Solana wallet: 32 to 44
/// base58 characters.
#[must_use]
pub fn is_wallet_address(address: &str) -> bool {
    (32..=44).contains(&address.len()) && address.chars().all(|c| BASE58_ALPHABET.contains(c))
}
