//! Data store traits consumed by the rankings engine and catalog service.
//!
//! [`DataStore`] is the read side the engine depends on. [`CatalogStore`]
//! adds the administrative writes. Both are object safe and injected as
//! `Arc<dyn ...>` so tests can substitute their own implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Badge, BadgeId, Collection, CollectionId, CollectionRecord, Event, EventId, RankingsFilter,
    WalletHolding,
};

/// Failures reported by a data store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or the query failed.
    #[error("data store unavailable: {0}")]
    Unavailable(String),

    /// The backend returned data that violates the catalog model.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. `"event"`).
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The write conflicts with current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Input for [`CatalogStore::create_collection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional mint authority; unique when present.
    pub mint_authority: Option<String>,
}

/// Input for [`CatalogStore::create_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Display name.
    pub name: String,
    /// Month label as supplied by the source system.
    pub month: String,
    /// Year as supplied by the source system.
    pub year: i32,
    /// Event start.
    pub start_date: DateTime<Utc>,
    /// Event end.
    pub end_date: DateTime<Utc>,
    /// Issuing authority.
    pub authority: String,
    /// Optional supply cap.
    pub max_supply: Option<u32>,
}

/// Input for [`CatalogStore::issue_badge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBadge {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Image reference.
    pub image: String,
    /// Unique on-chain asset id.
    pub asset_id: String,
    /// First holder.
    pub wallet_address: String,
}

/// Read-only catalog access used by the rankings engine.
#[async_trait]
pub trait DataStore: Send + Sync + std::fmt::Debug {
    /// Counts active collections matching `filter`.
    async fn count_collections(&self, filter: &RankingsFilter) -> Result<u64, StoreError>;

    /// Fetches up to `limit` active collections matching `filter`, starting
    /// at `offset`, fully materialized.
    ///
    /// Ordering: descending count of current-holder badges, then ascending id.
    /// Events are newest first, badges oldest first, holders by acquisition.
    async fn fetch_collections(
        &self,
        filter: &RankingsFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CollectionRecord>, StoreError>;

    /// Current-holder badge counts per wallet across active collections,
    /// descending count then ascending wallet, at most `limit` rows.
    async fn top_wallets(&self, limit: u32) -> Result<Vec<(String, u64)>, StoreError>;

    /// Badges currently held by `wallet` in active collections.
    async fn wallet_holdings(&self, wallet: &str) -> Result<Vec<WalletHolding>, StoreError>;
}

/// Administrative writes on the catalog.
///
/// Every write keeps the collection's denormalized counters in step.
#[async_trait]
pub trait CatalogStore: DataStore {
    /// Creates an active collection with zeroed counters.
    async fn create_collection(&self, input: NewCollection) -> Result<Collection, StoreError>;

    /// Activates or soft-deactivates a collection.
    async fn set_collection_active(
        &self,
        id: CollectionId,
        active: bool,
    ) -> Result<Collection, StoreError>;

    /// Creates an open, active event under `collection_id`.
    async fn create_event(
        &self,
        collection_id: CollectionId,
        input: NewEvent,
    ) -> Result<Event, StoreError>;

    /// Closes an event for issuance.
    async fn close_event(&self, id: EventId) -> Result<Event, StoreError>;

    /// Records a minted badge under `event_id` and its first holder.
    async fn issue_badge(&self, event_id: EventId, input: NewBadge) -> Result<Badge, StoreError>;

    /// Moves a badge from its current holder to `to_wallet`.
    async fn transfer_badge(&self, id: BadgeId, to_wallet: &str) -> Result<Badge, StoreError>;

    /// Marks a badge burned and closes its current holder row.
    async fn burn_badge(&self, id: BadgeId) -> Result<Badge, StoreError>;

    /// Recomputes a collection's denormalized counters from its badges.
    async fn refresh_collection_totals(&self, id: CollectionId) -> Result<Collection, StoreError>;
}
