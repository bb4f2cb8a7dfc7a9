//! Computed rankings views.
//!
//! These are the outputs of aggregation. They are immutable once built and
//! shared out of the rankings cache behind an `Arc`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{BadgeId, CollectionId, EventId};

/// Label reported as `most_active_month` when a collection has no badges.
pub const NO_ACTIVITY: &str = "No activity";

/// One event a collector participated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventRef {
    /// Event identifier.
    pub id: EventId,
    /// Event name.
    pub name: String,
    /// Stored month label.
    pub month: String,
    /// Stored year.
    pub year: i32,
}

/// A ranked wallet inside one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopCollector {
    /// Wallet address.
    pub wallet: String,
    /// Badges currently held from this collection.
    pub count: u64,
    /// 1-based position in the sorted list.
    pub rank: u32,
    /// Distinct events the wallet holds a badge from, first-encountered order.
    pub events: Vec<EventRef>,
}

/// Per-event statistics shown alongside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    /// Event identifier.
    pub id: EventId,
    /// Event name.
    pub name: String,
    /// Stored month label.
    pub month: String,
    /// Stored year.
    pub year: i32,
    /// Event start.
    pub start_date: DateTime<Utc>,
    /// Event end.
    pub end_date: DateTime<Utc>,
    /// Badges with a current holder.
    pub total_poaps: u64,
    /// Distinct current holder wallets.
    pub unique_collectors: u64,
}

/// Statistics for one collection on a rankings page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    /// Collection identifier.
    pub id: CollectionId,
    /// Collection name.
    pub name: String,
    /// Collection description.
    pub description: Option<String>,
    /// Mint authority, if known.
    pub mint_authority: Option<String>,
    /// Badges with a current holder.
    pub total_poaps: u64,
    /// Number of events.
    pub unique_events: u64,
    /// `"<Month> <Year>"` label with the most badges, or [`NO_ACTIVITY`].
    pub most_active_month: String,
    /// Up to ten wallets ranked by badge count.
    pub top_collectors: Vec<TopCollector>,
    /// Per-event statistics.
    pub events: Vec<EventSummary>,
}

/// Pagination metadata of a rankings page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Requested page (after clamping).
    pub current_page: u32,
    /// Total number of pages.
    pub total_pages: u32,
    /// Whether a later page exists.
    pub has_more: bool,
}

/// One page of collection rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankingsPage {
    /// Collection summaries, busiest first.
    pub groups: Vec<CollectionSummary>,
    /// Pagination metadata.
    pub pagination: Pagination,
}

/// A wallet on the cross-collection leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalCollector {
    /// 1-based position.
    pub rank: u32,
    /// Wallet address.
    pub wallet: String,
    /// Badges currently held across all active collections.
    pub count: u64,
}

/// A badge listed in a wallet's holdings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeldBadge {
    /// Badge identifier.
    pub id: BadgeId,
    /// Badge name.
    pub name: String,
    /// Badge image reference.
    pub image: String,
    /// Name of the event the badge was issued for.
    pub event_name: String,
    /// Mint timestamp.
    pub mint_date: DateTime<Utc>,
}

/// A wallet's holdings within one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletCollectionHoldings {
    /// Collection identifier.
    pub collection_id: CollectionId,
    /// Collection name.
    pub collection_name: String,
    /// Badges held from this collection.
    pub total_poaps: u64,
    /// Earliest mint date among held badges.
    pub first_poap_date: DateTime<Utc>,
    /// Latest mint date among held badges.
    pub latest_poap_date: DateTime<Utc>,
    /// Distinct events covered by held badges.
    pub unique_events: u64,
    /// The held badges, in store order.
    pub poaps: Vec<HeldBadge>,
}
