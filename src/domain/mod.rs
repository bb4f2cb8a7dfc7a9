//! Domain layer: catalog entities, identifiers, queries and computed views.
//!
//! The catalog types mirror what the data store materializes; the summary
//! types are what the rankings engine produces from them.

pub mod catalog;
pub mod ids;
pub mod query;
pub mod summary;

pub use catalog::{
    Badge, BadgeRecord, Collection, CollectionRecord, Event, EventRecord, Holder, WalletHolding,
    is_wallet_address,
};
pub use ids::{BadgeId, CollectionId, EventId, HolderId};
pub use query::{RankingsFilter, RankingsQuery};
pub use summary::{
    CollectionSummary, EventRef, EventSummary, GlobalCollector, HeldBadge, NO_ACTIVITY,
    Pagination, RankingsPage, TopCollector, WalletCollectionHoldings,
};
