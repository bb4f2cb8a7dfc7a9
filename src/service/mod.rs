//! Service layer: rankings computation and catalog writes.
//!
//! [`RankingsService`] serves every rankings view through the read-through
//! cache. [`CatalogService`] validates administrative writes and invalidates
//! the cached views after each one.

pub mod aggregation;
pub mod catalog_service;
pub mod rankings_service;

pub use aggregation::{AggregationError, summarize_collection};
pub use catalog_service::CatalogService;
pub use rankings_service::{RankingsEngine, RankingsService};
