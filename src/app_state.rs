//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{CatalogService, RankingsService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Cached rankings views.
    pub rankings: Arc<RankingsService>,
    /// Administrative catalog writes.
    pub catalog: Arc<CatalogService>,
}
