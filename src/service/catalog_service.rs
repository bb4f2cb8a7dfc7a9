//! Catalog service: validated administrative writes.
//!
//! Every successful write drops the cached rankings so the next read sees
//! it. Failed writes leave the cache alone.

use std::sync::Arc;

use crate::domain::{Badge, BadgeId, Collection, CollectionId, Event, EventId, is_wallet_address};
use crate::error::ServiceError;
use crate::persistence::{CatalogStore, NewBadge, NewCollection, NewEvent};

use super::RankingsService;

/// Month labels accepted on events.
const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn require(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_wallet(field: &str, value: &str) -> Result<(), ServiceError> {
    if !is_wallet_address(value) {
        return Err(ServiceError::InvalidInput(format!(
            "{field} is not a valid wallet address"
        )));
    }
    Ok(())
}

/// Administrative writes on the catalog.
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    rankings: Arc<RankingsService>,
}

impl CatalogService {
    /// Creates a new `CatalogService`.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>, rankings: Arc<RankingsService>) -> Self {
        Self { store, rankings }
    }

    async fn written<T>(&self, operation: &'static str, value: T) -> T {
        let dropped = self.rankings.invalidate().await;
        tracing::info!(operation, dropped, "catalog updated");
        value
    }

    /// Registers a collection.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidInput`] for an empty name or malformed mint
    /// authority, [`ServiceError::Conflict`] if the authority is taken.
    pub async fn create_collection(
        &self,
        input: NewCollection,
    ) -> Result<Collection, ServiceError> {
        require("name", &input.name)?;
        if let Some(authority) = &input.mint_authority {
            require_wallet("mintAuthority", authority)?;
        }
        let collection = self.store.create_collection(input).await?;
        Ok(self.written("create_collection", collection).await)
    }

    /// Activates or deactivates a collection.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if the collection does not exist.
    pub async fn set_collection_active(
        &self,
        id: CollectionId,
        active: bool,
    ) -> Result<Collection, ServiceError> {
        let collection = self.store.set_collection_active(id, active).await?;
        Ok(self.written("set_collection_active", collection).await)
    }

    /// Recomputes a collection's stored counters.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if the collection does not exist.
    pub async fn refresh_collection(&self, id: CollectionId) -> Result<Collection, ServiceError> {
        let collection = self.store.refresh_collection_totals(id).await?;
        Ok(self.written("refresh_collection", collection).await)
    }

    /// Creates an event under `collection_id`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidInput`] for empty fields, an unknown month
    /// label, an end before the start or a zero supply cap;
    /// [`ServiceError::NotFound`] if the collection does not exist.
    pub async fn create_event(
        &self,
        collection_id: CollectionId,
        input: NewEvent,
    ) -> Result<Event, ServiceError> {
        require("name", &input.name)?;
        require("authority", &input.authority)?;
        if !MONTHS.contains(&input.month.as_str()) {
            return Err(ServiceError::InvalidInput(format!(
                "{} is not a month name",
                input.month
            )));
        }
        if input.end_date < input.start_date {
            return Err(ServiceError::InvalidInput("endDate precedes startDate".to_string()));
        }
        if input.max_supply == Some(0) {
            return Err(ServiceError::InvalidInput("maxSupply must be positive".to_string()));
        }
        let event = self.store.create_event(collection_id, input).await?;
        Ok(self.written("create_event", event).await)
    }

    /// Closes an event for issuance.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if the event does not exist.
    pub async fn close_event(&self, id: EventId) -> Result<Event, ServiceError> {
        let event = self.store.close_event(id).await?;
        Ok(self.written("close_event", event).await)
    }

    /// Records a minted badge and its first holder.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidInput`] for empty fields or a malformed
    /// wallet, [`ServiceError::NotFound`] for an unknown event and
    /// [`ServiceError::Conflict`] when the event cannot issue it.
    pub async fn issue_badge(
        &self,
        event_id: EventId,
        input: NewBadge,
    ) -> Result<Badge, ServiceError> {
        require("name", &input.name)?;
        require("image", &input.image)?;
        require("assetId", &input.asset_id)?;
        require_wallet("walletAddress", &input.wallet_address)?;
        let badge = self.store.issue_badge(event_id, input).await?;
        Ok(self.written("issue_badge", badge).await)
    }

    /// Moves a badge to `to_wallet`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidInput`] for a malformed wallet,
    /// [`ServiceError::NotFound`] for an unknown badge and
    /// [`ServiceError::Conflict`] if the badge cannot move.
    pub async fn transfer_badge(
        &self,
        id: BadgeId,
        to_wallet: &str,
    ) -> Result<Badge, ServiceError> {
        require_wallet("toWallet", to_wallet)?;
        let badge = self.store.transfer_badge(id, to_wallet).await?;
        Ok(self.written("transfer_badge", badge).await)
    }

    /// Burns a badge.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown badge,
    /// [`ServiceError::Conflict`] if it is already burned.
    pub async fn burn_badge(&self, id: BadgeId) -> Result<Badge, ServiceError> {
        let badge = self.store.burn_badge(id).await?;
        Ok(self.written("burn_badge", badge).await)
    }
}
