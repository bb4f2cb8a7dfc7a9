//! In-memory catalog store.
//!
//! Backs the service when persistence is disabled and is the fixture store
//! for tests. All state sits behind a single [`tokio::sync::RwLock`]: reads
//! run concurrently, writes are serialized.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::store::{CatalogStore, DataStore, NewBadge, NewCollection, NewEvent, StoreError};
use crate::domain::{
    Badge, BadgeId, BadgeRecord, Collection, CollectionId, CollectionRecord, Event, EventId,
    EventRecord, Holder, HolderId, RankingsFilter, WalletHolding,
};

#[derive(Debug, Default)]
struct CatalogState {
    collections: HashMap<CollectionId, Collection>,
    events: HashMap<EventId, Event>,
    badges: HashMap<BadgeId, Badge>,
    holders: HashMap<BadgeId, Vec<Holder>>,
}

impl CatalogState {
    fn current_holder(&self, badge_id: BadgeId) -> Option<&Holder> {
        self.holders
            .get(&badge_id)
            .and_then(|rows| rows.iter().find(|h| h.is_current()))
    }

    /// Badges that count toward rankings: not burned and currently held.
    fn held_badges(&self) -> impl Iterator<Item = (&Badge, &Holder)> {
        self.badges.values().filter_map(move |badge| {
            if badge.is_burned {
                return None;
            }
            self.current_holder(badge.id).map(|holder| (badge, holder))
        })
    }

    fn is_active_collection(&self, id: CollectionId) -> bool {
        self.collections.get(&id).is_some_and(|c| c.is_active)
    }

    fn matches(&self, collection: &Collection, filter: &RankingsFilter) -> bool {
        if !collection.is_active {
            return false;
        }
        if filter.collection_id.is_some_and(|id| id != collection.id) {
            return false;
        }
        match filter.event_id {
            Some(event_id) => self
                .events
                .get(&event_id)
                .is_some_and(|e| e.collection_id == collection.id),
            None => true,
        }
    }

    fn materialize(&self, collection: &Collection, filter: &RankingsFilter) -> CollectionRecord {
        let mut events: Vec<&Event> = self
            .events
            .values()
            .filter(|e| e.collection_id == collection.id)
            .filter(|e| filter.event_id.is_none_or(|id| id == e.id))
            .collect();
        events.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.id.cmp(&b.id)));

        let events = events
            .into_iter()
            .map(|event| {
                let mut badges: Vec<&Badge> = self
                    .badges
                    .values()
                    .filter(|b| b.event_id == event.id)
                    .collect();
                badges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

                EventRecord {
                    event: event.clone(),
                    badges: badges
                        .into_iter()
                        .map(|badge| BadgeRecord {
                            badge: badge.clone(),
                            holders: self.holders.get(&badge.id).cloned().unwrap_or_default(),
                        })
                        .collect(),
                }
            })
            .collect();

        CollectionRecord {
            collection: collection.clone(),
            events,
        }
    }

    fn recount(&mut self, collection_id: CollectionId) -> Result<Collection, StoreError> {
        let total_poaps = self
            .badges
            .values()
            .filter(|b| b.collection_id == collection_id && !b.is_burned)
            .count() as u64;
        let unique_holders = self
            .held_badges()
            .filter(|(badge, _)| badge.collection_id == collection_id)
            .map(|(_, holder)| holder.wallet_address.as_str())
            .collect::<HashSet<_>>()
            .len() as u64;

        let collection = self
            .collections
            .get_mut(&collection_id)
            .ok_or_else(|| StoreError::not_found("collection", collection_id))?;
        collection.total_poaps = total_poaps;
        collection.unique_holders = unique_holders;
        Ok(collection.clone())
    }
}

/// Catalog store held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<CatalogState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn current_badge_count(record: &CollectionRecord) -> usize {
    record
        .events
        .iter()
        .flat_map(|e| &e.badges)
        .filter(|b| !b.badge.is_burned && b.holders.iter().any(Holder::is_current))
        .count()
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn count_collections(&self, filter: &RankingsFilter) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .values()
            .filter(|c| state.matches(c, filter))
            .count() as u64)
    }

    async fn fetch_collections(
        &self,
        filter: &RankingsFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CollectionRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<(usize, CollectionRecord)> = state
            .collections
            .values()
            .filter(|c| state.matches(c, filter))
            .map(|c| {
                let record = state.materialize(c, filter);
                (current_badge_count(&record), record)
            })
            .collect();
        records.sort_by(|(count_a, a), (count_b, b)| {
            count_b
                .cmp(count_a)
                .then(a.collection.id.cmp(&b.collection.id))
        });

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(records
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, record)| record)
            .collect())
    }

    async fn top_wallets(&self, limit: u32) -> Result<Vec<(String, u64)>, StoreError> {
        let state = self.state.read().await;
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for (badge, holder) in state.held_badges() {
            if state.is_active_collection(badge.collection_id) {
                *counts.entry(holder.wallet_address.as_str()).or_default() += 1;
            }
        }

        let mut ranked: Vec<(String, u64)> = counts
            .into_iter()
            .map(|(wallet, count)| (wallet.to_string(), count))
            .collect();
        ranked.sort_by(|(wallet_a, a), (wallet_b, b)| b.cmp(a).then(wallet_a.cmp(wallet_b)));
        ranked.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(ranked)
    }

    async fn wallet_holdings(&self, wallet: &str) -> Result<Vec<WalletHolding>, StoreError> {
        let state = self.state.read().await;
        let mut holdings = Vec::new();
        for (badge, holder) in state.held_badges() {
            if holder.wallet_address != wallet {
                continue;
            }
            let Some(collection) = state.collections.get(&badge.collection_id) else {
                continue;
            };
            if !collection.is_active {
                continue;
            }
            let event = state
                .events
                .get(&badge.event_id)
                .ok_or_else(|| StoreError::Malformed(format!("badge {} has no event", badge.id)))?;
            holdings.push(WalletHolding {
                collection_id: collection.id,
                collection_name: collection.name.clone(),
                event_id: event.id,
                event_name: event.name.clone(),
                badge_id: badge.id,
                badge_name: badge.name.clone(),
                image: badge.image.clone(),
                minted_at: badge.created_at,
            });
        }
        holdings.sort_by(|a, b| a.minted_at.cmp(&b.minted_at).then(a.badge_id.cmp(&b.badge_id)));
        Ok(holdings)
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_collection(&self, input: NewCollection) -> Result<Collection, StoreError> {
        let mut state = self.state.write().await;
        if let Some(authority) = &input.mint_authority
            && state
                .collections
                .values()
                .any(|c| c.mint_authority.as_ref() == Some(authority))
        {
            return Err(StoreError::Conflict(format!(
                "mint authority {authority} already registered"
            )));
        }

        let collection = Collection {
            id: CollectionId::new(),
            name: input.name,
            description: input.description,
            mint_authority: input.mint_authority,
            is_active: true,
            total_poaps: 0,
            unique_holders: 0,
            created_at: Utc::now(),
        };
        state.collections.insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn set_collection_active(
        &self,
        id: CollectionId,
        active: bool,
    ) -> Result<Collection, StoreError> {
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("collection", id))?;
        collection.is_active = active;
        Ok(collection.clone())
    }

    async fn create_event(
        &self,
        collection_id: CollectionId,
        input: NewEvent,
    ) -> Result<Event, StoreError> {
        let mut state = self.state.write().await;
        if !state.collections.contains_key(&collection_id) {
            return Err(StoreError::not_found("collection", collection_id));
        }

        let event = Event {
            id: EventId::new(),
            collection_id,
            name: input.name,
            month: input.month,
            year: input.year,
            start_date: input.start_date,
            end_date: input.end_date,
            authority: input.authority,
            is_active: true,
            is_closed: false,
            max_supply: input.max_supply,
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn close_event(&self, id: EventId) -> Result<Event, StoreError> {
        let mut state = self.state.write().await;
        let event = state
            .events
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("event", id))?;
        event.is_closed = true;
        Ok(event.clone())
    }

    async fn issue_badge(&self, event_id: EventId, input: NewBadge) -> Result<Badge, StoreError> {
        let mut state = self.state.write().await;
        let event = state
            .events
            .get(&event_id)
            .ok_or_else(|| StoreError::not_found("event", event_id))?;
        if event.is_closed {
            return Err(StoreError::Conflict(format!("event {event_id} is closed")));
        }
        if let Some(max_supply) = event.max_supply {
            let issued = state
                .badges
                .values()
                .filter(|b| b.event_id == event_id)
                .count();
            if issued >= usize::try_from(max_supply).unwrap_or(usize::MAX) {
                return Err(StoreError::Conflict(format!(
                    "event {event_id} reached its supply of {max_supply}"
                )));
            }
        }
        if state.badges.values().any(|b| b.asset_id == input.asset_id) {
            return Err(StoreError::Conflict(format!(
                "asset {} already recorded",
                input.asset_id
            )));
        }

        let now = Utc::now();
        let badge = Badge {
            id: BadgeId::new(),
            collection_id: event.collection_id,
            event_id,
            name: input.name,
            description: input.description,
            image: input.image,
            asset_id: input.asset_id,
            is_burned: false,
            is_frozen: false,
            created_at: now,
        };
        let holder = Holder {
            id: HolderId::new(),
            badge_id: badge.id,
            wallet_address: input.wallet_address,
            acquired_at: now,
            transferred_at: None,
            transferred_to: None,
        };

        state.badges.insert(badge.id, badge.clone());
        state.holders.insert(badge.id, vec![holder]);
        state.recount(badge.collection_id)?;
        Ok(badge)
    }

    async fn transfer_badge(&self, id: BadgeId, to_wallet: &str) -> Result<Badge, StoreError> {
        let mut state = self.state.write().await;
        let badge = state
            .badges
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("badge", id))?;
        if badge.is_burned {
            return Err(StoreError::Conflict(format!("badge {id} is burned")));
        }
        if badge.is_frozen {
            return Err(StoreError::Conflict(format!("badge {id} is frozen")));
        }

        let now = Utc::now();
        let rows = state.holders.entry(id).or_default();
        let current = rows
            .iter_mut()
            .find(|h| h.is_current())
            .ok_or_else(|| StoreError::Malformed(format!("badge {id} has no current holder")))?;
        if current.wallet_address == to_wallet {
            return Err(StoreError::Conflict(format!(
                "badge {id} is already held by {to_wallet}"
            )));
        }
        current.transferred_at = Some(now);
        current.transferred_to = Some(to_wallet.to_string());
        rows.push(Holder {
            id: HolderId::new(),
            badge_id: id,
            wallet_address: to_wallet.to_string(),
            acquired_at: now,
            transferred_at: None,
            transferred_to: None,
        });

        state.recount(badge.collection_id)?;
        Ok(badge)
    }

    async fn burn_badge(&self, id: BadgeId) -> Result<Badge, StoreError> {
        let mut state = self.state.write().await;
        let badge = state
            .badges
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("badge", id))?;
        if badge.is_burned {
            return Err(StoreError::Conflict(format!("badge {id} is already burned")));
        }
        badge.is_burned = true;
        let badge = badge.clone();

        let now = Utc::now();
        if let Some(current) = state
            .holders
            .get_mut(&id)
            .and_then(|rows| rows.iter_mut().find(|h| h.is_current()))
        {
            current.transferred_at = Some(now);
        }

        state.recount(badge.collection_id)?;
        Ok(badge)
    }

    async fn refresh_collection_totals(&self, id: CollectionId) -> Result<Collection, StoreError> {
        self.state.write().await.recount(id)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn new_event(name: &str, month: &str, day: u32) -> NewEvent {
        let Some(start) = Utc.with_ymd_and_hms(2024, 1, day, 18, 0, 0).single() else {
            panic!("valid date");
        };
        NewEvent {
            name: name.to_string(),
            month: month.to_string(),
            year: 2024,
            start_date: start,
            end_date: start + Duration::hours(2),
            authority: "authority".to_string(),
            max_supply: None,
        }
    }

    fn new_badge(asset: &str, wallet: &str) -> NewBadge {
        NewBadge {
            name: format!("badge {asset}"),
            description: None,
            image: "ipfs://image".to_string(),
            asset_id: asset.to_string(),
            wallet_address: wallet.to_string(),
        }
    }

    async fn collection(store: &InMemoryStore, name: &str) -> Collection {
        let Ok(collection) = store
            .create_collection(NewCollection {
                name: name.to_string(),
                description: None,
                mint_authority: None,
            })
            .await
        else {
            panic!("collection creation failed");
        };
        collection
    }

    #[tokio::test]
    async fn issue_updates_counters_and_materializes() {
        let store = InMemoryStore::new();
        let acme = collection(&store, "Acme").await;
        let Ok(event) = store.create_event(acme.id, new_event("Meetup", "January", 5)).await else {
            panic!("event creation failed");
        };

        for (asset, wallet) in [("a1", "W1"), ("a2", "W1"), ("a3", "W2")] {
            let Ok(_) = store.issue_badge(event.id, new_badge(asset, wallet)).await else {
                panic!("issue failed");
            };
        }

        let Ok(records) = store.fetch_collections(&RankingsFilter::default(), 0, 20).await else {
            panic!("fetch failed");
        };
        let Some(record) = records.first() else {
            panic!("expected one collection");
        };
        assert_eq!(record.collection.total_poaps, 3);
        assert_eq!(record.collection.unique_holders, 2);
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.events.first().map(|e| e.badges.len()), Some(3));
    }

    #[tokio::test]
    async fn busiest_collection_comes_first() {
        let store = InMemoryStore::new();
        let quiet = collection(&store, "Quiet").await;
        let busy = collection(&store, "Busy").await;
        let Ok(quiet_event) = store.create_event(quiet.id, new_event("q", "March", 1)).await else {
            panic!("event creation failed");
        };
        let Ok(busy_event) = store.create_event(busy.id, new_event("b", "March", 2)).await else {
            panic!("event creation failed");
        };
        let _ = store.issue_badge(quiet_event.id, new_badge("q1", "W1")).await;
        let _ = store.issue_badge(busy_event.id, new_badge("b1", "W1")).await;
        let _ = store.issue_badge(busy_event.id, new_badge("b2", "W2")).await;

        let Ok(records) = store.fetch_collections(&RankingsFilter::default(), 0, 20).await else {
            panic!("fetch failed");
        };
        let names: Vec<&str> = records.iter().map(|r| r.collection.name.as_str()).collect();
        assert_eq!(names, vec!["Busy", "Quiet"]);

        let Ok(second_page) = store.fetch_collections(&RankingsFilter::default(), 1, 20).await
        else {
            panic!("fetch failed");
        };
        assert_eq!(second_page.len(), 1);
    }

    #[tokio::test]
    async fn event_filter_narrows_collection_and_events() {
        let store = InMemoryStore::new();
        let acme = collection(&store, "Acme").await;
        let other = collection(&store, "Other").await;
        let Ok(jan) = store.create_event(acme.id, new_event("Jan", "January", 1)).await else {
            panic!("event creation failed");
        };
        let _ = store.create_event(acme.id, new_event("Feb", "February", 2)).await;
        let _ = store.create_event(other.id, new_event("X", "March", 3)).await;

        let filter = RankingsFilter {
            collection_id: None,
            event_id: Some(jan.id),
        };
        assert_eq!(store.count_collections(&filter).await, Ok(1));
        let Ok(records) = store.fetch_collections(&filter, 0, 20).await else {
            panic!("fetch failed");
        };
        let Some(record) = records.first() else {
            panic!("expected acme");
        };
        assert_eq!(record.collection.id, acme.id);
        assert_eq!(record.events.len(), 1);
    }

    #[tokio::test]
    async fn inactive_collections_are_hidden() {
        let store = InMemoryStore::new();
        let acme = collection(&store, "Acme").await;
        let _ = store.set_collection_active(acme.id, false).await;

        assert_eq!(store.count_collections(&RankingsFilter::default()).await, Ok(0));
    }

    #[tokio::test]
    async fn transfer_moves_current_holder() {
        let store = InMemoryStore::new();
        let acme = collection(&store, "Acme").await;
        let Ok(event) = store.create_event(acme.id, new_event("Meetup", "January", 5)).await else {
            panic!("event creation failed");
        };
        let Ok(badge) = store.issue_badge(event.id, new_badge("a1", "W1")).await else {
            panic!("issue failed");
        };

        assert!(store.transfer_badge(badge.id, "W2").await.is_ok());
        assert!(matches!(
            store.transfer_badge(badge.id, "W2").await,
            Err(StoreError::Conflict(_))
        ));

        let Ok(w1) = store.wallet_holdings("W1").await else {
            panic!("holdings failed");
        };
        let Ok(w2) = store.wallet_holdings("W2").await else {
            panic!("holdings failed");
        };
        assert!(w1.is_empty());
        assert_eq!(w2.len(), 1);
        assert_eq!(store.top_wallets(10).await, Ok(vec![("W2".to_string(), 1)]));
    }

    #[tokio::test]
    async fn closed_event_and_supply_cap_reject_issuance() {
        let store = InMemoryStore::new();
        let acme = collection(&store, "Acme").await;
        let mut capped = new_event("Capped", "May", 1);
        capped.max_supply = Some(1);
        let Ok(capped) = store.create_event(acme.id, capped).await else {
            panic!("event creation failed");
        };
        assert!(store.issue_badge(capped.id, new_badge("c1", "W1")).await.is_ok());
        assert!(matches!(
            store.issue_badge(capped.id, new_badge("c2", "W2")).await,
            Err(StoreError::Conflict(_))
        ));

        let Ok(open) = store.create_event(acme.id, new_event("Open", "May", 2)).await else {
            panic!("event creation failed");
        };
        assert!(matches!(
            store.issue_badge(open.id, new_badge("c1", "W3")).await,
            Err(StoreError::Conflict(_))
        ));
        let _ = store.close_event(open.id).await;
        assert!(matches!(
            store.issue_badge(open.id, new_badge("c3", "W3")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn burn_excludes_badge_from_counts() {
        let store = InMemoryStore::new();
        let acme = collection(&store, "Acme").await;
        let Ok(event) = store.create_event(acme.id, new_event("Meetup", "January", 5)).await else {
            panic!("event creation failed");
        };
        let Ok(badge) = store.issue_badge(event.id, new_badge("a1", "W1")).await else {
            panic!("issue failed");
        };

        assert!(store.burn_badge(badge.id).await.is_ok());
        let Ok(refreshed) = store.refresh_collection_totals(acme.id).await else {
            panic!("refresh failed");
        };
        assert_eq!(refreshed.total_poaps, 0);
        assert_eq!(refreshed.unique_holders, 0);
        assert!(matches!(
            store.transfer_badge(badge.id, "W2").await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.close_event(EventId::new()).await,
            Err(StoreError::NotFound { entity: "event", .. })
        ));
        assert!(matches!(
            store.refresh_collection_totals(CollectionId::new()).await,
            Err(StoreError::NotFound { entity: "collection", .. })
        ));
    }
}
