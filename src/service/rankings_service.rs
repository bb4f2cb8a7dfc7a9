//! Rankings engine and its cached front.
//!
//! [`RankingsEngine`] computes pages straight from the data store.
//! [`RankingsService`] is what handlers talk to: every read goes through the
//! `rankings:` cache namespace and [`RankingsService::invalidate`] drops the
//! whole namespace after a catalog write.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, ScopedCache};
use crate::domain::{
    GlobalCollector, Pagination, RankingsPage, RankingsQuery, WalletCollectionHoldings,
    is_wallet_address,
};
use crate::error::ServiceError;
use crate::persistence::{DataStore, StoreError};

use super::aggregation::{group_wallet_holdings, rank_wallets, summarize_collection};

/// Collections per rankings page.
pub const PAGE_SIZE: u32 = 20;

/// Largest accepted global leaderboard size, also the default.
pub const GLOBAL_LIMIT_MAX: u32 = 100;

/// Cache namespace of every rankings view.
pub const CACHE_PREFIX: &str = "rankings:";

/// Clamps a requested leaderboard size into `1..=GLOBAL_LIMIT_MAX`.
#[must_use]
pub fn clamp_global_limit(limit: Option<i64>) -> u32 {
    limit.map_or(GLOBAL_LIMIT_MAX, |l| {
        u32::try_from(l.clamp(1, i64::from(GLOBAL_LIMIT_MAX))).unwrap_or(GLOBAL_LIMIT_MAX)
    })
}

fn store_failure(operation: &'static str, err: StoreError) -> ServiceError {
    tracing::error!(operation, error = %err, "data store read failed");
    ServiceError::from(err)
}

/// Uncached rankings computation over a [`DataStore`].
#[derive(Debug, Clone)]
pub struct RankingsEngine {
    store: Arc<dyn DataStore>,
}

impl RankingsEngine {
    /// Creates an engine reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Computes one page of collection rankings.
    ///
    /// A collection that fails to aggregate is left out of `groups` and
    /// logged; it still counts toward the page totals.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::DataUnavailable`] if the store fails and
    /// [`ServiceError::Computation`] if the page count overflows.
    pub async fn compute_rankings(
        &self,
        query: &RankingsQuery,
    ) -> Result<RankingsPage, ServiceError> {
        let page = query.page();
        let filter = &query.filter;

        let total = self
            .store
            .count_collections(filter)
            .await
            .map_err(|e| store_failure("count_collections", e))?;

        let page_size = u64::from(PAGE_SIZE);
        let offset = u64::from(page - 1) * page_size;
        let records = if offset < total {
            self.store
                .fetch_collections(filter, offset, page_size)
                .await
                .map_err(|e| store_failure("fetch_collections", e))?
        } else {
            Vec::new()
        };

        let mut groups = Vec::with_capacity(records.len());
        for record in &records {
            match summarize_collection(record) {
                Ok(summary) => groups.push(summary),
                Err(err) => tracing::warn!(
                    collection_id = %record.collection.id,
                    error = %err,
                    "skipping collection that failed to aggregate"
                ),
            }
        }

        let total_pages = u32::try_from(total.div_ceil(page_size)).map_err(|_| {
            ServiceError::Computation(format!("{total} collections exceed the page range"))
        })?;

        tracing::debug!(page, total, groups = groups.len(), "computed rankings page");
        Ok(RankingsPage {
            groups,
            pagination: Pagination {
                current_page: page,
                total_pages,
                has_more: u64::from(page) * page_size < total,
            },
        })
    }

    /// Computes the cross-collection leaderboard.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::DataUnavailable`] if the store fails.
    pub async fn compute_global(&self, limit: u32) -> Result<Vec<GlobalCollector>, ServiceError> {
        let wallets = self
            .store
            .top_wallets(limit)
            .await
            .map_err(|e| store_failure("top_wallets", e))?;
        Ok(rank_wallets(wallets))
    }

    /// Computes a wallet's holdings grouped by collection.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::DataUnavailable`] if the store fails.
    pub async fn compute_wallet(
        &self,
        wallet: &str,
    ) -> Result<Vec<WalletCollectionHoldings>, ServiceError> {
        let holdings = self
            .store
            .wallet_holdings(wallet)
            .await
            .map_err(|e| store_failure("wallet_holdings", e))?;
        Ok(group_wallet_holdings(holdings))
    }
}

/// Read-through cached access to every rankings view.
#[derive(Debug, Clone)]
pub struct RankingsService {
    engine: RankingsEngine,
    cache: ScopedCache,
    ttl: Duration,
}

impl RankingsService {
    /// Creates the service, claiming the [`CACHE_PREFIX`] namespace of `cache`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>, cache: &Arc<Cache>, ttl: Duration) -> Self {
        Self {
            engine: RankingsEngine::new(store),
            cache: cache.scoped(CACHE_PREFIX),
            ttl,
        }
    }

    /// Returns a rankings page, computing it on a cache miss.
    ///
    /// # Errors
    ///
    /// Propagates engine errors; nothing is cached on failure.
    pub async fn rankings(&self, query: RankingsQuery) -> Result<Arc<RankingsPage>, ServiceError> {
        self.cache
            .get_or_set(&query.cache_key(), Some(self.ttl), || {
                self.engine.compute_rankings(&query)
            })
            .await
    }

    /// Returns the global leaderboard, `limit` clamped to `1..=100`.
    ///
    /// # Errors
    ///
    /// Propagates engine errors; nothing is cached on failure.
    pub async fn global_top_collectors(
        &self,
        limit: Option<i64>,
    ) -> Result<Arc<Vec<GlobalCollector>>, ServiceError> {
        let limit = clamp_global_limit(limit);
        self.cache
            .get_or_set(&format!("global:top-collectors:{limit}"), Some(self.ttl), || {
                self.engine.compute_global(limit)
            })
            .await
    }

    /// Returns `wallet`'s holdings per collection.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] if `wallet` is not a base58
    /// address, otherwise propagates engine errors.
    pub async fn wallet_rankings(
        &self,
        wallet: &str,
    ) -> Result<Arc<Vec<WalletCollectionHoldings>>, ServiceError> {
        if !is_wallet_address(wallet) {
            return Err(ServiceError::InvalidInput(format!(
                "{wallet} is not a valid wallet address"
            )));
        }
        self.cache
            .get_or_set(&format!("wallet:{wallet}"), Some(self.ttl), || {
                self.engine.compute_wallet(wallet)
            })
            .await
    }

    /// Drops every cached rankings view, returning how many were removed.
    pub async fn invalidate(&self) -> usize {
        let dropped = self.cache.clear().await;
        tracing::debug!(dropped, "invalidated rankings cache");
        dropped
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{CollectionId, CollectionRecord, EventId, RankingsFilter, WalletHolding};
    use crate::persistence::{CatalogStore, InMemoryStore, NewBadge, NewCollection, NewEvent};
    use crate::service::aggregation;

    pub(crate) const W1: &str = "5b4ZfyhVEuHEiUWzoWPrQqvhWD3WLyktPpQm2xs2CnyJ";
    pub(crate) const W2: &str = "BKn45YvZfgQM6AQ3te4maGkFSMTVZibKyCxxqh6AWcUL";

    pub(crate) fn new_event(name: &str, month: &str, month_no: u32) -> NewEvent {
        let Some(start) = Utc.with_ymd_and_hms(2024, month_no, 10, 18, 0, 0).single() else {
            panic!("valid timestamp");
        };
        NewEvent {
            name: name.to_string(),
            month: month.to_string(),
            year: 2024,
            start_date: start,
            end_date: start,
            authority: "authority".to_string(),
            max_supply: None,
        }
    }

    pub(crate) fn new_badge(name: &str, wallet: &str) -> NewBadge {
        NewBadge {
            name: name.to_string(),
            description: None,
            image: "ipfs://badge".to_string(),
            asset_id: uuid::Uuid::new_v4().to_string(),
            wallet_address: wallet.to_string(),
        }
    }

    /// Creates "Acme" with a January event (W1) and a February event (W1, W2).
    pub(crate) async fn seed_acme(store: &dyn CatalogStore) -> (CollectionId, EventId, EventId) {
        let Ok(acme) = store
            .create_collection(NewCollection {
                name: "Acme".to_string(),
                description: None,
                mint_authority: None,
            })
            .await
        else {
            panic!("create collection");
        };
        let (Ok(jan), Ok(feb)) = (
            store
                .create_event(acme.id, new_event("Jan Meetup", "January", 1))
                .await,
            store
                .create_event(acme.id, new_event("Feb Meetup", "February", 2))
                .await,
        ) else {
            panic!("create events");
        };
        for (event, wallet) in [(jan.id, W1), (feb.id, W1), (feb.id, W2)] {
            let Ok(_) = store.issue_badge(event, new_badge("Badge", wallet)).await else {
                panic!("issue badge");
            };
        }
        (acme.id, jan.id, feb.id)
    }

    async fn empty_collections(store: &InMemoryStore, n: usize) {
        for i in 0..n {
            let Ok(_) = store
                .create_collection(NewCollection {
                    name: format!("Collection {i}"),
                    description: None,
                    mint_authority: None,
                })
                .await
            else {
                panic!("create collection");
            };
        }
    }

    /// Counts how often the store is asked for collections.
    #[derive(Debug, Default)]
    pub(crate) struct CountingStore {
        pub(crate) inner: InMemoryStore,
        pub(crate) fetches: AtomicUsize,
    }

    #[async_trait]
    impl DataStore for CountingStore {
        async fn count_collections(&self, filter: &RankingsFilter) -> Result<u64, StoreError> {
            self.inner.count_collections(filter).await
        }

        async fn fetch_collections(
            &self,
            filter: &RankingsFilter,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<CollectionRecord>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_collections(filter, offset, limit).await
        }

        async fn top_wallets(&self, limit: u32) -> Result<Vec<(String, u64)>, StoreError> {
            self.inner.top_wallets(limit).await
        }

        async fn wallet_holdings(&self, wallet: &str) -> Result<Vec<WalletHolding>, StoreError> {
            self.inner.wallet_holdings(wallet).await
        }
    }

    /// Always unreachable.
    #[derive(Debug, Default)]
    pub(crate) struct DownStore {
        pub(crate) calls: AtomicUsize,
    }

    impl DownStore {
        fn fail<T>(&self) -> Result<T, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl DataStore for DownStore {
        async fn count_collections(&self, _: &RankingsFilter) -> Result<u64, StoreError> {
            self.fail()
        }

        async fn fetch_collections(
            &self,
            _: &RankingsFilter,
            _: u64,
            _: u64,
        ) -> Result<Vec<CollectionRecord>, StoreError> {
            self.fail()
        }

        async fn top_wallets(&self, _: u32) -> Result<Vec<(String, u64)>, StoreError> {
            self.fail()
        }

        async fn wallet_holdings(&self, _: &str) -> Result<Vec<WalletHolding>, StoreError> {
            self.fail()
        }
    }

    /// Serves a fixed list of records regardless of filter.
    #[derive(Debug)]
    struct FixedStore {
        records: Vec<CollectionRecord>,
    }

    #[async_trait]
    impl DataStore for FixedStore {
        async fn count_collections(&self, _: &RankingsFilter) -> Result<u64, StoreError> {
            Ok(self.records.len() as u64)
        }

        async fn fetch_collections(
            &self,
            _: &RankingsFilter,
            _: u64,
            _: u64,
        ) -> Result<Vec<CollectionRecord>, StoreError> {
            Ok(self.records.clone())
        }

        async fn top_wallets(&self, _: u32) -> Result<Vec<(String, u64)>, StoreError> {
            Ok(Vec::new())
        }

        async fn wallet_holdings(&self, _: &str) -> Result<Vec<WalletHolding>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn service(store: Arc<dyn DataStore>) -> RankingsService {
        RankingsService::new(store, &Arc::new(Cache::new()), Duration::from_secs(300))
    }

    async fn page(engine: &RankingsEngine, n: i64) -> RankingsPage {
        let Ok(page) = engine
            .compute_rankings(&RankingsQuery::new(n, RankingsFilter::default()))
            .await
        else {
            panic!("rankings failed");
        };
        page
    }

    #[tokio::test]
    async fn acme_through_the_store() {
        let store = Arc::new(InMemoryStore::new());
        seed_acme(store.as_ref()).await;
        let engine = RankingsEngine::new(store);

        let result = page(&engine, 1).await;
        assert_eq!(result.groups.len(), 1);
        let acme = &result.groups[0];
        assert_eq!(acme.total_poaps, 3);
        assert_eq!(acme.unique_events, 2);
        assert_eq!(acme.most_active_month, "February 2024");
        assert_eq!(acme.top_collectors[0].wallet, W1);
        assert_eq!(acme.top_collectors[0].count, 2);
        assert_eq!(acme.top_collectors[1].wallet, W2);
        assert_eq!(result.pagination.current_page, 1);
        assert_eq!(result.pagination.total_pages, 1);
        assert!(!result.pagination.has_more);
    }

    #[tokio::test]
    async fn empty_store_has_no_pages() {
        let engine = RankingsEngine::new(Arc::new(InMemoryStore::new()));
        let result = page(&engine, 1).await;
        assert!(result.groups.is_empty());
        assert_eq!(result.pagination.total_pages, 0);
        assert!(!result.pagination.has_more);
    }

    #[tokio::test]
    async fn pagination_boundaries() {
        let store = Arc::new(InMemoryStore::new());
        empty_collections(&store, 21).await;
        let engine = RankingsEngine::new(store);

        let first = page(&engine, 1).await;
        assert_eq!(first.groups.len(), 20);
        assert_eq!(first.pagination.total_pages, 2);
        assert!(first.pagination.has_more);

        let second = page(&engine, 2).await;
        assert_eq!(second.groups.len(), 1);
        assert!(!second.pagination.has_more);

        let beyond = page(&engine, 3).await;
        assert!(beyond.groups.is_empty());
        assert!(!beyond.pagination.has_more);
        assert_eq!(beyond.pagination.current_page, 3);
    }

    #[tokio::test]
    async fn page_zero_reads_as_page_one() {
        let store = Arc::new(InMemoryStore::new());
        seed_acme(store.as_ref()).await;
        let engine = RankingsEngine::new(store);

        assert_eq!(page(&engine, 0).await, page(&engine, 1).await);
    }

    #[tokio::test]
    async fn busiest_collection_comes_first() {
        let store = Arc::new(InMemoryStore::new());
        empty_collections(&store, 3).await;
        let (acme, _, _) = seed_acme(store.as_ref()).await;
        let engine = RankingsEngine::new(store);

        let result = page(&engine, 1).await;
        assert_eq!(result.groups.len(), 4);
        assert_eq!(result.groups[0].id, acme);
    }

    #[tokio::test]
    async fn event_filter_narrows_to_one_event() {
        let store = Arc::new(InMemoryStore::new());
        empty_collections(&store, 2).await;
        let (acme, jan, _) = seed_acme(store.as_ref()).await;
        let engine = RankingsEngine::new(store);

        let query = RankingsQuery::new(
            1,
            RankingsFilter {
                collection_id: None,
                event_id: Some(jan),
            },
        );
        let Ok(result) = engine.compute_rankings(&query).await else {
            panic!("rankings failed");
        };
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].id, acme);
        assert_eq!(result.groups[0].total_poaps, 1);
        assert_eq!(result.groups[0].unique_events, 1);
        assert_eq!(result.groups[0].most_active_month, "January 2024");
    }

    #[tokio::test]
    async fn unknown_collection_filter_is_empty() {
        let store = Arc::new(InMemoryStore::new());
        seed_acme(store.as_ref()).await;
        let engine = RankingsEngine::new(store);

        let query = RankingsQuery::new(
            1,
            RankingsFilter {
                collection_id: Some(CollectionId::new()),
                event_id: None,
            },
        );
        let Ok(result) = engine.compute_rankings(&query).await else {
            panic!("rankings failed");
        };
        assert!(result.groups.is_empty());
        assert_eq!(result.pagination.total_pages, 0);
    }

    #[tokio::test]
    async fn broken_collection_is_skipped() {
        let good = aggregation::tests::acme();
        let mut bad = aggregation::tests::acme();
        bad.events[0].badges[0].badge.collection_id = CollectionId::new();
        let engine = RankingsEngine::new(Arc::new(FixedStore {
            records: vec![bad, good.clone()],
        }));

        let result = page(&engine, 1).await;
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].id, good.collection.id);
        assert_eq!(result.pagination.total_pages, 1);
    }

    #[tokio::test]
    async fn store_failure_is_data_unavailable_and_not_cached() {
        let store = Arc::new(DownStore::default());
        let svc = service(Arc::clone(&store) as Arc<dyn DataStore>);

        for _ in 0..2 {
            let result = svc.rankings(RankingsQuery::default()).await;
            assert!(matches!(result, Err(ServiceError::DataUnavailable(_))));
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn repeated_reads_hit_the_cache() {
        let store = Arc::new(CountingStore::default());
        seed_acme(&store.inner).await;
        let svc = service(Arc::clone(&store) as Arc<dyn DataStore>);

        let (Ok(first), Ok(second)) = (
            svc.rankings(RankingsQuery::default()).await,
            svc.rankings(RankingsQuery::default()).await,
        ) else {
            panic!("rankings failed");
        };
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

        let Ok(_) = svc.rankings(RankingsQuery::new(2, RankingsFilter::default())).await else {
            panic!("rankings failed");
        };
        let Ok(_) = svc
            .rankings(RankingsQuery::new(1, RankingsFilter::default()))
            .await
        else {
            panic!("rankings failed");
        };
        // Page two is past the end and never reaches fetch.
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let store = Arc::new(CountingStore::default());
        seed_acme(&store.inner).await;
        let svc = service(Arc::clone(&store) as Arc<dyn DataStore>);

        let Ok(_) = svc.rankings(RankingsQuery::default()).await else {
            panic!("rankings failed");
        };
        assert_eq!(svc.invalidate().await, 1);
        let Ok(_) = svc.rankings(RankingsQuery::default()).await else {
            panic!("rankings failed");
        };
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = Arc::new(CountingStore::default());
        seed_acme(&store.inner).await;
        let svc = RankingsService::new(
            Arc::clone(&store) as Arc<dyn DataStore>,
            &Arc::new(Cache::new()),
            Duration::from_secs(1),
        );

        let Ok(_) = svc.rankings(RankingsQuery::default()).await else {
            panic!("rankings failed");
        };
        tokio::time::advance(Duration::from_secs(2)).await;
        let Ok(_) = svc.rankings(RankingsQuery::default()).await else {
            panic!("rankings failed");
        };
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn global_leaderboard() {
        let store = Arc::new(InMemoryStore::new());
        seed_acme(store.as_ref()).await;
        let svc = service(store);

        let Ok(board) = svc.global_top_collectors(None).await else {
            panic!("global failed");
        };
        let rows: Vec<(u32, &str, u64)> = board
            .iter()
            .map(|c| (c.rank, c.wallet.as_str(), c.count))
            .collect();
        assert_eq!(rows, vec![(1, W1, 2), (2, W2, 1)]);

        let Ok(top_one) = svc.global_top_collectors(Some(1)).await else {
            panic!("global failed");
        };
        assert_eq!(top_one.len(), 1);
    }

    #[test]
    fn global_limit_is_clamped() {
        assert_eq!(clamp_global_limit(None), 100);
        assert_eq!(clamp_global_limit(Some(0)), 1);
        assert_eq!(clamp_global_limit(Some(-5)), 1);
        assert_eq!(clamp_global_limit(Some(25)), 25);
        assert_eq!(clamp_global_limit(Some(1_000)), 100);
    }

    #[tokio::test]
    async fn wallet_rankings_group_holdings() {
        let store = Arc::new(InMemoryStore::new());
        let (acme, _, _) = seed_acme(store.as_ref()).await;
        let svc = service(store);

        let Ok(holdings) = svc.wallet_rankings(W1).await else {
            panic!("wallet rankings failed");
        };
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].collection_id, acme);
        assert_eq!(holdings[0].total_poaps, 2);
        assert_eq!(holdings[0].unique_events, 2);
    }

    #[tokio::test]
    async fn malformed_wallet_is_rejected() {
        let svc = service(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            svc.wallet_rankings("not-a-wallet").await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
