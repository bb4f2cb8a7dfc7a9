//! PostgreSQL implementation of the catalog store.
//!
//! Queries are checked at runtime, not by the `sqlx` macros, so the crate
//! builds without a live database. The expected schema lives in
//! `migrations/0001_catalog.sql` and is applied out of band.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::{BadgeRow, CollectionRow, EventRow, HolderRow, HoldingRow};
use super::store::{CatalogStore, DataStore, NewBadge, NewCollection, NewEvent, StoreError};
use crate::domain::{
    Badge, BadgeId, BadgeRecord, Collection, CollectionId, CollectionRecord, Event, EventId,
    EventRecord, Holder, RankingsFilter, WalletHolding,
};

macro_rules! collection_columns {
    () => {
        "id, name, description, mint_authority, is_active, total_poaps, unique_holders, created_at"
    };
}

macro_rules! event_columns {
    () => {
        "id, collection_id, name, month, year, start_date, end_date, authority, is_active, \
         is_closed, max_supply"
    };
}

macro_rules! badge_columns {
    () => {
        "id, collection_id, event_id, name, description, image, asset_id, is_burned, is_frozen, \
         created_at"
    };
}

macro_rules! holder_columns {
    () => {
        "id, badge_id, wallet_address, acquired_at, transferred_at, transferred_to"
    };
}

/// `$1` = collection filter, `$2` = event filter.
macro_rules! collection_filter {
    () => {
        "WHERE is_active \
           AND ($1::uuid IS NULL OR id = $1) \
           AND ($2::uuid IS NULL OR EXISTS ( \
                 SELECT 1 FROM events e WHERE e.id = $2 AND e.collection_id = collections.id))"
    };
}

const RECOUNT_SQL: &str = concat!(
    "UPDATE collections SET \
       total_poaps = (SELECT COUNT(*) FROM badges b \
                      WHERE b.collection_id = $1 AND NOT b.is_burned), \
       unique_holders = (SELECT COUNT(DISTINCT h.wallet_address) FROM badge_holders h \
                         JOIN badges b ON b.id = h.badge_id \
                         WHERE b.collection_id = $1 AND NOT b.is_burned \
                           AND h.transferred_at IS NULL) \
     WHERE id = $1 RETURNING ",
    collection_columns!()
);

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn db_error_code(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// PostgreSQL-backed catalog store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool.begin().await.map_err(unavailable)
    }

    async fn recount(
        tx: &mut Transaction<'static, Postgres>,
        id: CollectionId,
    ) -> Result<Collection, StoreError> {
        let row = sqlx::query_as::<_, CollectionRow>(RECOUNT_SQL)
            .bind(Uuid::from(id))
            .fetch_optional(&mut **tx)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::not_found("collection", id))?;
        Collection::try_from(row)
    }

    async fn lock_badge(
        tx: &mut Transaction<'static, Postgres>,
        id: BadgeId,
    ) -> Result<Badge, StoreError> {
        sqlx::query_as::<_, BadgeRow>(concat!(
            "SELECT ",
            badge_columns!(),
            " FROM badges WHERE id = $1 FOR UPDATE"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&mut **tx)
        .await
        .map_err(unavailable)?
        .map(Badge::from)
        .ok_or_else(|| StoreError::not_found("badge", id))
    }

    async fn load_events(
        &self,
        collection_ids: &[Uuid],
        event_id: Option<Uuid>,
    ) -> Result<Vec<Event>, StoreError> {
        sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE collection_id = ANY($1) AND ($2::uuid IS NULL OR id = $2) \
             ORDER BY start_date DESC, id ASC"
        ))
        .bind(collection_ids)
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(Event::try_from)
        .collect()
    }

    async fn load_badges(&self, event_ids: &[Uuid]) -> Result<Vec<Badge>, StoreError> {
        Ok(sqlx::query_as::<_, BadgeRow>(concat!(
            "SELECT ",
            badge_columns!(),
            " FROM badges WHERE event_id = ANY($1) ORDER BY created_at ASC, id ASC"
        ))
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(Badge::from)
        .collect())
    }

    async fn load_holders(&self, badge_ids: &[Uuid]) -> Result<Vec<Holder>, StoreError> {
        Ok(sqlx::query_as::<_, HolderRow>(concat!(
            "SELECT ",
            holder_columns!(),
            " FROM badge_holders WHERE badge_id = ANY($1) ORDER BY acquired_at ASC, id ASC"
        ))
        .bind(badge_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(Holder::from)
        .collect())
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    async fn count_collections(&self, filter: &RankingsFilter) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(concat!(
            "SELECT COUNT(*) FROM collections ",
            collection_filter!()
        ))
        .bind(filter.collection_id.map(Uuid::from))
        .bind(filter.event_id.map(Uuid::from))
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        u64::try_from(count).map_err(|_| StoreError::Malformed(format!("negative count {count}")))
    }

    async fn fetch_collections(
        &self,
        filter: &RankingsFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CollectionRecord>, StoreError> {
        let collections: Vec<Collection> = sqlx::query_as::<_, CollectionRow>(concat!(
            "SELECT ",
            collection_columns!(),
            " FROM collections ",
            collection_filter!(),
            " ORDER BY (SELECT COUNT(*) FROM badges b \
                        JOIN badge_holders h ON h.badge_id = b.id AND h.transferred_at IS NULL \
                        WHERE b.collection_id = collections.id AND NOT b.is_burned \
                          AND ($2::uuid IS NULL OR b.event_id = $2)) DESC, \
                       id ASC \
              OFFSET $3 LIMIT $4"
        ))
        .bind(filter.collection_id.map(Uuid::from))
        .bind(filter.event_id.map(Uuid::from))
        .bind(to_i64(offset))
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(Collection::try_from)
        .collect::<Result<_, _>>()?;

        if collections.is_empty() {
            return Ok(Vec::new());
        }

        let collection_ids: Vec<Uuid> = collections.iter().map(|c| Uuid::from(c.id)).collect();
        let events = self
            .load_events(&collection_ids, filter.event_id.map(Uuid::from))
            .await?;
        let event_ids: Vec<Uuid> = events.iter().map(|e| Uuid::from(e.id)).collect();
        let badges = self.load_badges(&event_ids).await?;
        let badge_ids: Vec<Uuid> = badges.iter().map(|b| Uuid::from(b.id)).collect();
        let holders = self.load_holders(&badge_ids).await?;

        let mut holders_by_badge: HashMap<BadgeId, Vec<Holder>> = HashMap::new();
        for holder in holders {
            holders_by_badge.entry(holder.badge_id).or_default().push(holder);
        }

        let mut badges_by_event: HashMap<EventId, Vec<BadgeRecord>> = HashMap::new();
        for badge in badges {
            let holders = holders_by_badge.remove(&badge.id).unwrap_or_default();
            badges_by_event
                .entry(badge.event_id)
                .or_default()
                .push(BadgeRecord { badge, holders });
        }

        let mut events_by_collection: HashMap<CollectionId, Vec<EventRecord>> = HashMap::new();
        for event in events {
            let badges = badges_by_event.remove(&event.id).unwrap_or_default();
            events_by_collection
                .entry(event.collection_id)
                .or_default()
                .push(EventRecord { event, badges });
        }

        Ok(collections
            .into_iter()
            .map(|collection| CollectionRecord {
                events: events_by_collection
                    .remove(&collection.id)
                    .unwrap_or_default(),
                collection,
            })
            .collect())
    }

    async fn top_wallets(&self, limit: u32) -> Result<Vec<(String, u64)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT h.wallet_address, COUNT(*) AS held \
             FROM badge_holders h \
             JOIN badges b ON b.id = h.badge_id \
             JOIN collections c ON c.id = b.collection_id \
             WHERE h.transferred_at IS NULL AND NOT b.is_burned AND c.is_active \
             GROUP BY h.wallet_address \
             ORDER BY held DESC, h.wallet_address ASC \
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter()
            .map(|(wallet, held)| {
                u64::try_from(held)
                    .map(|held| (wallet, held))
                    .map_err(|_| StoreError::Malformed(format!("negative count {held}")))
            })
            .collect()
    }

    async fn wallet_holdings(&self, wallet: &str) -> Result<Vec<WalletHolding>, StoreError> {
        Ok(sqlx::query_as::<_, HoldingRow>(
            "SELECT c.id AS collection_id, c.name AS collection_name, \
                    e.id AS event_id, e.name AS event_name, \
                    b.id AS badge_id, b.name AS badge_name, b.image, b.created_at AS minted_at \
             FROM badge_holders h \
             JOIN badges b ON b.id = h.badge_id \
             JOIN events e ON e.id = b.event_id \
             JOIN collections c ON c.id = b.collection_id \
             WHERE h.wallet_address = $1 AND h.transferred_at IS NULL \
               AND NOT b.is_burned AND c.is_active \
             ORDER BY b.created_at ASC, b.id ASC",
        )
        .bind(wallet)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .into_iter()
        .map(WalletHolding::from)
        .collect())
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn create_collection(&self, input: NewCollection) -> Result<Collection, StoreError> {
        let row = sqlx::query_as::<_, CollectionRow>(concat!(
            "INSERT INTO collections (id, name, description, mint_authority, is_active, \
                                      total_poaps, unique_holders) \
             VALUES ($1, $2, $3, $4, TRUE, 0, 0) RETURNING ",
            collection_columns!()
        ))
        .bind(Uuid::from(CollectionId::new()))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.mint_authority)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_error_code(&e).as_deref() {
            Some(UNIQUE_VIOLATION) => StoreError::Conflict(format!(
                "mint authority {} already registered",
                input.mint_authority.as_deref().unwrap_or_default()
            )),
            _ => unavailable(e),
        })?;
        Collection::try_from(row)
    }

    async fn set_collection_active(
        &self,
        id: CollectionId,
        active: bool,
    ) -> Result<Collection, StoreError> {
        let row = sqlx::query_as::<_, CollectionRow>(concat!(
            "UPDATE collections SET is_active = $2 WHERE id = $1 RETURNING ",
            collection_columns!()
        ))
        .bind(Uuid::from(id))
        .bind(active)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| StoreError::not_found("collection", id))?;
        Collection::try_from(row)
    }

    async fn create_event(
        &self,
        collection_id: CollectionId,
        input: NewEvent,
    ) -> Result<Event, StoreError> {
        let max_supply = input
            .max_supply
            .map(|v| i32::try_from(v).unwrap_or(i32::MAX));
        let row = sqlx::query_as::<_, EventRow>(concat!(
            "INSERT INTO events (id, collection_id, name, month, year, start_date, end_date, \
                                 authority, is_active, is_closed, max_supply) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, FALSE, $9) RETURNING ",
            event_columns!()
        ))
        .bind(Uuid::from(EventId::new()))
        .bind(Uuid::from(collection_id))
        .bind(&input.name)
        .bind(&input.month)
        .bind(input.year)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.authority)
        .bind(max_supply)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_error_code(&e).as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => StoreError::not_found("collection", collection_id),
            _ => unavailable(e),
        })?;
        Event::try_from(row)
    }

    async fn close_event(&self, id: EventId) -> Result<Event, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            "UPDATE events SET is_closed = TRUE WHERE id = $1 RETURNING ",
            event_columns!()
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| StoreError::not_found("event", id))?;
        Event::try_from(row)
    }

    async fn issue_badge(&self, event_id: EventId, input: NewBadge) -> Result<Badge, StoreError> {
        let mut tx = self.begin().await?;

        let event = sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(Uuid::from(event_id))
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| StoreError::not_found("event", event_id))
        .and_then(Event::try_from)?;

        if event.is_closed {
            return Err(StoreError::Conflict(format!("event {event_id} is closed")));
        }
        if let Some(max_supply) = event.max_supply {
            let issued =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM badges WHERE event_id = $1")
                    .bind(Uuid::from(event_id))
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(unavailable)?;
            if issued >= i64::from(max_supply) {
                return Err(StoreError::Conflict(format!(
                    "event {event_id} reached its supply of {max_supply}"
                )));
            }
        }

        let badge_id = BadgeId::new();
        let badge = sqlx::query_as::<_, BadgeRow>(concat!(
            "INSERT INTO badges (id, collection_id, event_id, name, description, image, asset_id, \
                                 is_burned, is_frozen, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, FALSE, now()) RETURNING ",
            badge_columns!()
        ))
        .bind(Uuid::from(badge_id))
        .bind(Uuid::from(event.collection_id))
        .bind(Uuid::from(event_id))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.image)
        .bind(&input.asset_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match db_error_code(&e).as_deref() {
            Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(format!("asset {} already recorded", input.asset_id))
            }
            _ => unavailable(e),
        })?;

        sqlx::query(
            "INSERT INTO badge_holders (id, badge_id, wallet_address, acquired_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::from(badge_id))
        .bind(&input.wallet_address)
        .bind(badge.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        Self::recount(&mut tx, event.collection_id).await?;
        tx.commit().await.map_err(unavailable)?;
        Ok(Badge::from(badge))
    }

    async fn transfer_badge(&self, id: BadgeId, to_wallet: &str) -> Result<Badge, StoreError> {
        let mut tx = self.begin().await?;
        let badge = Self::lock_badge(&mut tx, id).await?;
        if badge.is_burned {
            return Err(StoreError::Conflict(format!("badge {id} is burned")));
        }
        if badge.is_frozen {
            return Err(StoreError::Conflict(format!("badge {id} is frozen")));
        }

        let current = sqlx::query_as::<_, HolderRow>(concat!(
            "SELECT ",
            holder_columns!(),
            " FROM badge_holders WHERE badge_id = $1 AND transferred_at IS NULL FOR UPDATE"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| StoreError::Malformed(format!("badge {id} has no current holder")))?;
        if current.wallet_address == to_wallet {
            return Err(StoreError::Conflict(format!(
                "badge {id} is already held by {to_wallet}"
            )));
        }

        sqlx::query(
            "UPDATE badge_holders SET transferred_at = now(), transferred_to = $2 WHERE id = $1",
        )
        .bind(current.id)
        .bind(to_wallet)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            "INSERT INTO badge_holders (id, badge_id, wallet_address, acquired_at) \
             VALUES ($1, $2, $3, now())",
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::from(id))
        .bind(to_wallet)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        Self::recount(&mut tx, badge.collection_id).await?;
        tx.commit().await.map_err(unavailable)?;
        Ok(badge)
    }

    async fn burn_badge(&self, id: BadgeId) -> Result<Badge, StoreError> {
        let mut tx = self.begin().await?;
        let badge = Self::lock_badge(&mut tx, id).await?;
        if badge.is_burned {
            return Err(StoreError::Conflict(format!("badge {id} is already burned")));
        }

        sqlx::query("UPDATE badges SET is_burned = TRUE WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        sqlx::query(
            "UPDATE badge_holders SET transferred_at = now() \
             WHERE badge_id = $1 AND transferred_at IS NULL",
        )
        .bind(Uuid::from(id))
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        Self::recount(&mut tx, badge.collection_id).await?;
        tx.commit().await.map_err(unavailable)?;
        Ok(Badge {
            is_burned: true,
            ..badge
        })
    }

    async fn refresh_collection_totals(&self, id: CollectionId) -> Result<Collection, StoreError> {
        let mut tx = self.begin().await?;
        let collection = Self::recount(&mut tx, id).await?;
        tx.commit().await.map_err(unavailable)?;
        Ok(collection)
    }
}
