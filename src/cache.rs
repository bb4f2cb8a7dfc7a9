//! Process-wide read-through cache with per-entry expiration.
//!
//! [`Cache`] is a `RwLock<HashMap>` of opaque values, each with an optional
//! absolute expiry instant. Expiry is lazy: an entry past its deadline is
//! removed the next time it is read, there is no background sweep.
//!
//! Callers never use [`Cache`] keys directly. They obtain a [`ScopedCache`]
//! through [`Cache::scoped`], which prefixes every key with a namespace and
//! can flush that namespace as a whole.
//!
//! [`ScopedCache::get_or_set`] does not deduplicate concurrent computations:
//! two callers missing the same key both run `compute` and both write. The
//! cached values are recomputable, so a cold-cache stampede is tolerated.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

type CacheValue = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct CacheEntry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Shared in-memory key/value store.
///
/// Created once by the application bootstrap and shared as `Arc<Cache>`.
/// Nothing is persisted: a restarted process starts empty.
#[derive(Debug, Default)]
pub struct Cache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Cache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle scoped to the `prefix` namespace.
    #[must_use]
    pub fn scoped(self: &Arc<Self>, prefix: impl Into<String>) -> ScopedCache {
        ScopedCache {
            prefix: prefix.into(),
            store: Arc::clone(self),
        }
    }

    /// Number of stored entries, expired-but-unread ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns `true` if `full_key` is physically stored, without checking
    /// or applying expiry.
    pub async fn contains_raw(&self, full_key: &str) -> bool {
        self.entries.read().await.contains_key(full_key)
    }

    async fn get_raw(&self, full_key: &str) -> Option<CacheValue> {
        let now = Instant::now();
        {
            let map = self.entries.read().await;
            match map.get(full_key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(Arc::clone(&entry.value)),
                Some(_) => {}
            }
        }

        // Expired: evict, unless a writer replaced it in between.
        let mut map = self.entries.write().await;
        match map.get(full_key) {
            Some(entry) if entry.is_expired(now) => {
                map.remove(full_key);
                None
            }
            Some(entry) => Some(Arc::clone(&entry.value)),
            None => None,
        }
    }

    async fn set_raw(&self, full_key: String, value: CacheValue, ttl: Option<Duration>) {
        // A TTL too large to represent never expires.
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries
            .write()
            .await
            .insert(full_key, CacheEntry { value, expires_at });
    }

    async fn delete_raw(&self, full_key: &str) {
        self.entries.write().await.remove(full_key);
    }

    async fn remove_prefix(&self, prefix: &str) -> usize {
        let mut map = self.entries.write().await;
        let before = map.len();
        map.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(map.len())
    }
}

/// Namespaced view over a shared [`Cache`].
///
/// Values are stored type-erased and handed back as `Arc<T>`; reading a
/// key with a different type than it was written with is treated as a miss.
#[derive(Debug, Clone)]
pub struct ScopedCache {
    prefix: String,
    store: Arc<Cache>,
}

impl ScopedCache {
    /// The namespace prefix, e.g. `"rankings:"`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The underlying shared cache.
    #[must_use]
    pub fn store(&self) -> &Arc<Cache> {
        &self.store
    }

    /// Full storage key for `key` in this namespace.
    #[must_use]
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Returns the cached value for `key` if present and unexpired.
    ///
    /// An expired entry is removed as a side effect.
    pub async fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let full_key = self.full_key(key);
        let value = self.store.get_raw(&full_key).await?;
        match value.downcast::<T>() {
            Ok(typed) => Some(typed),
            Err(_) => {
                tracing::warn!(key = %full_key, "cache entry has unexpected type; ignoring");
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// With `ttl = None` the entry lives until deleted or the process exits.
    pub async fn set<T>(&self, key: &str, value: T, ttl: Option<Duration>) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let value = Arc::new(value);
        self.set_arc(key, Arc::clone(&value), ttl).await;
        value
    }

    async fn set_arc<T>(&self, key: &str, value: Arc<T>, ttl: Option<Duration>)
    where
        T: Send + Sync + 'static,
    {
        self.store.set_raw(self.full_key(key), value, ttl).await;
    }

    /// Removes `key`. Missing keys are ignored.
    pub async fn delete(&self, key: &str) {
        self.store.delete_raw(&self.full_key(key)).await;
    }

    /// Returns the cached value or computes, stores and returns a fresh one.
    ///
    /// A failing `compute` stores nothing.
    ///
    /// # Errors
    ///
    /// Returns whatever error `compute` produced.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            tracing::debug!(prefix = %self.prefix, key, "cache hit");
            return Ok(hit);
        }

        tracing::debug!(prefix = %self.prefix, key, "cache miss");
        let fresh = compute().await?;
        Ok(self.set(key, fresh, ttl).await)
    }

    /// Removes every entry in this namespace, returning how many were dropped.
    pub async fn clear(&self) -> usize {
        self.store.remove_prefix(&self.prefix).await
    }
}
