use crate::{CacheEntry, CacheStore};
use async_trait::async_trait;
use moka::future::Cache;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

/// Moka-backed cache with a fixed freshness window.
///
/// The underlying cache is unbounded and has no TTL: entries are only replaced
/// on refetch or dropped on `invalidate`, so a stale entry stays readable via
/// [`CacheStore::get`]. Moka is internally synchronised, so a single instance
/// can be shared by every store in the process.
pub struct FreshnessCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    cache: Cache<K, CacheEntry<V>>,
    window: Duration,
}

impl<K, V> FreshnessCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    pub fn new(name: &str, window: Duration) -> Self {
        Self {
            cache: Cache::builder().name(name).build(),
            window,
        }
    }
}

#[async_trait]
impl<K, V> CacheStore<K, V> for FreshnessCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    async fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.cache.get(key).await
    }

    async fn get_fresh(&self, key: &K) -> Option<V> {
        self.get_within(key, self.window).await
    }

    async fn get_within(&self, key: &K, window: Duration) -> Option<V> {
        match self.cache.get(key).await {
            Some(entry) if entry.is_fresh(window) => {
                tracing::trace!("cache hit for {:?} (age {:?})", key, entry.age());
                Some(entry.value)
            }
            Some(entry) => {
                tracing::debug!("cache entry for {:?} is stale (age {:?})", key, entry.age());
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: K, value: V) -> CacheEntry<V> {
        let entry = CacheEntry::new(value);
        self.cache.insert(key, entry.clone()).await;
        entry
    }

    async fn invalidate(&self, key: &K) -> bool {
        self.cache.remove(key).await.is_some()
    }

    async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    fn window(&self) -> Duration {
        self.window
    }
}

impl<K, V> Debug for FreshnessCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshnessCache")
            .field("entry_count", &self.cache.entry_count())
            .field("window", &self.window)
            .finish()
    }
}
