use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

pub mod moka_cache;

pub use moka_cache::FreshnessCache;

/// A cached value together with the moment it was fetched.
///
/// Entries are created on the first successful fetch for a key and replaced
/// wholesale on every refetch; they are never patched in place.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }

    /// Valid iff `now - fetched_at < window`.
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.age() < window
    }
}

/// Port for the time-windowed response cache.
#[async_trait]
pub trait CacheStore<K, V>: Send + Sync + 'static {
    /// The entry for `key`, whatever its age.
    async fn get(&self, key: &K) -> Option<CacheEntry<V>>;

    /// The value for `key` if it is younger than the default window.
    async fn get_fresh(&self, key: &K) -> Option<V>;

    /// The value for `key` if it is younger than `window`.
    async fn get_within(&self, key: &K, window: Duration) -> Option<V>;

    /// Store `value` stamped with the current time, replacing any prior entry.
    async fn set(&self, key: K, value: V) -> CacheEntry<V>;

    /// Drop the entry for `key`; returns whether one existed.
    async fn invalidate(&self, key: &K) -> bool;

    async fn clear(&self);

    async fn len(&self) -> u64;

    fn window(&self) -> Duration;
}
