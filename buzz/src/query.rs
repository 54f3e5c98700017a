use crate::cache_keys::{CacheKey, SharedCache};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Cached-fetch primitive shared by every resource store.
///
/// A fresh cache entry short-circuits the loader; otherwise the loader runs and
/// its successful result replaces the entry. Failures are never cached.
#[derive(Clone)]
pub struct QueryClient {
    cache: SharedCache,
}

impl QueryClient {
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn window(&self) -> Duration {
        self.cache.window()
    }

    /// Fresh cached value for `key`, decoded as `T`.
    pub async fn cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.cached_within(key, self.cache.window()).await
    }

    /// Cached value for `key` if it is younger than `window`.
    pub async fn cached_within<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        window: Duration,
    ) -> Option<T> {
        let value = self.cache.get_within(key, window).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                // Treat an undecodable entry as a miss so the loader replaces it
                warn!("Discarding cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn fetch<T, F, Fut>(&self, key: CacheKey, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.fetch_if(key, loader, || true).await
    }

    /// Like [`fetch`](Self::fetch), but the loaded value is only stored when
    /// `should_store` still holds once the loader finishes.
    pub async fn fetch_if<T, F, Fut, S>(&self, key: CacheKey, loader: F, should_store: S) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        S: FnOnce() -> bool,
    {
        if let Some(hit) = self.cached(&key).await {
            trace!("Serving {} from cache", key);
            return Ok(hit);
        }

        debug!("Cache miss for {}, loading", key);
        let value = loader().await?;

        if should_store() {
            self.store(key, &value).await?;
        } else {
            debug!("Not caching superseded result for {}", key);
        }
        Ok(value)
    }

    /// Drop the cached entry and load again.
    pub async fn refetch<T, F, Fut>(&self, key: CacheKey, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cache.invalidate(&key).await;
        self.fetch(key, loader).await
    }

    pub async fn store<T: Serialize>(&self, key: CacheKey, value: &T) -> Result<()> {
        let json = encode(&key, value)?;
        self.cache.set(key, json).await;
        Ok(())
    }

    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.cache.invalidate(key).await
    }

    pub async fn invalidate_all<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a CacheKey>,
    {
        for key in keys {
            if self.cache.invalidate(key).await {
                debug!("Invalidated {}", key);
            }
        }
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}

fn encode<T: Serialize>(key: &CacheKey, value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::Internal(format!("failed to encode cache entry {}: {}", key, e)))
}

/// Snapshot of a resource as seen by a consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<Error>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Identifies one fetch issued through a [`RequestGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    epoch: u64,
}

/// Decides which in-flight fetch may publish its result.
///
/// A newer fetch outdates older ones: they still answer their caller but no
/// longer publish. A mutation ([`supersede`](Self::supersede)) or a shutdown
/// makes every earlier fetch fail with `Superseded` or `Cancelled`.
#[derive(Debug, Default)]
pub struct RequestGuard {
    generation: AtomicU64,
    epoch: AtomicU64,
    cancel: CancellationToken,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fetch, outdating every earlier one.
    pub fn begin(&self) -> Ticket {
        Ticket {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            epoch: self.epoch.load(Ordering::SeqCst),
        }
    }

    /// Record a local mutation; fetches issued before it are superseded.
    pub fn supersede(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// `true` while `ticket` is the latest fetch and may publish.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.check(ticket).is_ok() && !self.is_outdated(ticket)
    }

    /// `true` once a newer fetch has been issued after `ticket`.
    pub fn is_outdated(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) != ticket.generation
    }

    /// `Err` when `ticket` was cancelled or superseded by a mutation.
    pub fn check(&self, ticket: Ticket) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else if self.epoch.load(Ordering::SeqCst) != ticket.epoch {
            Err(Error::Superseded)
        } else {
            Ok(())
        }
    }

    /// Run `fut` unless the guard is shut down first.
    pub async fn run<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Lock-guarded [`ResourceState`]. The lock is never held across an await.
#[derive(Debug)]
pub struct StateCell<T> {
    inner: RwLock<ResourceState<T>>,
}

impl<T: Clone> StateCell<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ResourceState::default()),
        }
    }

    pub fn snapshot(&self) -> ResourceState<T> {
        self.inner.read().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.read().data.clone()
    }

    pub fn start(&self) {
        let mut state = self.inner.write();
        state.loading = true;
        state.error = None;
    }

    /// Publish the outcome of `ticket`.
    ///
    /// A superseded or cancelled ticket publishes nothing and reports why. An
    /// outdated ticket hands its result back to the caller unpublished.
    pub fn settle(&self, guard: &RequestGuard, ticket: Ticket, result: Result<T>) -> Result<T> {
        if let Err(stale) = guard.check(ticket) {
            debug!("Dropping result of stale request: {}", stale);
            return Err(stale);
        }
        if guard.is_outdated(ticket) {
            debug!("A newer fetch is in flight, not publishing this result");
            return result;
        }

        let mut state = self.inner.write();
        state.loading = false;
        match result {
            Ok(value) => {
                state.data = Some(value.clone());
                state.error = None;
                Ok(value)
            }
            Err(e) => {
                state.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Replace the data outright.
    pub fn load(&self, value: T) {
        let mut state = self.inner.write();
        state.data = Some(value);
        state.loading = false;
        state.error = None;
    }

    /// Patch the held data in place.
    pub fn patch<F>(&self, f: F)
    where
        F: FnOnce(&mut Option<T>),
    {
        let mut state = self.inner.write();
        f(&mut state.data);
        state.loading = false;
    }

    /// Clear the loading flag without touching data or error.
    pub fn idle(&self) {
        self.inner.write().loading = false;
    }

    pub fn fail(&self, error: Error) {
        let mut state = self.inner.write();
        state.loading = false;
        state.error = Some(error);
    }

    pub fn reset(&self) {
        *self.inner.write() = ResourceState::default();
    }
}

impl<T: Clone> Default for StateCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
