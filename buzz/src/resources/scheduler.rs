use crate::cache_keys::CacheKey;
use crate::ports::Backend;
use crate::query::{QueryClient, RequestGuard, ResourceState, StateCell};
use serde_json::Value;
use shared::Result;
use shared_http::api::{Post, PostQuery};
use std::sync::Arc;
use tracing::{error, info};

/// The backend's publishing scheduler: its status, the queue of upcoming
/// posts and a manual trigger.
pub struct SchedulerResource {
    backend: Arc<dyn Backend>,
    queries: QueryClient,
    state: StateCell<Vec<Post>>,
    guard: RequestGuard,
}

impl SchedulerResource {
    pub fn new(backend: Arc<dyn Backend>, queries: QueryClient) -> Self {
        Self {
            backend,
            queries,
            state: StateCell::new(),
            guard: RequestGuard::new(),
        }
    }

    pub fn state(&self) -> ResourceState<Vec<Post>> {
        self.state.snapshot()
    }

    pub fn upcoming_posts(&self) -> Vec<Post> {
        self.state.data().unwrap_or_default()
    }

    /// Posts queued for publishing; a 304 answer reads as an empty queue.
    pub async fn upcoming(&self) -> Result<Vec<Post>> {
        let ticket = self.guard.begin();
        self.state.start();

        let backend = Arc::clone(&self.backend);
        let result = self
            .guard
            .run(self.queries.fetch_if(
                CacheKey::UpcomingPosts,
                || async move {
                    let list = backend.scheduler_upcoming().await?.into_optional()?;
                    Ok(list.map(|l| l.posts).unwrap_or_default())
                },
                || self.guard.is_current(ticket),
            ))
            .await
            .map_err(|e| e.or_context("Failed to fetch upcoming posts"));

        self.state.settle(&self.guard, ticket, result)
    }

    pub async fn refetch(&self) -> Result<Vec<Post>> {
        self.queries.invalidate(&CacheKey::UpcomingPosts).await;
        self.upcoming().await
    }

    /// Scheduler status; shape is backend-defined.
    pub async fn status(&self) -> Result<Value> {
        let backend = Arc::clone(&self.backend);
        self.queries
            .fetch(CacheKey::SchedulerStatus, || async move {
                Ok(backend.scheduler_status().await?.into_optional()?.unwrap_or_default())
            })
            .await
            .map_err(|e| e.or_context("Failed to fetch scheduler status"))
    }

    /// Run the scheduler now. Everything derived from the post queue is
    /// dropped from the cache, since due posts may have been published.
    pub async fn trigger(&self) -> Result<Value> {
        let outcome = self
            .guard
            .run(async { self.backend.trigger_scheduler().await?.into_optional() })
            .await
            .map_err(|e| {
                let e = e.or_context("Failed to trigger scheduler");
                error!("Failed to trigger scheduler: {}", e);
                e
            })?;

        self.guard.supersede();
        self.queries
            .invalidate_all(&[
                CacheKey::UpcomingPosts,
                CacheKey::SchedulerStatus,
                CacheKey::Posts(PostQuery::default()),
                CacheKey::Dashboard,
            ])
            .await;

        info!("Scheduler triggered");
        Ok(outcome.unwrap_or_default())
    }

    pub fn shutdown(&self) {
        self.guard.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_keys::new_cache;
    use crate::test_support::FakeBackend;
    use shared::Error;
    use shared_http::api::PostStatus;
    use std::time::Duration;

    fn scheduler(backend: &Arc<FakeBackend>, queries: &QueryClient) -> SchedulerResource {
        SchedulerResource::new(backend.clone(), queries.clone())
    }

    fn queries() -> QueryClient {
        QueryClient::new(new_cache(Duration::from_secs(30)))
    }

    #[tokio::test]
    async fn test_upcoming_is_cached() {
        let backend = Arc::new(FakeBackend::seeded());
        let scheduler = scheduler(&backend, &queries());

        let upcoming = scheduler.upcoming().await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].status, PostStatus::Scheduled);

        scheduler.upcoming().await.unwrap();
        assert_eq!(backend.calls("scheduler_upcoming"), 1);
        assert_eq!(scheduler.upcoming_posts().len(), 1);
    }

    #[tokio::test]
    async fn test_trigger_publishes_and_invalidates() {
        let backend = Arc::new(FakeBackend::seeded());
        let queries = queries();
        let scheduler = scheduler(&backend, &queries);
        queries.store(CacheKey::Dashboard, &"cached").await.unwrap();
        scheduler.upcoming().await.unwrap();
        scheduler.status().await.unwrap();

        let outcome = scheduler.trigger().await.unwrap();
        assert_eq!(outcome["processed"], 1);

        assert!(queries.cached::<String>(&CacheKey::Dashboard).await.is_none());
        assert!(scheduler.refetch().await.unwrap().is_empty());
        let status = scheduler.status().await.unwrap();
        assert_eq!(status["queued"], 0);
        assert_eq!(backend.calls("scheduler_status"), 2);
    }

    #[tokio::test]
    async fn test_failed_trigger_keeps_cache() {
        let backend = Arc::new(FakeBackend::seeded());
        backend.fail("trigger_scheduler", Error::Http {
            status: 503,
            message: "Scheduler busy".to_string(),
        });
        let queries = queries();
        let scheduler = scheduler(&backend, &queries);
        scheduler.upcoming().await.unwrap();

        let err = scheduler.trigger().await.unwrap_err();
        assert_eq!(err.to_string(), "Scheduler busy");

        scheduler.upcoming().await.unwrap();
        assert_eq!(backend.calls("scheduler_upcoming"), 1);
    }
}
