use crate::cache_keys::CacheKey;
use crate::ports::Backend;
use crate::query::{QueryClient, RequestGuard, ResourceState, StateCell};
use serde_json::Value;
use shared::Result;
use shared_http::api::AnalyticsOverview;
use std::sync::Arc;

/// Cached analytics overview plus per-post analytics.
pub struct AnalyticsResource {
    backend: Arc<dyn Backend>,
    queries: QueryClient,
    state: StateCell<AnalyticsOverview>,
    guard: RequestGuard,
}

impl AnalyticsResource {
    pub fn new(backend: Arc<dyn Backend>, queries: QueryClient) -> Self {
        Self {
            backend,
            queries,
            state: StateCell::new(),
            guard: RequestGuard::new(),
        }
    }

    pub fn state(&self) -> ResourceState<AnalyticsOverview> {
        self.state.snapshot()
    }

    pub fn overview(&self) -> Option<AnalyticsOverview> {
        self.state.data()
    }

    pub async fn fetch(&self) -> Result<AnalyticsOverview> {
        let ticket = self.guard.begin();
        self.state.start();

        let backend = Arc::clone(&self.backend);
        let result = self
            .guard
            .run(self.queries.fetch_if(
                CacheKey::AnalyticsOverview,
                || async move { backend.analytics_overview().await?.into_data() },
                || self.guard.is_current(ticket),
            ))
            .await
            .map_err(|e| e.or_context("Failed to fetch analytics"));

        self.state.settle(&self.guard, ticket, result)
    }

    pub async fn refetch(&self) -> Result<AnalyticsOverview> {
        self.queries.invalidate(&CacheKey::AnalyticsOverview).await;
        self.fetch().await
    }

    /// Analytics for a single post; shape is backend-defined.
    pub async fn post(&self, post_id: &str) -> Result<Value> {
        let backend = Arc::clone(&self.backend);
        self.queries
            .fetch(CacheKey::PostAnalytics(post_id.to_string()), || async move {
                Ok(backend.post_analytics(post_id).await?.into_optional()?.unwrap_or_default())
            })
            .await
            .map_err(|e| e.or_context("Failed to fetch post analytics"))
    }

    pub fn shutdown(&self) {
        self.guard.shutdown();
    }
}
