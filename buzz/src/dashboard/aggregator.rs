use super::view_model::{DashboardViewModel, SettledFetches};
use crate::cache_keys::CacheKey;
use crate::ports::Backend;
use crate::query::{QueryClient, RequestGuard, ResourceState, StateCell};
use crate::resources::media::load_media;
use crate::resources::posts::load_posts;
use chrono::Utc;
use shared::{Error, Result};
use shared_http::api::{
    AnalyticsOverview, ConnectInstagramRequest, CreatePostRequest, DashboardSummary,
    InstagramConnectionStatus, Media, MediaQuery, Post, PostQuery, User,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const LOAD_FAILED: &str = "Failed to load dashboard data";

/// Builds the dashboard view-model from six concurrent sub-fetches.
///
/// A fresh `Dashboard` cache entry is served without touching the network.
/// Otherwise every sub-fetch runs to completion regardless of the others, and
/// the merged result is cached and published even when some of them failed.
pub struct DashboardAggregator {
    backend: Arc<dyn Backend>,
    queries: QueryClient,
    window: Duration,
    state: StateCell<DashboardViewModel>,
    guard: RequestGuard,
}

impl DashboardAggregator {
    pub fn new(backend: Arc<dyn Backend>, queries: QueryClient) -> Self {
        let window = queries.window();
        Self {
            backend,
            queries,
            window,
            state: StateCell::new(),
            guard: RequestGuard::new(),
        }
    }

    /// Use a freshness window other than the cache default.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self) -> ResourceState<DashboardViewModel> {
        self.state.snapshot()
    }

    /// The last published view-model.
    pub fn view(&self) -> Option<DashboardViewModel> {
        self.state.data()
    }

    pub async fn fetch_dashboard(&self) -> Result<DashboardViewModel> {
        self.fetch_dashboard_with(&CancellationToken::new()).await
    }

    /// Like [`fetch_dashboard`](Self::fetch_dashboard), abandoning the fan-out
    /// as soon as `cancel` fires.
    pub async fn fetch_dashboard_with(&self, cancel: &CancellationToken) -> Result<DashboardViewModel> {
        let ticket = self.guard.begin();
        self.state.start();

        if let Some(cached) = self
            .queries
            .cached_within::<DashboardViewModel>(&CacheKey::Dashboard, self.window)
            .await
        {
            debug!("Serving dashboard from cache");
            return self.state.settle(&self.guard, ticket, Ok(cached));
        }

        let fanned_out = tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.guard.run(self.fan_out()) => result,
        };

        let result = match fanned_out {
            // Only the latest fetch writes the cache
            Ok(view) if self.guard.is_current(ticket) => self
                .queries
                .store(CacheKey::Dashboard, &view)
                .await
                .map(|_| view),
            other => other,
        };

        match result {
            Ok(view) => {
                if view.is_degraded() {
                    let failures: Vec<String> = view
                        .failures()
                        .map(|o| {
                            let reason = o.error.as_ref().map(ToString::to_string);
                            format!("{}: {}", o.source, reason.unwrap_or_default())
                        })
                        .collect();
                    warn!("Some dashboard data failed to load: {:?}", failures);
                }
                self.state.settle(&self.guard, ticket, Ok(view))
            }
            Err(e @ (Error::Cancelled | Error::Superseded)) => {
                debug!("Dashboard fetch abandoned: {}", e);
                if self.guard.is_current(ticket) {
                    self.state.idle();
                }
                Err(e)
            }
            Err(e) => {
                // The previous view-model stays in place
                error!("{}: {}", LOAD_FAILED, e);
                let generic = Error::Application(LOAD_FAILED.to_string());
                self.state.settle(&self.guard, ticket, Err(generic))
            }
        }
    }

    /// Drop the cached view-model and fetch again.
    pub async fn refetch(&self) -> Result<DashboardViewModel> {
        self.queries.invalidate(&CacheKey::Dashboard).await;
        self.fetch_dashboard().await
    }

    /// Create a post and prepend it to the published view-model.
    pub async fn create_post(&self, request: &CreatePostRequest) -> Result<Post> {
        let created = self
            .backend
            .create_post(request)
            .await
            .and_then(|r| r.into_data())
            .map_err(|e| e.or_context("Failed to create post"))?;

        self.guard.supersede();
        self.state.patch(|view| {
            view.get_or_insert_with(DashboardViewModel::default)
                .posts
                .insert(0, created.clone());
        });
        self.invalidate_posts().await;

        info!("Created post {} from dashboard", created.id);
        Ok(created)
    }

    pub async fn delete_post(&self, id: &str) -> Result<()> {
        self.backend
            .delete_post(id)
            .await
            .and_then(|r| r.into_optional())
            .map_err(|e| e.or_context("Failed to delete post"))?;

        self.guard.supersede();
        self.state.patch(|view| {
            if let Some(view) = view {
                view.posts.retain(|p| p.id != id);
                view.upcoming_posts.retain(|p| p.id != id);
            }
        });
        self.invalidate_posts().await;

        info!("Deleted post {} from dashboard", id);
        Ok(())
    }

    /// Start the Instagram OAuth flow; returns the URL to open, if any.
    pub async fn connect_instagram(&self, connection_type: Option<&str>) -> Result<Option<String>> {
        let request = connection_type
            .map(|kind| ConnectInstagramRequest {
                connection_type: kind.to_string(),
            })
            .unwrap_or_default();

        let response = self
            .backend
            .connect_instagram(&request)
            .await
            .and_then(|r| r.into_optional())
            .map_err(|e| e.or_context("Failed to connect Instagram"))?;
        Ok(response.and_then(|r| r.auth_url))
    }

    /// Disconnect an account and patch only the Instagram status field.
    pub async fn disconnect_instagram(
        &self,
        account_id: &str,
    ) -> Result<Option<InstagramConnectionStatus>> {
        if account_id.trim().is_empty() {
            return Err(Error::Validation(
                "Account ID is required to disconnect Instagram".to_string(),
            ));
        }

        let status = async {
            self.backend
                .disconnect_instagram_account(account_id)
                .await?
                .into_optional()?;
            self.backend.instagram_connection_status().await?.into_optional()
        }
        .await
        .map_err(|e| e.or_context("Failed to disconnect Instagram"))?;

        self.state.patch(|view| {
            if let Some(view) = view {
                view.instagram_status = status.clone();
            }
        });
        self.queries
            .invalidate_all(&[CacheKey::InstagramStatus, CacheKey::Dashboard])
            .await;

        info!("Disconnected Instagram account {}", account_id);
        Ok(status)
    }

    /// Discard results of fetches still in flight.
    pub fn shutdown(&self) {
        self.guard.shutdown();
    }

    async fn invalidate_posts(&self) {
        self.queries
            .invalidate_all(&[CacheKey::Dashboard, CacheKey::Posts(PostQuery::default())])
            .await;
    }

    async fn fan_out(&self) -> Result<DashboardViewModel> {
        let backend = self.backend.as_ref();
        let post_query = PostQuery::default();
        let (summary, user, posts, analytics, instagram_status, media) = tokio::join!(
            fetch_summary(backend),
            fetch_user(backend),
            load_posts(backend, &post_query),
            fetch_analytics(backend),
            fetch_instagram_status(backend),
            fetch_media(backend),
        );

        let settled = SettledFetches {
            summary,
            user,
            posts,
            analytics,
            instagram_status,
            media,
        };
        Ok(DashboardViewModel::merge(settled, Utc::now()))
    }
}

async fn fetch_summary(backend: &dyn Backend) -> Result<Option<DashboardSummary>> {
    backend.dashboard().await?.into_optional()
}

async fn fetch_user(backend: &dyn Backend) -> Result<Option<User>> {
    backend.current_user().await?.into_optional()
}

async fn fetch_analytics(backend: &dyn Backend) -> Result<Option<AnalyticsOverview>> {
    backend.analytics_overview().await?.into_optional()
}

async fn fetch_instagram_status(backend: &dyn Backend) -> Result<Option<InstagramConnectionStatus>> {
    backend.instagram_connection_status().await?.into_optional()
}

async fn fetch_media(backend: &dyn Backend) -> Result<Vec<Media>> {
    Ok(load_media(backend, &MediaQuery::default()).await?.media)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_keys::new_cache;
    use crate::dashboard::DashboardSource;
    use crate::test_support::{FakeBackend, post, user};
    use shared_http::api::PostStatus;

    const SOURCES: [&str; 6] = ["dashboard", "me", "posts", "analytics", "instagram_status", "media"];

    fn aggregator(backend: &Arc<FakeBackend>) -> DashboardAggregator {
        DashboardAggregator::new(
            backend.clone(),
            QueryClient::new(new_cache(Duration::from_secs(30))),
        )
    }

    fn total_calls(backend: &FakeBackend) -> usize {
        SOURCES.iter().map(|s| backend.calls(s)).sum()
    }

    #[tokio::test]
    async fn test_fetch_merges_all_sources() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend);

        let view = dashboard.fetch_dashboard().await.unwrap();
        assert_eq!(view.user, Some(user()));
        assert_eq!(view.posts.len(), 2);
        assert_eq!(view.media.len(), 1);
        assert_eq!(view.upcoming_posts.len(), 1);
        assert_eq!(view.stats.as_ref().and_then(|s| s.total_posts), Some(2));
        assert!(view.instagram_status.is_some_and(|s| s.connected));
        assert!(view.analytics.is_some());
        assert!(view.fetched_at.is_some());
        assert_eq!(total_calls(&backend), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_skips_network() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend);

        let first = dashboard.fetch_dashboard().await.unwrap();
        tokio::time::advance(Duration::from_secs(29)).await;
        let second = dashboard.fetch_dashboard().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(total_calls(&backend), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cache_refetches() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend);

        dashboard.fetch_dashboard().await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        dashboard.fetch_dashboard().await.unwrap();

        assert_eq!(total_calls(&backend), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_window() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend).with_window(Duration::from_secs(5));

        dashboard.fetch_dashboard().await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        dashboard.fetch_dashboard().await.unwrap();

        assert_eq!(backend.calls("dashboard"), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_still_resolves() {
        let backend = Arc::new(FakeBackend::seeded());
        backend.fail("me", Error::Unauthorized("Authentication failed. Please log in again.".into()));
        backend.fail("analytics", Error::Timeout(30_000));
        backend.fail("media", Error::RateLimited);
        let dashboard = aggregator(&backend);

        let view = dashboard.fetch_dashboard().await.unwrap();
        assert!(view.user.is_none());
        assert!(view.analytics.is_none());
        assert!(view.media.is_empty());
        assert_eq!(view.posts.len(), 2);
        assert!(view.stats.is_some());
        assert!(view.instagram_status.is_some());

        let failed: Vec<_> = view.failures().map(|o| o.source).collect();
        assert_eq!(
            failed,
            vec![
                DashboardSource::User,
                DashboardSource::Analytics,
                DashboardSource::Media
            ]
        );
        assert!(dashboard.state().error.is_none());
    }

    #[tokio::test]
    async fn test_every_source_failing_still_resolves() {
        let backend = Arc::new(FakeBackend::seeded());
        for source in SOURCES {
            backend.fail(source, Error::Connection("offline".to_string()));
        }
        let dashboard = aggregator(&backend);

        let view = dashboard.fetch_dashboard().await.unwrap();
        assert!(view.user.is_none() && view.stats.is_none() && view.analytics.is_none());
        assert!(view.posts.is_empty() && view.media.is_empty() && view.upcoming_posts.is_empty());
        assert_eq!(view.failures().count(), 6);
    }

    #[tokio::test]
    async fn test_degraded_view_is_cached() {
        let backend = Arc::new(FakeBackend::seeded());
        backend.fail("posts", Error::RateLimited);
        let dashboard = aggregator(&backend);

        dashboard.fetch_dashboard().await.unwrap();
        backend.recover("posts");
        let cached = dashboard.fetch_dashboard().await.unwrap();

        assert!(cached.posts.is_empty());
        assert_eq!(backend.calls("posts"), 1);

        let refreshed = dashboard.refetch().await.unwrap();
        assert_eq!(refreshed.posts.len(), 2);
    }

    #[tokio::test]
    async fn test_create_post_prepends_and_invalidates() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend);
        dashboard.fetch_dashboard().await.unwrap();

        let created = dashboard
            .create_post(&CreatePostRequest {
                content: "from the dashboard".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let view = dashboard.view().unwrap();
        assert_eq!(view.posts.len(), 3);
        assert_eq!(view.posts[0].id, created.id);

        dashboard.fetch_dashboard().await.unwrap();
        assert_eq!(backend.calls("dashboard"), 2);
    }

    #[tokio::test]
    async fn test_delete_post_removes_everywhere() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend);
        dashboard.fetch_dashboard().await.unwrap();

        dashboard.delete_post("p1").await.unwrap();
        let view = dashboard.view().unwrap();
        assert!(view.posts.iter().all(|p| p.id != "p1"));
        assert!(view.upcoming_posts.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_patches_status_only() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend);
        let before = dashboard.fetch_dashboard().await.unwrap();

        let status = dashboard.disconnect_instagram("ig-1").await.unwrap();
        assert!(status.is_some_and(|s| !s.connected));

        let after = dashboard.view().unwrap();
        assert!(after.instagram_status.is_some_and(|s| s.accounts.is_empty()));
        assert_eq!(after.posts, before.posts);
        assert_eq!(after.user, before.user);
        assert_eq!(backend.calls("dashboard"), 1);
    }

    #[tokio::test]
    async fn test_connect_instagram_defaults_to_standard() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend);
        let url = dashboard.connect_instagram(None).await.unwrap();
        assert!(url.unwrap().ends_with("type=standard"));
    }

    #[tokio::test]
    async fn test_cancellation_keeps_previous_view() {
        let backend = Arc::new(FakeBackend::seeded());
        let dashboard = aggregator(&backend);
        let previous = dashboard.fetch_dashboard().await.unwrap();

        backend.delay("posts", Duration::from_millis(500));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        dashboard.queries.invalidate(&CacheKey::Dashboard).await;
        let result = dashboard.fetch_dashboard_with(&cancel).await;
        assert_eq!(result, Err(Error::Cancelled));

        let state = dashboard.state();
        assert_eq!(state.data, Some(previous));
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_overlapping_fetches_both_resolve() {
        let backend = Arc::new(FakeBackend::seeded());
        backend.delay("media", Duration::from_millis(200));
        let dashboard = Arc::new(aggregator(&backend));

        let first = {
            let dashboard = dashboard.clone();
            tokio::spawn(async move { dashboard.fetch_dashboard().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        backend.posts.lock().push(post("p3", PostStatus::Draft));

        let second = dashboard.fetch_dashboard().await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(first.posts.len(), 2);
        assert_eq!(second.posts.len(), 3);
        assert_eq!(backend.calls("dashboard"), 2);

        // the newer fetch owns both the published view and the cache entry
        assert_eq!(dashboard.view().map(|v| v.posts.len()), Some(3));
        let cached = dashboard.fetch_dashboard().await.unwrap();
        assert_eq!(cached.posts.len(), 3);
        assert_eq!(backend.calls("dashboard"), 2);
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_dropped() {
        let backend = Arc::new(FakeBackend::seeded());
        backend.delay("media", Duration::from_millis(200));
        let dashboard = Arc::new(aggregator(&backend));

        let slow = {
            let dashboard = dashboard.clone();
            tokio::spawn(async move { dashboard.fetch_dashboard().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        dashboard
            .create_post(&CreatePostRequest {
                content: "while loading".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(slow.await.unwrap(), Err(Error::Superseded));
        let view = dashboard.view().unwrap();
        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.posts[0].status, PostStatus::Draft);
    }
}
