use serde_json::Value;
use shared_http::api::{ConnectionProvider, MediaQuery, PostQuery};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use storage_engine::{CacheStore, FreshnessCache};

/// Cache shared by every store of one session. Values are kept as JSON so one
/// store can hold every resource type.
pub type SharedCache = Arc<dyn CacheStore<CacheKey, Value>>;

/// Build the default moka-backed cache with the given freshness window.
pub fn new_cache(window: Duration) -> SharedCache {
    Arc::new(FreshnessCache::new("buzz-responses", window))
}

/// Identity of a cached request: the resource plus its parameters.
///
/// Two requests for the same resource with equal parameters always map to the
/// same key; different parameters never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Dashboard,
    CurrentUser,
    UserProfile,
    Posts(PostQuery),
    SchedulerStatus,
    UpcomingPosts,
    AnalyticsOverview,
    PostAnalytics(String),
    InstagramStatus,
    ProviderStatus(ConnectionProvider),
    YouTubeChannel,
    Media(MediaQuery),
    MediaFolder(String),
    MediaSearch(String),
    RecentMedia(u32),
    MediaStats,
    MediaFolders,
}

impl CacheKey {
    pub fn resource(&self) -> &'static str {
        match self {
            CacheKey::Dashboard => "dashboard-data",
            CacheKey::CurrentUser => "current-user",
            CacheKey::UserProfile => "user-profile",
            CacheKey::Posts(_) => "posts",
            CacheKey::SchedulerStatus => "scheduler-status",
            CacheKey::UpcomingPosts => "scheduler-upcoming",
            CacheKey::AnalyticsOverview => "analytics-overview",
            CacheKey::PostAnalytics(_) => "post-analytics",
            CacheKey::InstagramStatus => "instagram-status",
            CacheKey::ProviderStatus(_) => "provider-status",
            CacheKey::YouTubeChannel => "youtube-channel",
            CacheKey::Media(_) => "media",
            CacheKey::MediaFolder(_) => "media-folder",
            CacheKey::MediaSearch(_) => "media-search",
            CacheKey::RecentMedia(_) => "media-recent",
            CacheKey::MediaStats => "media-stats",
            CacheKey::MediaFolders => "media-folders",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())?;
        match self {
            CacheKey::Posts(query) => write_query(f, &query.to_string()),
            CacheKey::Media(query) => write_query(f, &query.to_string()),
            CacheKey::PostAnalytics(id) => write!(f, "/{}", id),
            CacheKey::ProviderStatus(provider) => write!(f, "/{}", provider),
            CacheKey::MediaFolder(folder) => write!(f, "/{}", folder),
            CacheKey::MediaSearch(term) => write!(f, "?q={}", term),
            CacheKey::RecentMedia(limit) => write!(f, "?limit={}", limit),
            _ => Ok(()),
        }
    }
}

fn write_query(f: &mut fmt::Formatter<'_>, query: &str) -> fmt::Result {
    if query.is_empty() {
        Ok(())
    } else {
        write!(f, "?{}", query)
    }
}
