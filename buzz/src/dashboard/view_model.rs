use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{Error, Result};
use shared_http::api::{
    AnalyticsOverview, DashboardStats, DashboardSummary, InstagramConnectionStatus, Media, Post,
    User,
};
use std::fmt;

/// The six sub-fetches behind a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DashboardSource {
    Summary,
    User,
    Posts,
    Analytics,
    InstagramStatus,
    Media,
}

impl DashboardSource {
    pub const ALL: [DashboardSource; 6] = [
        DashboardSource::Summary,
        DashboardSource::User,
        DashboardSource::Posts,
        DashboardSource::Analytics,
        DashboardSource::InstagramStatus,
        DashboardSource::Media,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardSource::Summary => "dashboard",
            DashboardSource::User => "user",
            DashboardSource::Posts => "posts",
            DashboardSource::Analytics => "analytics",
            DashboardSource::InstagramStatus => "instagramStatus",
            DashboardSource::Media => "media",
        }
    }
}

impl fmt::Display for DashboardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one sub-fetch settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source: DashboardSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl SourceOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of the dashboard fan-out, one per source, each settled on its own.
#[derive(Debug)]
pub struct SettledFetches {
    pub summary: Result<Option<DashboardSummary>>,
    pub user: Result<Option<User>>,
    pub posts: Result<Vec<Post>>,
    pub analytics: Result<Option<AnalyticsOverview>>,
    pub instagram_status: Result<Option<InstagramConnectionStatus>>,
    pub media: Result<Vec<Media>>,
}

/// UI-ready aggregate of the dashboard's resources.
///
/// Every field is independently optional: a failed sub-fetch leaves its field
/// `None` or empty and is recorded in `outcomes`. The whole value is replaced
/// on each refetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardViewModel {
    pub user: Option<User>,
    #[serde(default)]
    pub posts: Vec<Post>,
    pub analytics: Option<AnalyticsOverview>,
    pub instagram_status: Option<InstagramConnectionStatus>,
    #[serde(default)]
    pub media: Vec<Media>,
    pub stats: Option<DashboardStats>,
    #[serde(default)]
    pub upcoming_posts: Vec<Post>,
    pub analytics_overview: Option<Value>,
    #[serde(default)]
    pub outcomes: Vec<SourceOutcome>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl DashboardViewModel {
    /// Merge settled sub-fetches; failures default their field.
    pub fn merge(settled: SettledFetches, fetched_at: DateTime<Utc>) -> Self {
        let mut outcomes = Vec::with_capacity(DashboardSource::ALL.len());
        let mut record = |source: DashboardSource, error: Option<Error>| {
            outcomes.push(SourceOutcome { source, error });
        };

        let summary = settle(settled.summary, DashboardSource::Summary, &mut record).flatten();
        let user = settle(settled.user, DashboardSource::User, &mut record).flatten();
        let posts = settle(settled.posts, DashboardSource::Posts, &mut record).unwrap_or_default();
        let analytics = settle(settled.analytics, DashboardSource::Analytics, &mut record).flatten();
        let instagram_status = settle(
            settled.instagram_status,
            DashboardSource::InstagramStatus,
            &mut record,
        )
        .flatten();
        let media = settle(settled.media, DashboardSource::Media, &mut record).unwrap_or_default();

        let (stats, upcoming_posts, analytics_overview) = match summary {
            Some(summary) => (
                summary.stats,
                summary.upcoming_posts,
                summary.analytics_overview,
            ),
            None => (None, Vec::new(), None),
        };

        Self {
            user,
            posts,
            analytics,
            instagram_status,
            media,
            stats,
            upcoming_posts,
            analytics_overview,
            outcomes,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Whether any sub-fetch failed.
    pub fn is_degraded(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn outcome(&self, source: DashboardSource) -> Option<&SourceOutcome> {
        self.outcomes.iter().find(|o| o.source == source)
    }
}

fn settle<T, F>(result: Result<T>, source: DashboardSource, record: &mut F) -> Option<T>
where
    F: FnMut(DashboardSource, Option<Error>),
{
    match result {
        Ok(value) => {
            record(source, None);
            Some(value)
        }
        Err(e) => {
            record(source, Some(e));
            None
        }
    }
}
