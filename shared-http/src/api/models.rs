use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub type PostId = String;
pub type MediaId = String;
pub type NotificationId = String;

/// Social networks a post can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    #[serde(alias = "x")]
    Twitter,
    #[serde(alias = "linkedIn")]
    Linkedin,
    #[serde(alias = "youTube")]
    Youtube,
    #[serde(other)]
    Other,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Instagram,
        Platform::Facebook,
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Youtube,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Youtube => "youtube",
            Platform::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Scheduled,
    Published,
    Failed,
    #[serde(other)]
    Other,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
            PostStatus::Other => "other",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post as mirrored from the backend. The client never owns the authoritative copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", alias = "id")]
    pub id: PostId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platform_posts: Vec<PlatformPost>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformPostStatus {
    #[default]
    Pending,
    Published,
    Failed,
    #[serde(other)]
    Other,
}

/// Per-account publish record, created by the backend at publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPost {
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default)]
    pub status: PlatformPostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(rename = "_id", alias = "id")]
    pub id: MediaId,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "originalName", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Media {
    pub fn is_image(&self) -> bool {
        self.file_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image"))
    }

    pub fn is_video(&self) -> bool {
        self.file_type
            .as_deref()
            .is_some_and(|t| t.starts_with("video"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccount {
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub connected_accounts: Vec<ConnectedAccount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_engagement: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_accounts: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramAccount {
    #[serde(alias = "_id", alias = "accountId")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramConnectionStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub accounts: Vec<InstagramAccount>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Account providers whose connection status is read from
/// `/api/auth/{slug}/status`. Instagram has its own endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionProvider {
    Linkedin,
    LinkedinBusiness,
    Youtube,
    #[serde(alias = "x")]
    Twitter,
}

impl ConnectionProvider {
    pub const ALL: [ConnectionProvider; 4] = [
        ConnectionProvider::Linkedin,
        ConnectionProvider::LinkedinBusiness,
        ConnectionProvider::Youtube,
        ConnectionProvider::Twitter,
    ];

    /// Path segment used by the backend's auth routes.
    pub fn slug(&self) -> &'static str {
        match self {
            ConnectionProvider::Linkedin => "linkedin",
            ConnectionProvider::LinkedinBusiness => "linkedin-business",
            ConnectionProvider::Youtube => "youtube",
            ConnectionProvider::Twitter => "x",
        }
    }

    /// The platform a connected account publishes to.
    pub fn platform(&self) -> Platform {
        match self {
            ConnectionProvider::Linkedin | ConnectionProvider::LinkedinBusiness => Platform::Linkedin,
            ConnectionProvider::Youtube => Platform::Youtube,
            ConnectionProvider::Twitter => Platform::Twitter,
        }
    }
}

impl fmt::Display for ConnectionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// An account reported by a provider's status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAccount {
    #[serde(default, alias = "_id", alias = "accountId")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<InstagramAccount> for PlatformAccount {
    fn from(account: InstagramAccount) -> Self {
        Self {
            id: account.id,
            username: account.username,
            extra: account.extra,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConnectionStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub accounts: Vec<PlatformAccount>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The channel behind a YouTube connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeChannel {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl YouTubeChannel {
    pub fn subscriber_count(&self) -> Option<u64> {
        let count = self.extra.get("statistics")?.get("subscriberCount")?;
        count
            .as_u64()
            .or_else(|| count.as_str().and_then(|s| s.parse().ok()))
    }
}

impl From<YouTubeChannel> for PlatformAccount {
    fn from(channel: YouTubeChannel) -> Self {
        Self {
            id: channel.id,
            username: channel.title,
            extra: channel.extra,
        }
    }
}

/// Profile data from `/api/users/profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", alias = "id")]
    pub id: NotificationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.page < self.pages
    }
}
