use super::models::{Media, Notification, Pagination, Post, User};
use super::DashboardStats;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{Error, Result};
use std::collections::BTreeMap;

/// The backend's response envelope: `{ success, data, message? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Set when the server answered 304 and there is no body.
    #[serde(skip)]
    pub not_modified: bool,
}

fn default_success() -> bool {
    true
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            detail: None,
            not_modified: false,
        }
    }

    /// The empty success returned for HTTP 304.
    pub fn not_modified() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            error: None,
            detail: None,
            not_modified: true,
        }
    }

    /// The empty success returned for a 2xx answer without a body (204).
    pub fn no_content() -> Self {
        Self {
            not_modified: false,
            ..Self::not_modified()
        }
    }

    /// A `success: false` envelope carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            data: None,
            message: Some(message.clone()),
            error: Some(message),
            detail: None,
            not_modified: false,
        }
    }

    /// First non-empty of `message`, `error`, `detail`.
    pub fn failure_message(&self) -> Option<&str> {
        [&self.message, &self.error, &self.detail]
            .into_iter()
            .filter_map(|m| m.as_deref())
            .find(|m| !m.trim().is_empty())
    }

    /// Unwrap `data`, treating `success: false` as an application error.
    pub fn into_optional(self) -> Result<Option<T>> {
        if !self.success {
            let message = self.failure_message().unwrap_or_default().to_string();
            return Err(Error::Application(message));
        }
        Ok(self.data)
    }

    /// Like [`into_optional`](Self::into_optional) but a missing payload is an error.
    pub fn into_data(self) -> Result<T> {
        self.into_optional()?
            .ok_or_else(|| Error::Decode("response contained no data".to_string()))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            error: self.error,
            detail: self.detail,
            not_modified: self.not_modified,
        }
    }
}

/// Response body for successful login or registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(default)]
    pub stats: Option<DashboardStats>,
    #[serde(default)]
    pub upcoming_posts: Vec<Post>,
    #[serde(default)]
    pub analytics_overview: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PostListRepr {
    Bare(Vec<Post>),
    Wrapped {
        #[serde(default)]
        posts: Vec<Post>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
}

/// `GET /api/posts` answers either with a bare array or `{ posts, pagination }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PostListRepr")]
pub struct PostList {
    pub posts: Vec<Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl From<PostListRepr> for PostList {
    fn from(repr: PostListRepr) -> Self {
        match repr {
            PostListRepr::Bare(posts) => Self {
                posts,
                pagination: None,
            },
            PostListRepr::Wrapped { posts, pagination } => Self { posts, pagination },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MediaPageRepr {
    Bare(Vec<Media>),
    Single(Box<Media>),
    Wrapped {
        #[serde(default)]
        media: Vec<Media>,
        #[serde(default)]
        pagination: Option<Pagination>,
        #[serde(default)]
        stats: Option<Value>,
    },
}

/// Media listings arrive as a bare array or `{ media, pagination, stats }`;
/// uploads answer with a single media object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MediaPageRepr")]
pub struct MediaPage {
    pub media: Vec<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
}

impl From<MediaPageRepr> for MediaPage {
    fn from(repr: MediaPageRepr) -> Self {
        match repr {
            MediaPageRepr::Bare(media) => Self {
                media,
                ..Default::default()
            },
            MediaPageRepr::Single(media) => Self {
                media: vec![*media],
                ..Default::default()
            },
            MediaPageRepr::Wrapped {
                media,
                pagination,
                stats,
            } => Self {
                media,
                pagination,
                stats,
            },
        }
    }
}

impl MediaPage {
    pub fn total(&self) -> u64 {
        self.pagination
            .as_ref()
            .map(|p| p.total)
            .unwrap_or(self.media.len() as u64)
    }

    pub fn has_more(&self) -> bool {
        self.pagination.as_ref().is_some_and(Pagination::has_more)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NotificationListRepr {
    Bare(Vec<Notification>),
    Wrapped {
        #[serde(default)]
        notifications: Vec<Notification>,
        #[serde(default, rename = "unreadCount")]
        unread_count: Option<u64>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "NotificationListRepr")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    #[serde(rename = "unreadCount", skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u64>,
}

impl From<NotificationListRepr> for NotificationList {
    fn from(repr: NotificationListRepr) -> Self {
        match repr {
            NotificationListRepr::Bare(notifications) => Self {
                notifications,
                unread_count: None,
            },
            NotificationListRepr::Wrapped {
                notifications,
                unread_count,
            } => Self {
                notifications,
                unread_count,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramConnectResponse {
    #[serde(default)]
    pub auth_url: Option<String>,
}

/// One platform's draft from `POST /api/ai/generate-content`. YouTube drafts
/// carry `title`/`description`/`tags` instead of `content`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within_limit: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlatformDraft {
    /// The publishable text: `content`, else the YouTube description.
    pub fn text(&self) -> &str {
        self.content
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or_default()
    }

    /// Hashtags written into the text, in order of appearance.
    pub fn hashtags(&self) -> Vec<String> {
        self.text()
            .split_whitespace()
            .filter(|word| word.len() > 1 && word.starts_with('#'))
            .map(|word| word.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_'))
            .filter(|tag| tag.len() > 1)
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Drafts keyed by platform name.
    #[serde(default)]
    pub content: BTreeMap<String, PlatformDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de>"))]
enum SuggestionsRepr<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(default, alias = "hashtags", alias = "mentions")]
        items: Vec<T>,
    },
}

impl<T> SuggestionsRepr<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            SuggestionsRepr::Bare(items) | SuggestionsRepr::Wrapped { items } => items,
        }
    }
}

/// `{ hashtags: [...] }` or a bare array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SuggestionsRepr<String>")]
pub struct HashtagSuggestions {
    pub hashtags: Vec<String>,
}

impl From<SuggestionsRepr<String>> for HashtagSuggestions {
    fn from(repr: SuggestionsRepr<String>) -> Self {
        Self {
            hashtags: repr.into_items(),
        }
    }
}

/// `{ mentions: [...] }` or a bare array. Entries are backend-defined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SuggestionsRepr<Value>")]
pub struct MentionSuggestions {
    pub mentions: Vec<Value>,
}

impl From<SuggestionsRepr<Value>> for MentionSuggestions {
    fn from(repr: SuggestionsRepr<Value>) -> Self {
        Self {
            mentions: repr.into_items(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_content: Option<String>,
    #[serde(default)]
    pub improvements: Vec<Value>,
    #[serde(default)]
    pub suggestions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}
