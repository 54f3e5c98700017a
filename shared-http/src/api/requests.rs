use super::models::{Platform, PostStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Request body for the login endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body for `POST /api/posts`. Drafts omit `scheduled_date`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    pub platforms: Vec<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
}

/// Partial update for `PUT /api/posts/:id`; unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<Platform>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInstagramRequest {
    pub connection_type: String,
}

impl Default for ConnectInstagramRequest {
    fn default() -> Self {
        Self {
            connection_type: "standard".to_string(),
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordRequest {
    pub current_password: String,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl fmt::Debug for VerifyPasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyPasswordRequest").finish_non_exhaustive()
    }
}

impl fmt::Debug for UpdatePasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatePasswordRequest").finish_non_exhaustive()
    }
}

/// Body for `POST /api/ai/generate-content`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub prompt: String,
    pub tone: String,
    pub platforms: Vec<Platform>,
    pub include_hashtags: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl Default for GenerateContentRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            tone: "casual".to_string(),
            platforms: Vec::new(),
            include_hashtags: true,
            max_length: None,
        }
    }
}

/// Body for `POST /api/ai/suggest-hashtags`.
#[derive(Debug, Clone, Serialize)]
pub struct HashtagRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub count: u32,
}

/// Body for `POST /api/ai/suggest-mentions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub count: u32,
    pub mention_types: Vec<String>,
    pub verified_only: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeContentRequest {
    pub content: String,
    pub target_platform: Platform,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeContentRequest {
    pub content: String,
    pub platform: Platform,
}

/// Query parameters for `GET /api/posts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PostQuery {
    pub status: Option<PostStatus>,
    pub platform: Option<Platform>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PostQuery {
    /// Parameters in a fixed order so identical queries render identically.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        if let Some(platform) = self.platform {
            pairs.push(("platform", platform.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

impl fmt::Display for PostQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pairs(f, &self.to_pairs())
    }
}

/// Query parameters for the media listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MediaQuery {
    pub file_type: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl MediaQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(file_type) = &self.file_type {
            pairs.push(("type", file_type.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pairs(f, &self.to_pairs())
    }
}

fn write_pairs(f: &mut fmt::Formatter<'_>, pairs: &[(&'static str, String)]) -> fmt::Result {
    for (i, (key, value)) in pairs.iter().enumerate() {
        if i > 0 {
            f.write_str("&")?;
        }
        write!(f, "{}={}", key, value)?;
    }
    Ok(())
}

/// A file to send to `POST /api/media/upload` as a multipart `files` part.
#[derive(Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MediaUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaUpload")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
