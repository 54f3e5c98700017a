//! In-memory [`Backend`] for unit tests, with per-endpoint failure injection,
//! artificial latency and call counters.

use crate::ports::Backend;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{Value, json};
use shared::{Error, Result};
use shared_http::api::{
    AnalyticsOverview, AnalyzeContentRequest, ApiResponse, AuthPayload, ConnectInstagramRequest,
    ConnectionProvider, CreatePostRequest, DashboardStats, DashboardSummary,
    GenerateContentRequest, GeneratedContent, HashtagRequest, HashtagSuggestions,
    InstagramAccount, InstagramConnectResponse, InstagramConnectionStatus, LoginRequest, Media,
    MediaPage, MediaQuery, MediaUpload, MentionRequest, MentionSuggestions, Notification,
    NotificationList, OptimizeContentRequest, OptimizedContent, Platform, PlatformAccount,
    PlatformConnectionStatus, PlatformDraft, Post, PostList, PostQuery, PostStatus,
    RegisterRequest, UpdatePasswordRequest, UpdatePostRequest, User, UserProfile,
    VerifyPasswordRequest, YouTubeChannel,
};
use std::collections::HashMap;
use std::time::Duration;

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

pub fn post(id: &str, status: PostStatus) -> Post {
    Post {
        id: id.to_string(),
        content: format!("content of {}", id),
        platforms: vec![Platform::Instagram],
        status,
        scheduled_date: None,
        published_at: None,
        created_at: None,
        hashtags: Vec::new(),
        platform_posts: Vec::new(),
    }
}

pub fn media(id: &str) -> Media {
    Media {
        id: id.to_string(),
        url: format!("https://cdn.test/{}.png", id),
        filename: Some(format!("{}.png", id)),
        file_type: Some("image/png".to_string()),
        size: Some(1024),
        folder: None,
        created_at: None,
    }
}

pub fn user() -> User {
    User {
        id: "u1".to_string(),
        name: Some("Dana".to_string()),
        email: Some("dana@example.com".to_string()),
        connected_accounts: Vec::new(),
    }
}

pub fn notification(id: &str, read: bool) -> Notification {
    Notification {
        id: id.to_string(),
        title: None,
        message: format!("notification {}", id),
        read,
        kind: None,
        created_at: None,
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub posts: Mutex<Vec<Post>>,
    pub media: Mutex<Vec<Media>>,
    pub user: Mutex<Option<User>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub instagram: Mutex<InstagramConnectionStatus>,
    pub provider_statuses: Mutex<HashMap<ConnectionProvider, PlatformConnectionStatus>>,
    pub youtube: Mutex<Option<YouTubeChannel>>,
    failures: Mutex<HashMap<&'static str, Error>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    next_id: Mutex<u32>,
}

impl FakeBackend {
    /// A backend populated with a little of everything.
    pub fn seeded() -> Self {
        let backend = Self::default();
        *backend.posts.lock() = vec![
            post("p1", PostStatus::Scheduled),
            post("p2", PostStatus::Draft),
        ];
        *backend.media.lock() = vec![media("m1")];
        *backend.user.lock() = Some(user());
        *backend.notifications.lock() = vec![notification("n1", false), notification("n2", true)];
        *backend.instagram.lock() = InstagramConnectionStatus {
            connected: true,
            accounts: vec![InstagramAccount {
                id: "ig-1".to_string(),
                username: Some("brand".to_string()),
                extra: Default::default(),
            }],
            extra: Default::default(),
        };
        *backend.youtube.lock() = Some(YouTubeChannel {
            id: "UC-brand".to_string(),
            title: Some("Brand TV".to_string()),
            extra: Default::default(),
        });
        backend
    }

    /// Report `provider` as connected with one account.
    pub fn connect_provider(&self, provider: ConnectionProvider, id: &str, username: &str) {
        self.provider_statuses.lock().insert(
            provider,
            PlatformConnectionStatus {
                connected: true,
                accounts: vec![PlatformAccount {
                    id: id.to_string(),
                    username: Some(username.to_string()),
                    extra: Default::default(),
                }],
                extra: Default::default(),
            },
        );
    }

    pub fn fail(&self, endpoint: &'static str, error: Error) {
        self.failures.lock().insert(endpoint, error);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.failures.lock().remove(endpoint);
    }

    pub fn delay(&self, endpoint: &'static str, delay: Duration) {
        self.delays.lock().insert(endpoint, delay);
    }

    pub fn calls(&self, endpoint: &'static str) -> usize {
        self.calls.lock().get(endpoint).copied().unwrap_or(0)
    }

    async fn enter(&self, endpoint: &'static str) -> Result<()> {
        *self.calls.lock().entry(endpoint).or_default() += 1;
        let delay = self.delays.lock().get(endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().get(endpoint) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut next = self.next_id.lock();
        *next += 1;
        format!("{}-{}", prefix, *next)
    }

    fn media_page(&self) -> MediaPage {
        MediaPage {
            media: self.media.lock().clone(),
            ..Default::default()
        }
    }
}

fn ack() -> ApiResponse<Value> {
    ApiResponse::ok(json!({}))
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<AuthPayload>> {
        self.enter("login").await?;
        if request.password != "secret" {
            return Ok(ApiResponse::failure("Invalid credentials"));
        }
        Ok(ApiResponse::ok(AuthPayload {
            token: "token-1".to_string(),
            user: user(),
        }))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<ApiResponse<AuthPayload>> {
        self.enter("register").await?;
        let mut user = user();
        user.name = Some(request.name.clone());
        user.email = Some(request.email.clone());
        Ok(ApiResponse::ok(AuthPayload {
            token: "token-2".to_string(),
            user,
        }))
    }

    async fn current_user(&self) -> Result<ApiResponse<User>> {
        self.enter("me").await?;
        match self.user.lock().clone() {
            Some(user) => Ok(ApiResponse::ok(user)),
            None => Err(Error::Unauthorized(
                "Authentication failed. Please log in again.".to_string(),
            )),
        }
    }

    async fn logout(&self) -> Result<ApiResponse<Value>> {
        self.enter("logout").await?;
        Ok(ack())
    }

    async fn user_profile(&self) -> Result<ApiResponse<UserProfile>> {
        self.enter("user_profile").await?;
        let user = self.user.lock().clone().ok_or(Error::NotFound)?;
        Ok(ApiResponse::ok(UserProfile {
            id: user.id,
            display_name: user.name,
            email: user.email,
            extra: Default::default(),
        }))
    }

    async fn verify_password(&self, request: &VerifyPasswordRequest) -> Result<ApiResponse<Value>> {
        self.enter("verify_password").await?;
        if request.current_password != "secret" {
            return Ok(ApiResponse::failure("Current password is incorrect"));
        }
        Ok(ack())
    }

    async fn update_password(&self, request: &UpdatePasswordRequest) -> Result<ApiResponse<Value>> {
        self.enter("update_password").await?;
        if request.current_password != "secret" {
            return Ok(ApiResponse::failure("Current password is incorrect"));
        }
        Ok(ack())
    }

    async fn dashboard(&self) -> Result<ApiResponse<DashboardSummary>> {
        self.enter("dashboard").await?;
        let posts = self.posts.lock().clone();
        let upcoming: Vec<Post> = posts
            .iter()
            .filter(|p| p.status == PostStatus::Scheduled)
            .cloned()
            .collect();
        Ok(ApiResponse::ok(DashboardSummary {
            stats: Some(DashboardStats {
                total_posts: Some(posts.len() as u64),
                scheduled_posts: Some(upcoming.len() as u64),
                ..Default::default()
            }),
            upcoming_posts: upcoming,
            analytics_overview: None,
        }))
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<ApiResponse<PostList>> {
        self.enter("posts").await?;
        let posts = self
            .posts
            .lock()
            .iter()
            .filter(|p| query.status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        Ok(ApiResponse::ok(PostList {
            posts,
            pagination: None,
        }))
    }

    async fn get_post(&self, id: &str) -> Result<ApiResponse<Post>> {
        self.enter("get_post").await?;
        self.posts
            .lock()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .map(ApiResponse::ok)
            .ok_or(Error::NotFound)
    }

    async fn create_post(&self, request: &CreatePostRequest) -> Result<ApiResponse<Post>> {
        self.enter("create_post").await?;
        let mut created = post(&self.next_id("new"), PostStatus::Draft);
        created.content = request.content.clone();
        created.platforms = request.platforms.clone();
        created.scheduled_date = request.scheduled_date;
        created.status = request.status.unwrap_or(if request.scheduled_date.is_some() {
            PostStatus::Scheduled
        } else {
            PostStatus::Draft
        });
        self.posts.lock().insert(0, created.clone());
        Ok(ApiResponse::ok(created))
    }

    async fn update_post(&self, id: &str, request: &UpdatePostRequest) -> Result<ApiResponse<Post>> {
        self.enter("update_post").await?;
        let mut posts = self.posts.lock();
        let existing = posts.iter_mut().find(|p| p.id == id).ok_or(Error::NotFound)?;
        if let Some(content) = &request.content {
            existing.content = content.clone();
        }
        if let Some(status) = request.status {
            existing.status = status;
        }
        if let Some(date) = request.scheduled_date {
            existing.scheduled_date = Some(date);
        }
        Ok(ApiResponse::ok(existing.clone()))
    }

    async fn delete_post(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.enter("delete_post").await?;
        self.posts.lock().retain(|p| p.id != id);
        Ok(ack())
    }

    async fn publish_post(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.enter("publish_post").await?;
        if let Some(post) = self.posts.lock().iter_mut().find(|p| p.id == id) {
            post.status = PostStatus::Published;
        }
        Ok(ack())
    }

    async fn analytics_overview(&self) -> Result<ApiResponse<AnalyticsOverview>> {
        self.enter("analytics").await?;
        Ok(ApiResponse::ok(AnalyticsOverview {
            total_posts: Some(self.posts.lock().len() as u64),
            engagement_rate: Some(4.2),
            ..Default::default()
        }))
    }

    async fn post_analytics(&self, post_id: &str) -> Result<ApiResponse<Value>> {
        self.enter("post_analytics").await?;
        Ok(ApiResponse::ok(json!({ "postId": post_id, "likes": 12 })))
    }

    async fn scheduler_status(&self) -> Result<ApiResponse<Value>> {
        self.enter("scheduler_status").await?;
        let queued = self
            .posts
            .lock()
            .iter()
            .filter(|p| p.status == PostStatus::Scheduled)
            .count();
        Ok(ApiResponse::ok(json!({ "running": true, "queued": queued })))
    }

    async fn trigger_scheduler(&self) -> Result<ApiResponse<Value>> {
        self.enter("trigger_scheduler").await?;
        let mut processed = 0;
        for post in self.posts.lock().iter_mut() {
            if post.status == PostStatus::Scheduled {
                post.status = PostStatus::Published;
                processed += 1;
            }
        }
        Ok(ApiResponse::ok(json!({ "processed": processed })))
    }

    async fn scheduler_upcoming(&self) -> Result<ApiResponse<PostList>> {
        self.enter("scheduler_upcoming").await?;
        let posts = self
            .posts
            .lock()
            .iter()
            .filter(|p| p.status == PostStatus::Scheduled)
            .cloned()
            .collect();
        Ok(ApiResponse::ok(PostList {
            posts,
            pagination: None,
        }))
    }

    async fn instagram_connection_status(&self) -> Result<ApiResponse<InstagramConnectionStatus>> {
        self.enter("instagram_status").await?;
        Ok(ApiResponse::ok(self.instagram.lock().clone()))
    }

    async fn connect_instagram(
        &self,
        request: &ConnectInstagramRequest,
    ) -> Result<ApiResponse<InstagramConnectResponse>> {
        self.enter("connect_instagram").await?;
        Ok(ApiResponse::ok(InstagramConnectResponse {
            auth_url: Some(format!(
                "https://instagram.test/oauth?type={}",
                request.connection_type
            )),
        }))
    }

    async fn instagram_accounts(&self) -> Result<ApiResponse<Vec<InstagramAccount>>> {
        self.enter("instagram_accounts").await?;
        Ok(ApiResponse::ok(self.instagram.lock().accounts.clone()))
    }

    async fn disconnect_instagram_account(&self, account_id: &str) -> Result<ApiResponse<Value>> {
        self.enter("disconnect_instagram").await?;
        let mut status = self.instagram.lock();
        status.accounts.retain(|a| a.id != account_id);
        status.connected = !status.accounts.is_empty();
        Ok(ack())
    }

    async fn provider_status(
        &self,
        provider: ConnectionProvider,
    ) -> Result<ApiResponse<PlatformConnectionStatus>> {
        self.enter("provider_status").await?;
        let status = self.provider_statuses.lock().get(&provider).cloned();
        Ok(ApiResponse::ok(status.unwrap_or_default()))
    }

    async fn youtube_channel(&self) -> Result<ApiResponse<YouTubeChannel>> {
        self.enter("youtube_channel").await?;
        self.youtube.lock().clone().map(ApiResponse::ok).ok_or(Error::NotFound)
    }

    async fn list_media(&self, _query: &MediaQuery) -> Result<ApiResponse<MediaPage>> {
        self.enter("media").await?;
        Ok(ApiResponse::ok(self.media_page()))
    }

    async fn media_by_folder(&self, folder: &str) -> Result<ApiResponse<MediaPage>> {
        self.enter("media_folder").await?;
        let media = self
            .media
            .lock()
            .iter()
            .filter(|m| m.folder.as_deref() == Some(folder))
            .cloned()
            .collect();
        Ok(ApiResponse::ok(MediaPage {
            media,
            ..Default::default()
        }))
    }

    async fn search_media(&self, term: &str) -> Result<ApiResponse<MediaPage>> {
        self.enter("media_search").await?;
        let media = self
            .media
            .lock()
            .iter()
            .filter(|m| m.filename.as_deref().is_some_and(|f| f.contains(term)))
            .cloned()
            .collect();
        Ok(ApiResponse::ok(MediaPage {
            media,
            ..Default::default()
        }))
    }

    async fn recent_media(&self, limit: u32) -> Result<ApiResponse<MediaPage>> {
        self.enter("media_recent").await?;
        let media = self.media.lock().iter().take(limit as usize).cloned().collect();
        Ok(ApiResponse::ok(MediaPage {
            media,
            ..Default::default()
        }))
    }

    async fn media_stats(&self) -> Result<ApiResponse<Value>> {
        self.enter("media_stats").await?;
        Ok(ApiResponse::ok(json!({ "total": self.media.lock().len() })))
    }

    async fn media_folders(&self) -> Result<ApiResponse<Value>> {
        self.enter("media_folders").await?;
        Ok(ApiResponse::ok(json!(["brand", "campaign"])))
    }

    async fn upload_media(&self, files: Vec<MediaUpload>) -> Result<ApiResponse<MediaPage>> {
        self.enter("upload_media").await?;
        let uploaded: Vec<Media> = files
            .iter()
            .map(|file| {
                let mut item = media(&self.next_id("upload"));
                item.filename = Some(file.filename.clone());
                item.file_type = Some(file.content_type.clone());
                item.size = Some(file.bytes.len() as u64);
                item
            })
            .collect();
        let mut library = self.media.lock();
        for item in uploaded.iter().rev() {
            library.insert(0, item.clone());
        }
        Ok(ApiResponse::ok(MediaPage {
            media: uploaded,
            ..Default::default()
        }))
    }

    async fn delete_media(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.enter("delete_media").await?;
        self.media.lock().retain(|m| m.id != id);
        Ok(ack())
    }

    async fn notifications(&self) -> Result<ApiResponse<NotificationList>> {
        self.enter("notifications").await?;
        let notifications = self.notifications.lock().clone();
        let unread = notifications.iter().filter(|n| !n.read).count() as u64;
        Ok(ApiResponse::ok(NotificationList {
            notifications,
            unread_count: Some(unread),
        }))
    }

    async fn mark_notification_read(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.enter("mark_read").await?;
        if let Some(n) = self.notifications.lock().iter_mut().find(|n| n.id == id) {
            n.read = true;
        }
        Ok(ack())
    }

    async fn mark_all_notifications_read(&self) -> Result<ApiResponse<Value>> {
        self.enter("mark_all_read").await?;
        for n in self.notifications.lock().iter_mut() {
            n.read = true;
        }
        Ok(ack())
    }

    async fn delete_notification(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.enter("delete_notification").await?;
        self.notifications.lock().retain(|n| n.id != id);
        Ok(ack())
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<ApiResponse<GeneratedContent>> {
        self.enter("generate_content").await?;
        let content = request
            .platforms
            .iter()
            .map(|platform| {
                let draft = PlatformDraft {
                    content: Some(request.prompt.clone()),
                    character_count: Some(request.prompt.chars().count() as u64),
                    within_limit: Some(true),
                    ..Default::default()
                };
                (platform.to_string(), draft)
            })
            .collect();
        Ok(ApiResponse::ok(GeneratedContent {
            content,
            options: None,
        }))
    }

    async fn suggest_hashtags(&self, request: &HashtagRequest) -> Result<ApiResponse<HashtagSuggestions>> {
        self.enter("suggest_hashtags").await?;
        Ok(ApiResponse::ok(HashtagSuggestions {
            hashtags: vec![format!("#{}", request.content.trim()), "morning".to_string(), " ".to_string()],
        }))
    }

    async fn suggest_mentions(&self, request: &MentionRequest) -> Result<ApiResponse<MentionSuggestions>> {
        self.enter("suggest_mentions").await?;
        Ok(ApiResponse::ok(MentionSuggestions {
            mentions: vec![json!({ "handle": "@barista", "content": request.content })],
        }))
    }

    async fn optimize_content(
        &self,
        request: &OptimizeContentRequest,
    ) -> Result<ApiResponse<OptimizedContent>> {
        self.enter("optimize_content").await?;
        Ok(ApiResponse::ok(OptimizedContent {
            original: Some(request.content.clone()),
            optimized_content: Some(format!("{}!", request.content)),
            platform: Some(request.target_platform.to_string()),
            ..Default::default()
        }))
    }

    async fn analyze_content(&self, request: &AnalyzeContentRequest) -> Result<ApiResponse<Value>> {
        self.enter("analyze_content").await?;
        Ok(ApiResponse::ok(json!({
            "platform": request.platform,
            "length": request.content.chars().count(),
        })))
    }

    async fn assistant_health(&self) -> Result<ApiResponse<Value>> {
        self.enter("assistant_health").await?;
        Ok(ApiResponse::ok(json!({ "status": "ok" })))
    }

    async fn health(&self) -> Result<ApiResponse<Value>> {
        self.enter("health").await?;
        Ok(ApiResponse::ok(json!({ "status": "ok" })))
    }
}
