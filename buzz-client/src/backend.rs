use crate::client::ApiClient;
use async_trait::async_trait;
use buzz::Backend;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use shared::{Error, Result};
use shared_http::api::{
    AnalyticsOverview, AnalyzeContentRequest, ApiResponse, AuthPayload, ConnectInstagramRequest,
    ConnectionProvider, CreatePostRequest, DashboardSummary, GenerateContentRequest,
    GeneratedContent, HashtagRequest, HashtagSuggestions, InstagramAccount,
    InstagramConnectResponse, InstagramConnectionStatus, LoginRequest, MediaPage, MediaQuery,
    MediaUpload, MentionRequest, MentionSuggestions, NotificationList, OptimizeContentRequest,
    OptimizedContent, PlatformConnectionStatus, Post, PostList, PostQuery, RegisterRequest,
    UpdatePasswordRequest, UpdatePostRequest, User, UserProfile, VerifyPasswordRequest,
    YouTubeChannel,
};
use std::borrow::Cow;
use urlencoding::encode;

/// Ids and folder names are caller data; `/`, `?` and `#` must not change the route.
fn segment(value: &str) -> Cow<'_, str> {
    encode(value)
}

fn upload_form(files: Vec<MediaUpload>) -> Result<Form> {
    let mut form = Form::new();
    for file in files {
        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(|_| Error::Validation(format!("Unsupported content type: {}", file.content_type)))?;
        form = form.part("files", part);
    }
    Ok(form)
}

#[async_trait]
impl Backend for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<AuthPayload>> {
        self.send_json(Method::POST, "/api/auth/login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<ApiResponse<AuthPayload>> {
        self.send_json(Method::POST, "/api/auth/register", request).await
    }

    async fn current_user(&self) -> Result<ApiResponse<User>> {
        self.get("/api/auth/me").await
    }

    async fn logout(&self) -> Result<ApiResponse<Value>> {
        self.send_empty(Method::POST, "/api/auth/logout").await
    }

    async fn user_profile(&self) -> Result<ApiResponse<UserProfile>> {
        self.get("/api/users/profile").await
    }

    async fn verify_password(&self, request: &VerifyPasswordRequest) -> Result<ApiResponse<Value>> {
        self.send_json(Method::POST, "/api/users/verify-password", request)
            .await
    }

    async fn update_password(&self, request: &UpdatePasswordRequest) -> Result<ApiResponse<Value>> {
        self.send_json(Method::PUT, "/api/users/update-password", request)
            .await
    }

    async fn dashboard(&self) -> Result<ApiResponse<DashboardSummary>> {
        self.get("/api/dashboard").await
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<ApiResponse<PostList>> {
        self.get_with_query("/api/posts", &query.to_pairs()).await
    }

    async fn get_post(&self, id: &str) -> Result<ApiResponse<Post>> {
        self.get(&format!("/api/posts/{}", segment(id))).await
    }

    async fn create_post(&self, request: &CreatePostRequest) -> Result<ApiResponse<Post>> {
        self.send_json(Method::POST, "/api/posts", request).await
    }

    async fn update_post(&self, id: &str, request: &UpdatePostRequest) -> Result<ApiResponse<Post>> {
        self.send_json(Method::PUT, &format!("/api/posts/{}", segment(id)), request)
            .await
    }

    async fn delete_post(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.send_empty(Method::DELETE, &format!("/api/posts/{}", segment(id)))
            .await
    }

    async fn publish_post(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.send_empty(Method::POST, &format!("/api/posts/{}/publish", segment(id)))
            .await
    }

    async fn analytics_overview(&self) -> Result<ApiResponse<AnalyticsOverview>> {
        self.get("/api/analytics/overview").await
    }

    async fn post_analytics(&self, post_id: &str) -> Result<ApiResponse<Value>> {
        self.get(&format!("/api/analytics/posts/{}", segment(post_id)))
            .await
    }

    async fn scheduler_status(&self) -> Result<ApiResponse<Value>> {
        self.get("/api/scheduler/status").await
    }

    async fn trigger_scheduler(&self) -> Result<ApiResponse<Value>> {
        self.send_empty(Method::POST, "/api/scheduler/trigger").await
    }

    async fn scheduler_upcoming(&self) -> Result<ApiResponse<PostList>> {
        self.get("/api/scheduler/upcoming").await
    }

    async fn instagram_connection_status(&self) -> Result<ApiResponse<InstagramConnectionStatus>> {
        self.get("/api/auth/instagram/connection-status").await
    }

    async fn connect_instagram(
        &self,
        request: &ConnectInstagramRequest,
    ) -> Result<ApiResponse<InstagramConnectResponse>> {
        self.send_json(Method::POST, "/api/auth/instagram/connect", request)
            .await
    }

    async fn instagram_accounts(&self) -> Result<ApiResponse<Vec<InstagramAccount>>> {
        self.get("/api/auth/instagram/accounts").await
    }

    async fn disconnect_instagram_account(&self, account_id: &str) -> Result<ApiResponse<Value>> {
        self.send_empty(
            Method::DELETE,
            &format!("/api/auth/instagram/accounts/{}", segment(account_id)),
        )
        .await
    }

    async fn provider_status(
        &self,
        provider: ConnectionProvider,
    ) -> Result<ApiResponse<PlatformConnectionStatus>> {
        self.get(&format!("/api/auth/{}/status", provider.slug()))
            .await
    }

    async fn youtube_channel(&self) -> Result<ApiResponse<YouTubeChannel>> {
        self.get("/api/auth/youtube/channel").await
    }

    async fn list_media(&self, query: &MediaQuery) -> Result<ApiResponse<MediaPage>> {
        self.get_with_query("/api/media", &query.to_pairs()).await
    }

    async fn media_by_folder(&self, folder: &str) -> Result<ApiResponse<MediaPage>> {
        self.get(&format!("/api/media/folders/{}", segment(folder)))
            .await
    }

    async fn search_media(&self, term: &str) -> Result<ApiResponse<MediaPage>> {
        self.get_with_query("/api/media/search", &[("q", term.to_string())])
            .await
    }

    async fn recent_media(&self, limit: u32) -> Result<ApiResponse<MediaPage>> {
        self.get_with_query("/api/media/recent", &[("limit", limit.to_string())])
            .await
    }

    async fn media_stats(&self) -> Result<ApiResponse<Value>> {
        self.get("/api/media/stats").await
    }

    async fn media_folders(&self) -> Result<ApiResponse<Value>> {
        self.get("/api/media/folders").await
    }

    async fn upload_media(&self, files: Vec<MediaUpload>) -> Result<ApiResponse<MediaPage>> {
        let form = upload_form(files)?;
        self.send_multipart("/api/media/upload", form).await
    }

    async fn delete_media(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.send_empty(Method::DELETE, &format!("/api/media/{}", segment(id)))
            .await
    }

    async fn notifications(&self) -> Result<ApiResponse<NotificationList>> {
        self.get("/api/notifications").await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.send_empty(Method::PATCH, &format!("/api/notifications/{}/read", segment(id)))
            .await
    }

    async fn mark_all_notifications_read(&self) -> Result<ApiResponse<Value>> {
        self.send_empty(Method::PATCH, "/api/notifications/read-all")
            .await
    }

    async fn delete_notification(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.send_empty(Method::DELETE, &format!("/api/notifications/{}", segment(id)))
            .await
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<ApiResponse<GeneratedContent>> {
        self.send_json(Method::POST, "/api/ai/generate-content", request)
            .await
    }

    async fn suggest_hashtags(&self, request: &HashtagRequest) -> Result<ApiResponse<HashtagSuggestions>> {
        self.send_json(Method::POST, "/api/ai/suggest-hashtags", request)
            .await
    }

    async fn suggest_mentions(&self, request: &MentionRequest) -> Result<ApiResponse<MentionSuggestions>> {
        self.send_json(Method::POST, "/api/ai/suggest-mentions", request)
            .await
    }

    async fn optimize_content(
        &self,
        request: &OptimizeContentRequest,
    ) -> Result<ApiResponse<OptimizedContent>> {
        self.send_json(Method::POST, "/api/ai/optimize-content", request)
            .await
    }

    async fn analyze_content(&self, request: &AnalyzeContentRequest) -> Result<ApiResponse<Value>> {
        self.send_json(Method::POST, "/api/ai/analyze-content", request)
            .await
    }

    async fn assistant_health(&self) -> Result<ApiResponse<Value>> {
        self.get("/api/ai/health").await
    }

    async fn health(&self) -> Result<ApiResponse<Value>> {
        self.get("/health").await
    }
}
