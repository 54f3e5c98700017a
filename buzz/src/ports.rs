#![deny(clippy::all)]

use async_trait::async_trait;
use serde_json::Value;
use shared::Result;
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

// Ports are the seams between the data layer and the outside world

/// Port for the REST backend.
///
/// Every method answers with the raw response envelope; callers decide whether
/// a missing payload is an error (`into_data`) or an empty result
/// (`into_optional`, used for 304 answers).
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    // auth
    async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<AuthPayload>>;
    async fn register(&self, request: &RegisterRequest) -> Result<ApiResponse<AuthPayload>>;
    async fn current_user(&self) -> Result<ApiResponse<User>>;
    async fn logout(&self) -> Result<ApiResponse<Value>>;

    // account settings
    async fn user_profile(&self) -> Result<ApiResponse<UserProfile>>;
    async fn verify_password(&self, request: &VerifyPasswordRequest) -> Result<ApiResponse<Value>>;
    async fn update_password(&self, request: &UpdatePasswordRequest) -> Result<ApiResponse<Value>>;

    async fn dashboard(&self) -> Result<ApiResponse<DashboardSummary>>;

    // posts
    async fn list_posts(&self, query: &PostQuery) -> Result<ApiResponse<PostList>>;
    async fn get_post(&self, id: &str) -> Result<ApiResponse<Post>>;
    async fn create_post(&self, request: &CreatePostRequest) -> Result<ApiResponse<Post>>;
    async fn update_post(&self, id: &str, request: &UpdatePostRequest) -> Result<ApiResponse<Post>>;
    async fn delete_post(&self, id: &str) -> Result<ApiResponse<Value>>;
    async fn publish_post(&self, id: &str) -> Result<ApiResponse<Value>>;

    // analytics
    async fn analytics_overview(&self) -> Result<ApiResponse<AnalyticsOverview>>;
    async fn post_analytics(&self, post_id: &str) -> Result<ApiResponse<Value>>;

    // scheduler
    async fn scheduler_status(&self) -> Result<ApiResponse<Value>>;
    async fn trigger_scheduler(&self) -> Result<ApiResponse<Value>>;
    async fn scheduler_upcoming(&self) -> Result<ApiResponse<PostList>>;

    // instagram
    async fn instagram_connection_status(&self) -> Result<ApiResponse<InstagramConnectionStatus>>;
    async fn connect_instagram(
        &self,
        request: &ConnectInstagramRequest,
    ) -> Result<ApiResponse<InstagramConnectResponse>>;
    async fn instagram_accounts(&self) -> Result<ApiResponse<Vec<InstagramAccount>>>;
    async fn disconnect_instagram_account(&self, account_id: &str) -> Result<ApiResponse<Value>>;

    // other providers
    async fn provider_status(
        &self,
        provider: ConnectionProvider,
    ) -> Result<ApiResponse<PlatformConnectionStatus>>;
    async fn youtube_channel(&self) -> Result<ApiResponse<YouTubeChannel>>;

    // media
    async fn list_media(&self, query: &MediaQuery) -> Result<ApiResponse<MediaPage>>;
    async fn media_by_folder(&self, folder: &str) -> Result<ApiResponse<MediaPage>>;
    async fn search_media(&self, term: &str) -> Result<ApiResponse<MediaPage>>;
    async fn recent_media(&self, limit: u32) -> Result<ApiResponse<MediaPage>>;
    async fn media_stats(&self) -> Result<ApiResponse<Value>>;
    async fn media_folders(&self) -> Result<ApiResponse<Value>>;
    async fn upload_media(&self, files: Vec<MediaUpload>) -> Result<ApiResponse<MediaPage>>;
    async fn delete_media(&self, id: &str) -> Result<ApiResponse<Value>>;

    // notifications
    async fn notifications(&self) -> Result<ApiResponse<NotificationList>>;
    async fn mark_notification_read(&self, id: &str) -> Result<ApiResponse<Value>>;
    async fn mark_all_notifications_read(&self) -> Result<ApiResponse<Value>>;
    async fn delete_notification(&self, id: &str) -> Result<ApiResponse<Value>>;

    // content assistant
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<ApiResponse<GeneratedContent>>;
    async fn suggest_hashtags(&self, request: &HashtagRequest) -> Result<ApiResponse<HashtagSuggestions>>;
    async fn suggest_mentions(&self, request: &MentionRequest) -> Result<ApiResponse<MentionSuggestions>>;
    async fn optimize_content(
        &self,
        request: &OptimizeContentRequest,
    ) -> Result<ApiResponse<OptimizedContent>>;
    async fn analyze_content(&self, request: &AnalyzeContentRequest) -> Result<ApiResponse<Value>>;
    async fn assistant_health(&self) -> Result<ApiResponse<Value>>;

    async fn health(&self) -> Result<ApiResponse<Value>>;
}

/// Port for the persisted login session (bearer token + cached user).
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    async fn token(&self) -> Option<String>;

    async fn user(&self) -> Option<User>;

    /// Persist a fresh login
    async fn save(&self, token: String, user: User) -> Result<()>;

    async fn set_token(&self, token: Option<String>) -> Result<()>;

    async fn set_user(&self, user: Option<User>) -> Result<()>;

    /// Forget token and user (logout or rejected session)
    async fn clear(&self) -> Result<()>;
}
