use crate::cache_keys::CacheKey;
use crate::ports::Backend;
use crate::query::QueryClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{Error, Result};
use shared_http::api::{
    ConnectionProvider, InstagramConnectionStatus, Platform, PlatformAccount,
    PlatformConnectionStatus, User, YouTubeChannel,
};
use std::sync::Arc;
use tracing::warn;

/// Static publishing rules for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    pub platform: Platform,
    pub name: &'static str,
    pub color: &'static str,
    pub content_limit: usize,
    pub supported_media: &'static [&'static str],
    pub has_hashtags: bool,
    pub has_mentions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_limit: Option<usize>,
}

pub static PLATFORM_CONFIGS: [PlatformConfig; 5] = [
    PlatformConfig {
        platform: Platform::Instagram,
        name: "Instagram",
        color: "#E4405F",
        content_limit: 2200,
        supported_media: &["image", "video", "carousel"],
        has_hashtags: true,
        has_mentions: true,
        image_limit: None,
        video_limit: None,
    },
    PlatformConfig {
        platform: Platform::Facebook,
        name: "Facebook",
        color: "#1877F2",
        content_limit: 63206,
        supported_media: &["image", "video", "carousel", "link"],
        has_hashtags: true,
        has_mentions: true,
        image_limit: None,
        video_limit: None,
    },
    PlatformConfig {
        platform: Platform::Twitter,
        name: "Twitter",
        color: "#000000",
        content_limit: 280,
        supported_media: &["image", "video", "gif"],
        has_hashtags: true,
        has_mentions: true,
        image_limit: None,
        video_limit: None,
    },
    PlatformConfig {
        platform: Platform::Linkedin,
        name: "LinkedIn",
        color: "#0A66C2",
        content_limit: 3000,
        supported_media: &["image", "video", "document"],
        has_hashtags: true,
        has_mentions: false,
        // one image per post through the API
        image_limit: Some(1),
        video_limit: None,
    },
    PlatformConfig {
        platform: Platform::Youtube,
        name: "YouTube",
        color: "#FF0000",
        content_limit: 5000,
        supported_media: &["video", "thumbnail"],
        has_hashtags: true,
        has_mentions: false,
        image_limit: None,
        video_limit: Some(1),
    },
];

impl PlatformConfig {
    pub fn for_platform(platform: Platform) -> Option<&'static PlatformConfig> {
        PLATFORM_CONFIGS.iter().find(|c| c.platform == platform)
    }

    pub fn supports(&self, media_kind: &str) -> bool {
        self.supported_media.contains(&media_kind)
    }
}

/// Check post content against the limits of every targeted platform.
pub fn validate_content(content: &str, platforms: &[Platform]) -> Result<()> {
    let length = content.chars().count();
    for platform in platforms {
        let Some(config) = PlatformConfig::for_platform(*platform) else {
            continue;
        };
        if length > config.content_limit {
            return Err(Error::Validation(format!(
                "{} posts are limited to {} characters ({} given)",
                config.name, config.content_limit, length
            )));
        }
    }
    Ok(())
}

/// A platform's static config merged with the user's connection for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    #[serde(flatten)]
    pub config: PlatformConfig,
    pub connected: bool,
    pub username: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    /// Accounts reported by the platform's own status endpoints.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<PlatformAccount>,
}

impl PlatformStatus {
    /// One entry per known platform, in catalog order.
    pub fn merge(user: Option<&User>) -> Vec<PlatformStatus> {
        Self::merge_with(user, &[])
    }

    /// Like [`merge`](Self::merge), adding the accounts each provider reports.
    /// A platform counts as connected when either source says so.
    pub fn merge_with(
        user: Option<&User>,
        reported: &[(Platform, PlatformConnectionStatus)],
    ) -> Vec<PlatformStatus> {
        let linked = user.map(|u| u.connected_accounts.as_slice()).unwrap_or_default();
        PLATFORM_CONFIGS
            .iter()
            .map(|config| {
                let account = linked.iter().find(|a| a.platform == config.platform);
                let statuses = reported.iter().filter(|(p, _)| *p == config.platform);

                let mut accounts: Vec<PlatformAccount> = Vec::new();
                let mut provider_connected = false;
                for (_, status) in statuses {
                    provider_connected |= status.connected;
                    for reported in &status.accounts {
                        if !accounts.iter().any(|a| a.id == reported.id) {
                            accounts.push(reported.clone());
                        }
                    }
                }

                PlatformStatus {
                    config: *config,
                    connected: account.is_some() || provider_connected,
                    username: account
                        .and_then(|a| a.username.clone())
                        .or_else(|| accounts.first().and_then(|a| a.username.clone())),
                    connected_at: account.and_then(|a| a.connected_at),
                    accounts,
                }
            })
            .collect()
    }
}

/// Which platforms the current user has connected.
///
/// Combines the user's `connectedAccounts` with the Instagram and provider
/// status endpoints. A failing status endpoint only drops its own platform's
/// accounts.
pub struct ConnectedPlatforms {
    backend: Arc<dyn Backend>,
    queries: QueryClient,
}

impl ConnectedPlatforms {
    pub fn new(backend: Arc<dyn Backend>, queries: QueryClient) -> Self {
        Self { backend, queries }
    }

    pub async fn fetch(&self) -> Result<Vec<PlatformStatus>> {
        let backend = Arc::clone(&self.backend);
        let user: User = self
            .queries
            .fetch(CacheKey::CurrentUser, || async move {
                backend.current_user().await?.into_data()
            })
            .await
            .map_err(|e| e.or_context("Failed to fetch connected platforms"))?;

        let (instagram, linkedin, linkedin_business, youtube, twitter) = tokio::join!(
            self.instagram_status(),
            self.provider_status(ConnectionProvider::Linkedin),
            self.provider_status(ConnectionProvider::LinkedinBusiness),
            self.youtube_status(),
            self.provider_status(ConnectionProvider::Twitter),
        );

        let reported: Vec<(Platform, PlatformConnectionStatus)> = [
            (Platform::Instagram, instagram),
            (Platform::Linkedin, linkedin),
            (Platform::Linkedin, linkedin_business),
            (Platform::Youtube, youtube),
            (Platform::Twitter, twitter),
        ]
        .into_iter()
        .filter_map(|(platform, status)| match status {
            Ok(status) => Some((platform, status)),
            Err(e) => {
                warn!("Could not read {} connection status: {}", platform, e);
                None
            }
        })
        .collect();

        Ok(PlatformStatus::merge_with(Some(&user), &reported))
    }

    /// Drop every cached connection status and fetch again.
    pub async fn refetch(&self) -> Result<Vec<PlatformStatus>> {
        let mut keys = vec![
            CacheKey::CurrentUser,
            CacheKey::InstagramStatus,
            CacheKey::YouTubeChannel,
        ];
        keys.extend(ConnectionProvider::ALL.into_iter().map(CacheKey::ProviderStatus));
        self.queries.invalidate_all(&keys).await;
        self.fetch().await
    }

    pub async fn connected(&self) -> Result<Vec<PlatformStatus>> {
        Ok(self.fetch().await?.into_iter().filter(|p| p.connected).collect())
    }

    pub async fn disconnected(&self) -> Result<Vec<PlatformStatus>> {
        Ok(self.fetch().await?.into_iter().filter(|p| !p.connected).collect())
    }

    pub async fn is_connected(&self, platform: Platform) -> Result<bool> {
        Ok(self
            .fetch()
            .await?
            .iter()
            .any(|p| p.config.platform == platform && p.connected))
    }

    async fn instagram_status(&self) -> Result<PlatformConnectionStatus> {
        let backend = Arc::clone(&self.backend);
        let status: InstagramConnectionStatus = self
            .queries
            .fetch(CacheKey::InstagramStatus, || async move {
                Ok(backend
                    .instagram_connection_status()
                    .await?
                    .into_optional()?
                    .unwrap_or_default())
            })
            .await?;
        Ok(PlatformConnectionStatus {
            connected: status.connected,
            accounts: status.accounts.into_iter().map(PlatformAccount::from).collect(),
            extra: status.extra,
        })
    }

    async fn provider_status(&self, provider: ConnectionProvider) -> Result<PlatformConnectionStatus> {
        let backend = Arc::clone(&self.backend);
        self.queries
            .fetch(CacheKey::ProviderStatus(provider), || async move {
                Ok(backend
                    .provider_status(provider)
                    .await?
                    .into_optional()?
                    .unwrap_or_default())
            })
            .await
    }

    /// The YouTube status, with the connected channel added as an account.
    async fn youtube_status(&self) -> Result<PlatformConnectionStatus> {
        let mut status = self.provider_status(ConnectionProvider::Youtube).await?;
        if !status.connected {
            return Ok(status);
        }

        let backend = Arc::clone(&self.backend);
        let channel: Option<YouTubeChannel> = self
            .queries
            .fetch(CacheKey::YouTubeChannel, || async move {
                backend.youtube_channel().await?.into_optional()
            })
            .await?;
        if let Some(channel) = channel {
            if !status.accounts.iter().any(|a| a.id == channel.id) {
                status.accounts.push(channel.into());
            }
        }
        Ok(status)
    }
}
