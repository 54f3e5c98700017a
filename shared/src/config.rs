use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Client configuration, read from `BUZZ_*` environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub cache_ttl: Duration,
    pub dashboard_ttl: Duration,
    pub notification_poll_interval: Duration,
    pub request_timeout: Option<Duration>,
    pub data_dir: PathBuf,
    pub watch_notifications: bool,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Config {
    const DEFAULT_API_URL: &'static str = "https://mgabuzzconnect.com";
    const DEFAULT_CACHE_TTL_MS: u64 = 30_000;
    const DEFAULT_POLL_MS: u64 = 30_000;
    const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("BUZZ_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_API_URL.to_string());

        let timeout_ms = millis(&lookup, "BUZZ_REQUEST_TIMEOUT_MS", Self::DEFAULT_TIMEOUT_MS);

        let data_dir = lookup("BUZZ_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = lookup("HOME")
                    .or_else(|| lookup("USERPROFILE"))
                    .unwrap_or_else(|| ".".to_string());
                PathBuf::from(home).join(".buzz")
            });

        Self {
            api_base_url: normalize_base_url(&api_base_url),
            api_token: lookup("BUZZ_API_TOKEN").filter(|t| !t.is_empty()),
            cache_ttl: Duration::from_millis(millis(
                &lookup,
                "BUZZ_CACHE_TTL_MS",
                Self::DEFAULT_CACHE_TTL_MS,
            )),
            dashboard_ttl: Duration::from_millis(millis(
                &lookup,
                "BUZZ_DASHBOARD_TTL_MS",
                Self::DEFAULT_CACHE_TTL_MS,
            )),
            notification_poll_interval: Duration::from_millis(positive_millis(
                &lookup,
                "BUZZ_NOTIFICATION_POLL_MS",
                Self::DEFAULT_POLL_MS,
            )),
            request_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            data_dir,
            watch_notifications: lookup("BUZZ_WATCH_NOTIFICATIONS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            email: lookup("BUZZ_EMAIL").filter(|v| !v.is_empty()),
            password: lookup("BUZZ_PASSWORD").filter(|v| !v.is_empty()),
        }
    }

    /// Tunnels served through ngrok need an extra header to skip the browser warning page.
    pub fn is_ngrok(&self) -> bool {
        self.api_base_url.to_ascii_lowercase().contains("ngrok")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Strip trailing slashes so endpoints can always be appended with a leading `/`.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn millis<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

/// Like [`millis`], but zero also falls back to the default.
fn positive_millis<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match millis(lookup, key, default) {
        0 => {
            warn!("{} must be greater than zero, using default {}", key, default);
            default
        }
        value => value,
    }
}
