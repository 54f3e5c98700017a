use crate::errors::{normalize_error, unparseable_body};
use buzz::SessionRepository;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::config::{Config, normalize_base_url};
use shared::{Error, Result};
use shared_http::api::ApiResponse;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

const NGROK_HEADER: &str = "ngrok-skip-browser-warning";

/// Join `endpoint` onto `base` with exactly one slash, without doubling an
/// `/api` prefix the base already ends with.
pub fn build_url(base: &str, endpoint: &str) -> String {
    let base = base.trim_end_matches('/');
    let mut endpoint = if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{}", endpoint)
    };

    if base.ends_with("/api") && endpoint.starts_with("/api/") {
        endpoint = endpoint["/api".len()..].to_string();
    }
    format!("{}{}", base, endpoint)
}

/// Responses from these endpoints are polled often; their bodies stay out of the log.
fn is_quiet(endpoint: &str) -> bool {
    endpoint.contains("/status") || endpoint.contains("/health")
}

/// reqwest client for the BuzzConnect REST API.
///
/// Attaches the session's bearer token to every request and turns non-2xx
/// answers into typed [`Error`]s.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionRepository>,
    timeout: Option<Duration>,
    ngrok: bool,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("ngrok", &self.ngrok)
            .finish()
    }
}

impl ApiClient {
    pub fn new(config: &Config, session: Arc<dyn SessionRepository>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;

        let base_url = normalize_base_url(&config.api_base_url);
        debug!("ApiClient initialized with base URL {}", base_url);
        Ok(Self {
            client,
            base_url,
            session,
            timeout: config.request_timeout,
            ngrok: config.is_ngrok(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: &str) -> String {
        build_url(&self.base_url, endpoint)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<ApiResponse<T>> {
        let request = self.prepare(Method::GET, endpoint).await;
        self.execute(endpoint, request).await
    }

    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>> {
        let request = self.prepare(Method::GET, endpoint).await.query(query);
        self.execute(endpoint, request).await
    }

    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.prepare(method, endpoint).await.json(body);
        self.execute(endpoint, request).await
    }

    /// A request without a body (DELETE, bodiless POST/PATCH).
    pub(crate) async fn send_empty<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<ApiResponse<T>> {
        let request = self.prepare(method, endpoint).await;
        self.execute(endpoint, request).await
    }

    pub(crate) async fn send_multipart<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: reqwest::multipart::Form,
    ) -> Result<ApiResponse<T>> {
        let request = self.prepare(Method::POST, endpoint).await.multipart(form);
        self.execute(endpoint, request).await
    }

    async fn prepare(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = self.url(endpoint);
        debug!("API request: {} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(token) = self.session.token().await {
            request = request.bearer_auth(token);
        }
        if self.ngrok {
            request = request.header(NGROK_HEADER, "true");
        }
        request
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>> {
        let response = request.send().await.map_err(|e| self.transport_error(endpoint, e))?;
        let status = response.status();
        debug!("API response: {} {}", endpoint, status);

        if status == StatusCode::NOT_MODIFIED {
            return Ok(ApiResponse::not_modified());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited on {}", endpoint);
            return Err(Error::RateLimited);
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;
        if status.is_success() && text.trim().is_empty() {
            debug!("Empty {} response from {}", status, endpoint);
            return Ok(ApiResponse::no_content());
        }

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => {
                if !is_quiet(endpoint) {
                    trace!("API response data from {}: {}", endpoint, text);
                }
                body
            }
            Err(e) => {
                warn!("Unparseable response from {} ({}): {}", endpoint, status, e);
                unparseable_body(status.as_u16())
            }
        };

        if !status.is_success() {
            let err = normalize_error(status.as_u16(), endpoint, &body);
            error!("API error from {}: {} ({})", endpoint, err, status);
            return Err(err);
        }

        serde_json::from_value(body).map_err(|e| {
            error!("Unexpected response shape from {}: {}", endpoint, e);
            Error::Decode(e.to_string())
        })
    }

    fn transport_error(&self, endpoint: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            let millis = self.timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
            warn!("Request to {} timed out after {} ms", endpoint, millis);
            return Error::Timeout(millis);
        }
        if e.is_decode() {
            return Error::Decode(e.to_string());
        }
        error!("API request to {} failed: {}", endpoint, e);
        Error::Connection(format!(
            "Unable to connect to server. Please check if the backend is running at {}",
            self.base_url
        ))
    }
}
