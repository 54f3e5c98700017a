use crate::cache_keys::CacheKey;
use crate::ports::Backend;
use crate::query::{QueryClient, RequestGuard, ResourceState, StateCell};
use shared::{Error, Result};
use shared_http::api::{ConnectInstagramRequest, InstagramAccount, InstagramConnectionStatus};
use std::sync::Arc;
use tracing::{error, info};

/// Instagram connection status and account management.
pub struct InstagramResource {
    backend: Arc<dyn Backend>,
    queries: QueryClient,
    state: StateCell<InstagramConnectionStatus>,
    guard: RequestGuard,
}

impl InstagramResource {
    pub fn new(backend: Arc<dyn Backend>, queries: QueryClient) -> Self {
        Self {
            backend,
            queries,
            state: StateCell::new(),
            guard: RequestGuard::new(),
        }
    }

    pub fn state(&self) -> ResourceState<InstagramConnectionStatus> {
        self.state.snapshot()
    }

    pub fn status(&self) -> Option<InstagramConnectionStatus> {
        self.state.data()
    }

    pub async fn fetch(&self) -> Result<InstagramConnectionStatus> {
        let ticket = self.guard.begin();
        self.state.start();

        let backend = Arc::clone(&self.backend);
        let result = self
            .guard
            .run(self.queries.fetch_if(
                CacheKey::InstagramStatus,
                || async move { backend.instagram_connection_status().await?.into_data() },
                || self.guard.is_current(ticket),
            ))
            .await
            .map_err(|e| e.or_context("Failed to fetch Instagram status"));

        self.state.settle(&self.guard, ticket, result)
    }

    pub async fn refetch(&self) -> Result<InstagramConnectionStatus> {
        self.queries.invalidate(&CacheKey::InstagramStatus).await;
        self.fetch().await
    }

    /// Start the OAuth flow; returns the URL the user has to visit, if any.
    pub async fn connect(&self, connection_type: Option<&str>) -> Result<Option<String>> {
        let request = match connection_type {
            Some(kind) => ConnectInstagramRequest {
                connection_type: kind.to_string(),
            },
            None => ConnectInstagramRequest::default(),
        };

        let response = self
            .backend
            .connect_instagram(&request)
            .await
            .and_then(|r| r.into_optional())
            .map_err(|e| {
                let e = e.or_context("Failed to connect Instagram");
                error!("Failed to connect Instagram: {}", e);
                e
            })?;

        Ok(response.and_then(|r| r.auth_url))
    }

    pub async fn accounts(&self) -> Result<Vec<InstagramAccount>> {
        let accounts = self
            .backend
            .instagram_accounts()
            .await?
            .into_optional()
            .map_err(|e| e.or_context("Failed to fetch Instagram accounts"))?;
        Ok(accounts.unwrap_or_default())
    }

    /// Disconnect one account, then reload the status.
    pub async fn disconnect(&self, account_id: &str) -> Result<InstagramConnectionStatus> {
        if account_id.trim().is_empty() {
            return Err(Error::Validation(
                "Account ID is required to disconnect Instagram".to_string(),
            ));
        }

        self.backend
            .disconnect_instagram_account(account_id)
            .await
            .and_then(|r| r.into_optional())
            .map_err(|e| {
                let e = e.or_context("Failed to disconnect Instagram");
                error!("Failed to disconnect Instagram account {}: {}", account_id, e);
                e
            })?;

        info!("Disconnected Instagram account {}", account_id);
        self.queries
            .invalidate_all(&[CacheKey::InstagramStatus, CacheKey::Dashboard])
            .await;
        self.fetch().await
    }

    pub fn shutdown(&self) {
        self.guard.shutdown();
    }
}
