use crate::cache_keys::CacheKey;
use crate::ports::{Backend, SessionRepository};
use crate::query::{QueryClient, RequestGuard, ResourceState, StateCell};
use shared::{Error, Result};
use shared_http::api::{
    AuthPayload, LoginRequest, RegisterRequest, UpdatePasswordRequest, User, UserProfile,
    VerifyPasswordRequest,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The signed-in user and the session that backs it.
pub struct UserResource {
    backend: Arc<dyn Backend>,
    queries: QueryClient,
    session: Arc<dyn SessionRepository>,
    state: StateCell<User>,
    guard: RequestGuard,
}

impl UserResource {
    pub fn new(
        backend: Arc<dyn Backend>,
        queries: QueryClient,
        session: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            backend,
            queries,
            session,
            state: StateCell::new(),
            guard: RequestGuard::new(),
        }
    }

    pub fn state(&self) -> ResourceState<User> {
        self.state.snapshot()
    }

    pub fn user(&self) -> Option<User> {
        self.state.data()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.token().await.is_some()
    }

    /// Seed the state from the persisted session without a request.
    pub async fn restore(&self) -> Option<User> {
        self.session.token().await?;
        let user = self.session.user().await?;
        self.state.load(user.clone());
        Some(user)
    }

    /// Load the current user. Success is persisted into the session; any
    /// failure is treated as a rejected session and clears it.
    pub async fn fetch(&self) -> Result<User> {
        let ticket = self.guard.begin();
        self.state.start();

        let backend = Arc::clone(&self.backend);
        let result = self
            .guard
            .run(self.queries.fetch_if(
                CacheKey::CurrentUser,
                || async move { backend.current_user().await?.into_data() },
                || self.guard.is_current(ticket),
            ))
            .await
            .map_err(|e| e.or_context("Failed to fetch user data"));

        match self.state.settle(&self.guard, ticket, result) {
            Ok(user) => {
                self.session.set_user(Some(user.clone())).await?;
                Ok(user)
            }
            Err(e @ (Error::Cancelled | Error::Superseded)) => Err(e),
            // A newer fetch decides what happens to the session
            Err(e) if self.guard.is_outdated(ticket) => Err(e),
            Err(e) => {
                warn!("Clearing session after failed user fetch: {}", e);
                self.session.clear().await?;
                self.queries.invalidate(&CacheKey::CurrentUser).await;
                Err(e)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let payload = self
            .guard
            .run(async { self.backend.login(&request).await?.into_data() })
            .await
            .map_err(|e| {
                let e = e.or_context("Login failed");
                error!("Login failed for {}: {}", email, e);
                e
            })?;
        self.start_session(payload).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let payload = self
            .guard
            .run(async { self.backend.register(&request).await?.into_data() })
            .await
            .map_err(|e| {
                let e = e.or_context("Registration failed");
                error!("Registration failed for {}: {}", email, e);
                e
            })?;
        self.start_session(payload).await
    }

    /// End the session locally; the server call is best effort.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.backend.logout().await.and_then(|r| r.into_optional()) {
            warn!("Logout request failed, clearing local session anyway: {}", e);
        }

        self.guard.supersede();
        self.session.clear().await?;
        self.queries.clear().await;
        self.state.reset();
        info!("Logged out");
        Ok(())
    }

    /// Account settings profile, cached separately from the session user.
    pub async fn profile(&self) -> Result<UserProfile> {
        let backend = Arc::clone(&self.backend);
        self.queries
            .fetch(CacheKey::UserProfile, || async move {
                backend.user_profile().await?.into_data()
            })
            .await
            .map_err(|e| e.or_context("Failed to fetch profile"))
    }

    /// Whether the server accepts `current` as the account password.
    pub async fn verify_password(&self, current: &str) -> Result<bool> {
        if current.trim().is_empty() {
            return Err(Error::Validation("Please enter your current password".to_string()));
        }
        let request = VerifyPasswordRequest {
            current_password: current.to_string(),
        };
        let response = self
            .guard
            .run(async { self.backend.verify_password(&request).await })
            .await
            .map_err(|e| e.or_context("Failed to verify password"))?;
        Ok(response.success)
    }

    pub async fn update_password(&self, current: &str, new: &str, confirm: &str) -> Result<()> {
        if current.trim().is_empty() {
            return Err(Error::Validation("Please enter your current password".to_string()));
        }
        if new.is_empty() || confirm.is_empty() {
            return Err(Error::Validation("Please fill in both password fields".to_string()));
        }
        if new.chars().count() < 6 {
            return Err(Error::Validation(
                "New password must be at least 6 characters long".to_string(),
            ));
        }
        if new != confirm {
            return Err(Error::Validation("New passwords do not match".to_string()));
        }

        let request = UpdatePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
        };
        self.guard
            .run(async { self.backend.update_password(&request).await?.into_optional() })
            .await
            .map_err(|e| {
                let e = e.or_context("Failed to update password");
                error!("Password update failed: {}", e);
                e
            })?;
        info!("Password updated");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.guard.shutdown();
    }

    async fn start_session(&self, payload: AuthPayload) -> Result<User> {
        let AuthPayload { token, user } = payload;

        // Cached responses belong to whoever was signed in before
        self.queries.clear().await;
        self.session.save(token, user.clone()).await?;
        self.queries.store(CacheKey::CurrentUser, &user).await?;

        self.guard.supersede();
        self.state.load(user.clone());
        info!("Signed in as {}", user.email.as_deref().unwrap_or(&user.id));
        Ok(user)
    }
}
