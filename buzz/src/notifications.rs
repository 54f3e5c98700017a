use crate::ports::{Backend, SessionRepository};
use crate::query::{RequestGuard, ResourceState, StateCell};
use shared::Result;
use shared_http::api::{Notification, NotificationList};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The notification inbox.
///
/// Read/delete actions patch the local list whether or not the server call
/// succeeds; the error, if any, is still returned to the caller.
pub struct NotificationStore {
    backend: Arc<dyn Backend>,
    state: StateCell<NotificationList>,
    guard: RequestGuard,
}

impl NotificationStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: StateCell::new(),
            guard: RequestGuard::new(),
        }
    }

    pub fn state(&self) -> ResourceState<NotificationList> {
        self.state.snapshot()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state
            .data()
            .map(|list| list.notifications)
            .unwrap_or_default()
    }

    /// Server-reported unread count, else the number of unread entries held.
    pub fn unread_count(&self) -> u64 {
        self.state
            .data()
            .map(|list| {
                list.unread_count
                    .unwrap_or_else(|| list.notifications.iter().filter(|n| !n.read).count() as u64)
            })
            .unwrap_or(0)
    }

    /// Reload the inbox. On failure the list is emptied and the error kept.
    pub async fn load(&self) -> Result<NotificationList> {
        let ticket = self.guard.begin();
        self.state.start();

        let result = self
            .guard
            .run(async {
                Ok(self
                    .backend
                    .notifications()
                    .await?
                    .into_optional()?
                    .unwrap_or_default())
            })
            .await
            .map_err(|e| e.or_context("Failed to load notifications"));

        if let Err(e) = &result {
            if self.guard.is_current(ticket) {
                warn!("Failed to load notifications: {}", e);
                self.state.patch(|list| *list = Some(NotificationList::default()));
            }
        }
        self.state.settle(&self.guard, ticket, result)
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let result = self
            .backend
            .mark_notification_read(id)
            .await
            .and_then(|r| r.into_optional());

        self.guard.supersede();
        self.state.patch(|list| {
            let Some(list) = list else { return };
            let mut newly_read = 0;
            for n in list.notifications.iter_mut().filter(|n| n.id == id && !n.read) {
                n.read = true;
                newly_read += 1;
            }
            if let Some(count) = list.unread_count.as_mut() {
                *count = count.saturating_sub(newly_read);
            }
        });

        result.map(|_| ()).inspect_err(|e| {
            warn!("Failed to mark notification {} as read: {}", id, e);
        })
    }

    pub async fn mark_all_read(&self) -> Result<()> {
        let result = self
            .backend
            .mark_all_notifications_read()
            .await
            .and_then(|r| r.into_optional());

        self.guard.supersede();
        self.state.patch(|list| {
            let Some(list) = list else { return };
            for n in list.notifications.iter_mut() {
                n.read = true;
            }
            list.unread_count = Some(0);
        });

        result.map(|_| ()).inspect_err(|e| {
            warn!("Failed to mark all notifications as read: {}", e);
        })
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = self
            .backend
            .delete_notification(id)
            .await
            .and_then(|r| r.into_optional());

        self.guard.supersede();
        self.state.patch(|list| {
            let Some(list) = list else { return };
            let was_unread = list.notifications.iter().any(|n| n.id == id && !n.read);
            list.notifications.retain(|n| n.id != id);
            if was_unread {
                if let Some(count) = list.unread_count.as_mut() {
                    *count = count.saturating_sub(1);
                }
            }
        });

        result.map(|_| ()).inspect_err(|e| {
            warn!("Failed to delete notification {}: {}", id, e);
        })
    }

    pub fn shutdown(&self) {
        self.guard.shutdown();
    }
}

/// Period used when a poller is given a zero interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Reloads a [`NotificationStore`] on a fixed period until cancelled.
pub struct NotificationPoller {
    store: Arc<NotificationStore>,
    session: Arc<dyn SessionRepository>,
    interval: Duration,
    cancel: CancellationToken,
}

impl NotificationPoller {
    pub fn new(
        store: Arc<NotificationStore>,
        session: Arc<dyn SessionRepository>,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            warn!("Notification poll interval must be positive, using {:?}", DEFAULT_POLL_INTERVAL);
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        Self {
            store,
            session,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the poll loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll immediately, then once per interval. Ticks without a session
    /// token are skipped.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Polling notifications every {:?}", self.interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Notification polling stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if self.session.token().await.is_none() {
                        debug!("No token available for notifications");
                        continue;
                    }
                    match self.store.load().await {
                        Ok(list) => debug!(
                            "Loaded {} notification(s), {} unread",
                            list.notifications.len(),
                            self.store.unread_count()
                        ),
                        Err(e) => debug!("Notification poll failed: {}", e),
                    }
                }
            }
        }
    }
}
