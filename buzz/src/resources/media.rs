use crate::cache_keys::CacheKey;
use crate::ports::Backend;
use crate::query::{QueryClient, RequestGuard, ResourceState, StateCell};
use serde_json::Value;
use shared::{Error, Result};
use shared_http::api::{Media, MediaPage, MediaQuery, MediaUpload};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Searches shorter than this resolve to an empty page without a request.
pub const MIN_SEARCH_LEN: usize = 2;

pub async fn load_media(backend: &dyn Backend, query: &MediaQuery) -> Result<MediaPage> {
    Ok(backend.list_media(query).await?.into_optional()?.unwrap_or_default())
}

/// The media library.
pub struct MediaStore {
    backend: Arc<dyn Backend>,
    queries: QueryClient,
    query: MediaQuery,
    state: StateCell<MediaPage>,
    guard: RequestGuard,
}

impl MediaStore {
    pub fn new(backend: Arc<dyn Backend>, queries: QueryClient) -> Self {
        Self::with_query(backend, queries, MediaQuery::default())
    }

    pub fn with_query(backend: Arc<dyn Backend>, queries: QueryClient, query: MediaQuery) -> Self {
        Self {
            backend,
            queries,
            query,
            state: StateCell::new(),
            guard: RequestGuard::new(),
        }
    }

    pub fn state(&self) -> ResourceState<MediaPage> {
        self.state.snapshot()
    }

    pub fn media(&self) -> Vec<Media> {
        self.state.data().map(|page| page.media).unwrap_or_default()
    }

    fn key(&self) -> CacheKey {
        CacheKey::Media(self.query.clone())
    }

    pub async fn fetch(&self) -> Result<MediaPage> {
        let ticket = self.guard.begin();
        self.state.start();

        let backend = Arc::clone(&self.backend);
        let query = self.query.clone();
        let result = self
            .guard
            .run(self.queries.fetch_if(
                self.key(),
                || async move { load_media(backend.as_ref(), &query).await },
                || self.guard.is_current(ticket),
            ))
            .await
            .map_err(|e| e.or_context("Failed to fetch media"));

        self.state.settle(&self.guard, ticket, result)
    }

    pub async fn refetch(&self) -> Result<MediaPage> {
        self.queries.invalidate(&self.key()).await;
        self.fetch().await
    }

    /// Upload files and prepend whatever the server returns.
    ///
    /// Transport failures surface as "Reconnect to network".
    pub async fn upload(&self, files: Vec<MediaUpload>) -> Result<Vec<Media>> {
        let count = files.len();
        let uploaded = self
            .guard
            .run(async { self.backend.upload_media(files).await?.into_optional() })
            .await
            .map_err(|e| {
                let e = if e.is_network() {
                    Error::Connection("Reconnect to network".to_string())
                } else {
                    e.or_context("Failed to upload media")
                };
                error!("Failed to upload {} file(s): {}", count, e);
                e
            })?
            .map(|page| page.media)
            .unwrap_or_default();

        self.guard.supersede();
        self.state.patch(|page| {
            let page = page.get_or_insert_with(MediaPage::default);
            let mut media = uploaded.clone();
            media.append(&mut page.media);
            page.media = media;
        });
        self.invalidate().await;

        info!("Uploaded {} media item(s)", uploaded.len());
        Ok(uploaded)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.guard
            .run(async { self.backend.delete_media(id).await?.into_optional() })
            .await
            .map_err(|e| {
                let e = e.or_context("Failed to delete media");
                error!("Failed to delete media {}: {}", id, e);
                e
            })?;

        self.guard.supersede();
        self.state.patch(|page| {
            if let Some(page) = page {
                page.media.retain(|m| m.id != id);
            }
        });
        self.invalidate().await;
        Ok(())
    }

    pub async fn by_folder(&self, folder: &str) -> Result<MediaPage> {
        let backend = Arc::clone(&self.backend);
        self.queries
            .fetch(CacheKey::MediaFolder(folder.to_string()), || async move {
                Ok(backend.media_by_folder(folder).await?.into_optional()?.unwrap_or_default())
            })
            .await
            .map_err(|e| e.or_context("Failed to fetch media"))
    }

    pub async fn search(&self, term: &str) -> Result<MediaPage> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_LEN {
            debug!("Search term too short, skipping request");
            return Ok(MediaPage::default());
        }

        let backend = Arc::clone(&self.backend);
        self.queries
            .fetch(CacheKey::MediaSearch(term.to_string()), || async move {
                Ok(backend.search_media(term).await?.into_optional()?.unwrap_or_default())
            })
            .await
            .map_err(|e| e.or_context("Failed to search media"))
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<Media>> {
        let backend = Arc::clone(&self.backend);
        let page: MediaPage = self
            .queries
            .fetch(CacheKey::RecentMedia(limit), || async move {
                Ok(backend.recent_media(limit).await?.into_optional()?.unwrap_or_default())
            })
            .await
            .map_err(|e| e.or_context("Failed to fetch recent media"))?;
        Ok(page.media)
    }

    pub async fn stats(&self) -> Result<Value> {
        let backend = Arc::clone(&self.backend);
        self.queries
            .fetch(CacheKey::MediaStats, || async move {
                Ok(backend.media_stats().await?.into_optional()?.unwrap_or_default())
            })
            .await
            .map_err(|e| e.or_context("Failed to fetch media stats"))
    }

    pub async fn folders(&self) -> Result<Value> {
        let backend = Arc::clone(&self.backend);
        self.queries
            .fetch(CacheKey::MediaFolders, || async move {
                Ok(backend.media_folders().await?.into_optional()?.unwrap_or_default())
            })
            .await
            .map_err(|e| e.or_context("Failed to fetch media folders"))
    }

    pub fn shutdown(&self) {
        self.guard.shutdown();
    }

    async fn invalidate(&self) {
        let keys = [
            self.key(),
            CacheKey::Media(MediaQuery::default()),
            CacheKey::MediaStats,
            CacheKey::Dashboard,
        ];
        self.queries.invalidate_all(&keys).await;
    }
}
