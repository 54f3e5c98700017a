use crate::cache_keys::CacheKey;
use crate::ports::Backend;
use crate::query::{QueryClient, RequestGuard, ResourceState, StateCell};
use shared::Result;
use shared_http::api::{CreatePostRequest, Post, PostQuery, PostStatus, UpdatePostRequest};
use std::sync::Arc;
use tracing::{error, info};

/// Load a post listing; a 304 answer reads as an empty list.
pub async fn load_posts(backend: &dyn Backend, query: &PostQuery) -> Result<Vec<Post>> {
    let list = backend.list_posts(query).await?.into_optional()?;
    Ok(list.map(|l| l.posts).unwrap_or_default())
}

/// The user's posts, optionally narrowed by a [`PostQuery`].
pub struct PostStore {
    backend: Arc<dyn Backend>,
    queries: QueryClient,
    query: PostQuery,
    state: StateCell<Vec<Post>>,
    guard: RequestGuard,
}

impl PostStore {
    pub fn new(backend: Arc<dyn Backend>, queries: QueryClient) -> Self {
        Self::with_query(backend, queries, PostQuery::default())
    }

    pub fn with_query(backend: Arc<dyn Backend>, queries: QueryClient, query: PostQuery) -> Self {
        Self {
            backend,
            queries,
            query,
            state: StateCell::new(),
            guard: RequestGuard::new(),
        }
    }

    pub fn query(&self) -> &PostQuery {
        &self.query
    }

    pub fn state(&self) -> ResourceState<Vec<Post>> {
        self.state.snapshot()
    }

    /// The locally held list, including optimistic patches.
    pub fn posts(&self) -> Vec<Post> {
        self.state.data().unwrap_or_default()
    }

    fn key(&self) -> CacheKey {
        CacheKey::Posts(self.query.clone())
    }

    pub async fn fetch(&self) -> Result<Vec<Post>> {
        let ticket = self.guard.begin();
        self.state.start();

        let backend = Arc::clone(&self.backend);
        let query = self.query.clone();
        let result = self
            .guard
            .run(self.queries.fetch_if(
                self.key(),
                || async move { load_posts(backend.as_ref(), &query).await },
                || self.guard.is_current(ticket),
            ))
            .await
            .map_err(|e| e.or_context("Failed to fetch posts"));

        self.state.settle(&self.guard, ticket, result)
    }

    /// Bypass the cache and load again.
    pub async fn refetch(&self) -> Result<Vec<Post>> {
        self.queries.invalidate(&self.key()).await;
        self.fetch().await
    }

    /// One post straight from the server; the cached listing is left alone.
    pub async fn get(&self, id: &str) -> Result<Post> {
        self.backend
            .get_post(id)
            .await
            .and_then(|r| r.into_data())
            .map_err(|e| e.or_context("Failed to fetch post"))
    }

    /// Create a post and prepend the server's record to the local list.
    pub async fn create(&self, request: &CreatePostRequest) -> Result<Post> {
        let created = self
            .guard
            .run(async { self.backend.create_post(request).await?.into_data() })
            .await
            .map_err(|e| {
                let e = e.or_context("Failed to create post");
                error!("Failed to create post: {}", e);
                e
            })?;

        // Anything still in flight predates the new post
        self.guard.supersede();
        self.state.patch(|posts| posts.get_or_insert_with(Vec::new).insert(0, created.clone()));
        self.invalidate().await;

        info!("Created post {} ({})", created.id, created.status);
        Ok(created)
    }

    /// Update a post and replace the local copy with the server's record.
    pub async fn update(&self, id: &str, request: &UpdatePostRequest) -> Result<Post> {
        let updated = self
            .guard
            .run(async { self.backend.update_post(id, request).await?.into_data() })
            .await
            .map_err(|e| {
                let e = e.or_context("Failed to update post");
                error!("Failed to update post {}: {}", id, e);
                e
            })?;

        self.guard.supersede();
        self.state.patch(|posts| {
            if let Some(posts) = posts {
                for post in posts.iter_mut().filter(|p| p.id == id) {
                    *post = updated.clone();
                }
            }
        });
        self.invalidate().await;

        info!("Updated post {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.guard
            .run(async { self.backend.delete_post(id).await?.into_optional() })
            .await
            .map_err(|e| {
                let e = e.or_context("Failed to delete post");
                error!("Failed to delete post {}: {}", id, e);
                e
            })?;

        self.guard.supersede();
        self.state.patch(|posts| {
            if let Some(posts) = posts {
                posts.retain(|p| p.id != id);
            }
        });
        self.invalidate().await;

        info!("Deleted post {}", id);
        Ok(())
    }

    /// Publish now; the local copy flips to `published`.
    pub async fn publish(&self, id: &str) -> Result<()> {
        self.guard
            .run(async { self.backend.publish_post(id).await?.into_optional() })
            .await
            .map_err(|e| {
                let e = e.or_context("Failed to publish post");
                error!("Failed to publish post {}: {}", id, e);
                e
            })?;

        self.guard.supersede();
        self.state.patch(|posts| {
            if let Some(posts) = posts {
                for post in posts.iter_mut().filter(|p| p.id == id) {
                    post.status = PostStatus::Published;
                }
            }
        });
        self.invalidate().await;

        info!("Published post {}", id);
        Ok(())
    }

    /// Stop publishing results from requests still in flight.
    pub fn shutdown(&self) {
        self.guard.shutdown();
    }

    async fn invalidate(&self) {
        let keys = [
            self.key(),
            CacheKey::Posts(PostQuery::default()),
            CacheKey::Dashboard,
        ];
        self.queries.invalidate_all(&keys).await;
    }
}
