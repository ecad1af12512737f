//! Newest-first feed pagination
//!
//! Pagination grows a visible window and re-fetches from the top of the
//! feed up to the new size on every `load_more`; there is no cursor. The
//! first `n` entries of a larger fetch equal a fetch of `n` as long as no
//! post was published or deleted in between.

use std::sync::Arc;

use doc_store::{CollectionPath, DocumentStore, OrderBy, Query};
use tracing::{debug, info, warn};

use crate::domain::{FeedPost, Post, SessionContext};
use crate::error::{SyncError, SyncResult};
use crate::services::aggregation::AggregationJoin;

pub const DEFAULT_PAGE_SIZE: usize = 10;

pub(crate) fn posts_collection() -> SyncResult<CollectionPath> {
    Ok(CollectionPath::new("posts")?)
}

pub(crate) fn decode_posts(docs: &[doc_store::Document]) -> Vec<Post> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<Post>() {
            Ok(post) => Some(post),
            Err(e) => {
                warn!(post_id = %doc.id(), error = %e, "Skipping malformed post");
                None
            }
        })
        .collect()
}

/// Session feed: the visible window of aggregated posts
pub struct FeedPaginator {
    store: Arc<dyn DocumentStore>,
    join: AggregationJoin,
    page_size: usize,
    window: usize,
    posts: Vec<FeedPost>,
}

impl FeedPaginator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            join: AggregationJoin::new(store.clone()),
            store,
            page_size: DEFAULT_PAGE_SIZE,
            window: 0,
            posts: Vec::new(),
        }
    }

    pub fn with_page_size(store: Arc<dyn DocumentStore>, page_size: usize) -> SyncResult<Self> {
        if page_size == 0 {
            return Err(SyncError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            page_size,
            ..Self::new(store)
        })
    }

    /// Newest `limit` posts without joins
    pub async fn fetch_posts(&self, limit: usize) -> SyncResult<Vec<Post>> {
        if limit == 0 {
            return Err(SyncError::InvalidArgument(
                "page limit must be greater than zero".to_string(),
            ));
        }
        let query = Query::collection(posts_collection()?)
            .order_by(OrderBy::desc("createdAt"))
            .limit(limit);
        let docs = self.store.list(&query).await?;
        Ok(decode_posts(&docs))
    }

    /// Newest `limit` posts, each joined with author, comments and loves
    pub async fn fetch_page(&self, limit: usize) -> SyncResult<Vec<FeedPost>> {
        let posts = self.fetch_posts(limit).await?;
        Ok(self.join.join(posts).await)
    }

    async fn fetch_window(&mut self, ctx: &SessionContext, window: usize) -> SyncResult<&[FeedPost]> {
        let posts = self.fetch_page(window).await.map_err(|e| {
            warn!(viewer = %ctx.user_id, window, error = %e, "Feed fetch failed");
            e
        })?;

        // Commit only after a successful fetch
        self.window = window;
        self.posts = posts;
        debug!(viewer = %ctx.user_id, window, loaded = self.posts.len(), "Feed window loaded");
        Ok(&self.posts)
    }

    /// Re-fetch the current window (the first page on first use).
    ///
    /// Replaces every cached entry, including optimistic love counts.
    pub async fn refresh(&mut self, ctx: &SessionContext) -> SyncResult<&[FeedPost]> {
        let window = self.window.max(self.page_size);
        self.fetch_window(ctx, window).await
    }

    /// Grow the window by one page and re-fetch from the top
    pub async fn load_more(&mut self, ctx: &SessionContext) -> SyncResult<&[FeedPost]> {
        let window = if self.window == 0 {
            self.page_size
        } else {
            self.window + self.page_size
        };
        info!(viewer = %ctx.user_id, window, "Loading more posts");
        self.fetch_window(ctx, window).await
    }

    pub fn posts(&self) -> &[FeedPost] {
        &self.posts
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current visible window size; 0 before the first fetch
    pub fn window(&self) -> usize {
        self.window
    }

    /// Whether the last fetch filled the window, so more posts may exist
    pub fn has_more(&self) -> bool {
        self.window > 0 && self.posts.len() >= self.window
    }

    pub fn post(&self, post_id: &str) -> Option<&FeedPost> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    pub fn post_mut(&mut self, post_id: &str) -> Option<&mut FeedPost> {
        self.posts.iter_mut().find(|p| p.id == post_id)
    }

    /// Drop a post from the cached window
    pub fn remove(&mut self, post_id: &str) -> Option<FeedPost> {
        let index = self.posts.iter().position(|p| p.id == post_id)?;
        Some(self.posts.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use doc_store::{format_timestamp, Fields, MemoryStore};

    async fn seed_posts(store: &MemoryStore, count: usize) {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for i in 0..count {
            store
                .set(
                    &posts_collection().unwrap().doc(&format!("p{:02}", i)).unwrap(),
                    Fields::new()
                        .with("userId", "u1")
                        .with("content", format!("post {}", i))
                        .with("createdAt", format_timestamp(base + Duration::minutes(i as i64))),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_fetch_page_is_newest_first() {
        let store = Arc::new(MemoryStore::new());
        seed_posts(&store, 3).await;
        let feed = FeedPaginator::new(store);

        let page = feed.fetch_page(10).await.unwrap();
        let ids: Vec<_> = page.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p02", "p01", "p00"]);
    }

    #[tokio::test]
    async fn test_zero_limit_is_invalid() {
        let store = Arc::new(MemoryStore::new());
        let feed = FeedPaginator::new(store.clone());
        assert!(matches!(
            feed.fetch_page(0).await,
            Err(SyncError::InvalidArgument(_))
        ));
        assert!(FeedPaginator::with_page_size(store, 0).is_err());
    }

    #[tokio::test]
    async fn test_ties_break_by_id_descending() {
        let store = Arc::new(MemoryStore::new());
        let ts = format_timestamp(Utc::now());
        for id in ["a", "c", "b"] {
            store
                .set(
                    &posts_collection().unwrap().doc(id).unwrap(),
                    Fields::new()
                        .with("userId", "u1")
                        .with("content", id)
                        .with("createdAt", ts.clone()),
                )
                .await
                .unwrap();
        }
        let feed = FeedPaginator::new(store);
        let ids: Vec<_> = feed
            .fetch_posts(3)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_failed_load_more_keeps_window() {
        let store = Arc::new(MemoryStore::new());
        seed_posts(&store, 5).await;
        let ctx = SessionContext::new("viewer").unwrap();
        let mut feed = FeedPaginator::with_page_size(store.clone(), 2).unwrap();

        feed.refresh(&ctx).await.unwrap();
        assert_eq!(feed.window(), 2);
        assert!(feed.has_more());

        store.set_offline(true);
        assert!(feed.load_more(&ctx).await.is_err());
        assert_eq!(feed.window(), 2);
        assert_eq!(feed.posts().len(), 2);

        store.set_offline(false);
        feed.load_more(&ctx).await.unwrap();
        feed.load_more(&ctx).await.unwrap();
        assert_eq!(feed.window(), 6);
        assert_eq!(feed.posts().len(), 5);
        assert!(!feed.has_more());
    }

    #[tokio::test]
    async fn test_remove_from_cache() {
        let store = Arc::new(MemoryStore::new());
        seed_posts(&store, 2).await;
        let ctx = SessionContext::new("viewer").unwrap();
        let mut feed = FeedPaginator::new(store);
        feed.refresh(&ctx).await.unwrap();

        assert!(feed.remove("p01").is_some());
        assert!(feed.remove("p01").is_none());
        assert_eq!(feed.posts().len(), 1);
        assert!(feed.post("p00").is_some());
    }
}
