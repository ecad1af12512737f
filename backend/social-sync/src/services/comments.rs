//! Comment append with optimistic merge into the cached feed

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use doc_store::{format_timestamp, DocumentStore, Fields};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Comment, SessionContext};
use crate::error::{SyncError, SyncResult};
use crate::services::aggregation::comments_collection;
use crate::services::feed::FeedPaginator;

#[derive(Clone)]
pub struct CommentAppend {
    store: Arc<dyn DocumentStore>,
}

impl CommentAppend {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Append a comment to a cached post.
    ///
    /// Blank content is a no-op returning `Ok(None)`. The comment shows up
    /// in the cache before the write and is removed again if the write fails.
    pub async fn add_comment(
        &self,
        feed: &mut FeedPaginator,
        ctx: &SessionContext,
        post_id: &str,
        content: &str,
    ) -> SyncResult<Option<Comment>> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        let author_name = ctx.display_name().ok_or_else(|| {
            SyncError::InvalidArgument("commenting requires a display name".to_string())
        })?;

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            author_id: ctx.user_id.clone(),
            author_name: Some(author_name.to_string()),
            content: content.to_string(),
            created_at: Utc::now().trunc_subsecs(6),
        };
        let path = comments_collection(post_id)?.doc(&comment.id)?;

        match feed.post_mut(post_id) {
            Some(post) => post.comments.push(comment.clone()),
            None => {
                return Err(SyncError::NotFound(format!("post {} is not loaded", post_id)));
            }
        }

        let fields = Fields::new()
            .with("userId", comment.author_id.as_str())
            .with("username", author_name)
            .with("content", comment.content.as_str())
            .with("createdAt", format_timestamp(comment.created_at));

        if let Err(e) = self.store.set(&path, fields).await {
            warn!(post_id = %post_id, comment_id = %comment.id, error = %e, "Comment write failed, rolling back");
            if let Some(post) = feed.post_mut(post_id) {
                post.comments.retain(|c| c.id != comment.id);
            }
            return Err(e.into());
        }

        info!(post_id = %post_id, comment_id = %comment.id, user_id = %ctx.user_id, "Comment added");
        Ok(Some(comment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::MemoryStore;

    #[tokio::test]
    async fn test_blank_comment_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let comments = CommentAppend::new(store.clone());
        let mut feed = FeedPaginator::new(store.clone());
        let ctx = SessionContext::new("u1").unwrap();

        // Blank content wins over missing name and unknown post
        assert_eq!(
            comments.add_comment(&mut feed, &ctx, "p1", "  ").await.unwrap(),
            None
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_display_name_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let comments = CommentAppend::new(store.clone());
        let mut feed = FeedPaginator::new(store.clone());
        let ctx = SessionContext::new("u1").unwrap();

        assert!(matches!(
            comments.add_comment(&mut feed, &ctx, "p1", "nice").await,
            Err(SyncError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_comment_content_is_stored_as_typed() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &doc_store::DocPath::new("posts/p1").unwrap(),
                Fields::new()
                    .with("userId", "u2")
                    .with("content", "post")
                    .with_server_timestamp("createdAt"),
            )
            .await
            .unwrap();
        let comments = CommentAppend::new(store.clone());
        let mut feed = FeedPaginator::new(store.clone());
        let ctx = SessionContext::new("u1").unwrap().with_display_name("alice");
        feed.refresh(&ctx).await.unwrap();

        let comment = comments
            .add_comment(&mut feed, &ctx, "p1", "  nice one\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(comment.content, "  nice one\n");

        let path = comments_collection("p1").unwrap().doc(&comment.id).unwrap();
        let stored = store.get(&path).await.unwrap().unwrap();
        assert_eq!(stored.get_str("content"), Some("  nice one\n"));
    }

    #[tokio::test]
    async fn test_unknown_post_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let comments = CommentAppend::new(store.clone());
        let mut feed = FeedPaginator::new(store.clone());
        let ctx = SessionContext::new("u1").unwrap().with_display_name("alice");

        assert!(matches!(
            comments.add_comment(&mut feed, &ctx, "p1", "nice").await,
            Err(SyncError::NotFound(_))
        ));
        assert!(store.is_empty());
    }
}
