//! Love reaction toggle
//!
//! One reaction document per (post, user) at `posts/{post}/reactions/{user}`;
//! its presence is the toggle state. The flip itself is a single atomic
//! store write.

use std::sync::Arc;

use doc_store::{DocumentStore, Fields};
use tracing::{info, warn};

use crate::domain::{ReactionState, SessionContext, LOVE};
use crate::error::{SyncError, SyncResult};
use crate::services::aggregation::reactions_collection;
use crate::services::feed::FeedPaginator;

#[derive(Clone)]
pub struct ReactionToggle {
    store: Arc<dyn DocumentStore>,
}

impl ReactionToggle {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Flip the user's reaction in the store only
    pub async fn toggle_remote(&self, post_id: &str, user_id: &str) -> SyncResult<ReactionState> {
        if user_id.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "user id must not be empty".to_string(),
            ));
        }
        let path = reactions_collection(post_id)?.doc(user_id)?;
        let fields = Fields::new().with("username", user_id).with("type", LOVE);

        let present = self.store.toggle(&path, fields).await?;
        Ok(if present {
            ReactionState::Reacted
        } else {
            ReactionState::Unreacted
        })
    }

    /// Flip the session user's love on a cached post.
    ///
    /// The cached count moves by one only after the store accepts the
    /// write and never drops below zero. It stays as-is until the next
    /// full page fetch.
    pub async fn toggle(
        &self,
        feed: &mut FeedPaginator,
        ctx: &SessionContext,
        post_id: &str,
    ) -> SyncResult<ReactionState> {
        if feed.post(post_id).is_none() {
            return Err(SyncError::NotFound(format!("post {} is not loaded", post_id)));
        }

        let state = self
            .toggle_remote(post_id, &ctx.user_id)
            .await
            .map_err(|e| {
                warn!(post_id = %post_id, user_id = %ctx.user_id, error = %e, "Reaction toggle failed");
                e
            })?;

        if let Some(post) = feed.post_mut(post_id) {
            post.love_count = match state {
                ReactionState::Reacted => post.love_count + 1,
                ReactionState::Unreacted => post.love_count.saturating_sub(1),
            };
            info!(
                post_id = %post_id,
                user_id = %ctx.user_id,
                reacted = state.is_reacted(),
                love_count = post.love_count,
                "Reaction toggled"
            );
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::{MemoryStore, Query};

    #[tokio::test]
    async fn test_toggle_remote_involution() {
        let store = Arc::new(MemoryStore::new());
        let reactions = ReactionToggle::new(store.clone());

        assert_eq!(
            reactions.toggle_remote("p1", "u1").await.unwrap(),
            ReactionState::Reacted
        );
        let docs = store
            .list(&Query::collection(reactions_collection("p1").unwrap()))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id(), "u1");
        assert_eq!(docs[0].get_str("type"), Some("love"));

        assert_eq!(
            reactions.toggle_remote("p1", "u1").await.unwrap(),
            ReactionState::Unreacted
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_requires_loaded_post() {
        let store = Arc::new(MemoryStore::new());
        let reactions = ReactionToggle::new(store.clone());
        let mut feed = FeedPaginator::new(store.clone());
        let ctx = SessionContext::new("u1").unwrap();

        assert!(matches!(
            reactions.toggle(&mut feed, &ctx, "p1").await,
            Err(SyncError::NotFound(_))
        ));
        assert!(store.is_empty());
    }
}
