//! Per-post joins: author avatar, comments and love count
//!
//! Author profiles are fetched once per unique author per batch. Comments
//! and reactions are fetched concurrently for every post; a failed
//! sub-fetch marks that post `degraded` instead of dropping it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use doc_store::{CollectionPath, DocPath, DocumentStore, OrderBy, Query};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::{Comment, FeedPost, Post, User};
use crate::error::SyncResult;
use crate::services::directory::users_collection;

/// `posts/{id}`
pub(crate) fn post_path(post_id: &str) -> SyncResult<DocPath> {
    Ok(CollectionPath::new("posts")?.doc(post_id)?)
}

pub(crate) fn comments_collection(post_id: &str) -> SyncResult<CollectionPath> {
    Ok(post_path(post_id)?.child("comments")?)
}

pub(crate) fn reactions_collection(post_id: &str) -> SyncResult<CollectionPath> {
    Ok(post_path(post_id)?.child("reactions")?)
}

#[derive(Debug, Clone)]
enum AvatarLookup {
    Found(Option<String>),
    Failed,
}

#[derive(Clone)]
pub struct AggregationJoin {
    store: Arc<dyn DocumentStore>,
}

impl AggregationJoin {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Join a batch of raw posts, preserving their order
    pub async fn join(&self, posts: Vec<Post>) -> Vec<FeedPost> {
        let authors: HashSet<&str> = posts.iter().map(|p| p.author_id.as_str()).collect();
        let avatars = self.author_avatars(authors).await;

        let joined = join_all(posts.into_iter().map(|post| {
            let avatar = avatars
                .get(&post.author_id)
                .cloned()
                .unwrap_or(AvatarLookup::Failed);
            self.join_one(post, avatar)
        }))
        .await;

        let degraded = joined.iter().filter(|p| p.degraded).count();
        debug!(count = joined.len(), degraded, "Aggregated feed batch");
        joined
    }

    async fn author_avatars<'a>(
        &self,
        authors: HashSet<&'a str>,
    ) -> HashMap<String, AvatarLookup> {
        let lookups = join_all(authors.into_iter().map(|author_id| async move {
            let lookup = match self.author(author_id).await {
                Ok(user) => AvatarLookup::Found(user.and_then(|u| u.avatar_url)),
                Err(e) => {
                    warn!(author_id = %author_id, error = %e, "Author profile fetch failed");
                    AvatarLookup::Failed
                }
            };
            (author_id.to_string(), lookup)
        }))
        .await;

        lookups.into_iter().collect()
    }

    async fn author(&self, author_id: &str) -> SyncResult<Option<User>> {
        let path = users_collection()?.doc(author_id)?;
        match self.store.get(&path).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    async fn join_one(&self, post: Post, avatar: AvatarLookup) -> FeedPost {
        let (comments, love_count) =
            futures::join!(self.comments(&post.id), self.love_count(&post.id));

        let mut entry = FeedPost::from_post(post);
        match avatar {
            AvatarLookup::Found(url) => entry.author_avatar = url,
            AvatarLookup::Failed => entry.degraded = true,
        }
        match comments {
            Ok(comments) => entry.comments = comments,
            Err(e) => {
                warn!(post_id = %entry.id, error = %e, "Comment join failed");
                entry.degraded = true;
            }
        }
        match love_count {
            Ok(count) => entry.love_count = count,
            Err(e) => {
                warn!(post_id = %entry.id, error = %e, "Reaction join failed");
                entry.degraded = true;
            }
        }
        entry
    }

    /// All comments of a post, oldest first
    pub async fn comments(&self, post_id: &str) -> SyncResult<Vec<Comment>> {
        let query =
            Query::collection(comments_collection(post_id)?).order_by(OrderBy::asc("createdAt"));
        let docs = self.store.list(&query).await?;

        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode::<Comment>() {
                Ok(mut comment) => {
                    comment.post_id = post_id.to_string();
                    Some(comment)
                }
                Err(e) => {
                    warn!(post_id = %post_id, comment_id = %doc.id(), error = %e, "Skipping malformed comment");
                    None
                }
            })
            .collect())
    }

    /// Number of reaction documents on a post
    pub async fn love_count(&self, post_id: &str) -> SyncResult<u64> {
        let docs = self
            .store
            .list(&Query::collection(reactions_collection(post_id)?))
            .await?;
        Ok(docs.len() as u64)
    }
}
