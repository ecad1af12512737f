//! Publishing, deleting and listing posts

use std::sync::Arc;

use chrono::Utc;
use doc_store::{DocumentStore, Fields, OrderBy, Query};
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{Post, SessionContext};
use crate::error::{SyncError, SyncResult};
use crate::services::aggregation::post_path;
use crate::services::directory::Directory;
use crate::services::feed::{decode_posts, posts_collection, FeedPaginator};
use crate::services::media::MediaHost;

/// Image attached to a new post
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }
}

/// Millisecond timestamp plus a short random suffix
fn new_post_id(millis: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", millis, &suffix[..8])
}

#[derive(Clone)]
pub struct PostPublisher {
    store: Arc<dyn DocumentStore>,
    media: Option<Arc<dyn MediaHost>>,
    directory: Directory,
}

impl PostPublisher {
    pub fn new(store: Arc<dyn DocumentStore>, media: Option<Arc<dyn MediaHost>>) -> Self {
        Self {
            directory: Directory::new(store.clone()),
            store,
            media,
        }
    }

    /// Publish a post, uploading the image first when one is given.
    ///
    /// Nothing is written if the upload fails.
    pub async fn publish(
        &self,
        ctx: &SessionContext,
        content: &str,
        image: Option<ImageUpload>,
    ) -> SyncResult<Post> {
        if content.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "post content must not be empty".to_string(),
            ));
        }

        let image_url = match image {
            Some(image) => {
                let media = self.media.as_ref().ok_or_else(|| {
                    SyncError::UploadError("no media host configured".to_string())
                })?;
                let url = media
                    .upload(image.bytes, &image.filename)
                    .await
                    .map_err(|e| {
                        error!(user_id = %ctx.user_id, filename = %image.filename, error = %e, "Image upload failed, post not written");
                        e
                    })?;
                Some(url)
            }
            None => None,
        };

        // Profile name first, session name as fallback
        let author_name = match self.directory.find(&ctx.user_id).await? {
            Some(user) => user.display_name,
            None => None,
        }
        .or_else(|| ctx.display_name().map(str::to_string));

        let id = new_post_id(Utc::now().timestamp_millis());
        let path = post_path(&id)?;

        let mut fields = Fields::new()
            .with("userId", ctx.user_id.as_str())
            .with("content", content)
            .with("imageUrl", image_url.clone().unwrap_or_default())
            .with_server_timestamp("createdAt");
        if let Some(name) = &author_name {
            fields = fields.with("userName", name.as_str());
        }

        self.store.set(&path, fields).await?;
        info!(post_id = %id, user_id = %ctx.user_id, has_image = image_url.is_some(), "Post published");

        // Read back for the store-assigned timestamp
        let doc = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("post {}", id)))?;
        Ok(doc.decode()?)
    }

    /// Delete one of the session user's posts with its comments and
    /// reactions, then drop it from the cached feed
    pub async fn delete(
        &self,
        feed: &mut FeedPaginator,
        ctx: &SessionContext,
        post_id: &str,
    ) -> SyncResult<()> {
        let path = post_path(post_id)?;
        let doc = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("post {}", post_id)))?;

        if doc.get_str("userId") != Some(ctx.user_id.as_str()) {
            return Err(SyncError::InvalidArgument(format!(
                "post {} belongs to another user",
                post_id
            )));
        }

        self.store.delete(&path).await?;
        feed.remove(post_id);
        info!(post_id = %post_id, user_id = %ctx.user_id, "Post deleted");
        Ok(())
    }

    /// Posts written by one author, newest first
    pub async fn posts_by_author(&self, author_id: &str) -> SyncResult<Vec<Post>> {
        let query = Query::collection(posts_collection()?)
            .filter_eq("userId", author_id)
            .order_by(OrderBy::desc("createdAt"));
        let docs = self.store.list(&query).await?;
        Ok(decode_posts(&docs))
    }
}
