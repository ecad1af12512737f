use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{SyncError, SyncResult};

/// Reaction type written by the love toggle
pub const LOVE: &str = "love";

/// Authenticated user of the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> SyncResult<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "session user id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            user_id,
            display_name: None,
        })
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Display name, if one is set and not blank
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// Profile document at `users/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: String,
    #[serde(rename = "username", default)]
    pub display_name: Option<String>,
    #[serde(rename = "profilePic", default, deserialize_with = "empty_as_none")]
    pub avatar_url: Option<String>,
}

/// Canonical identifier of a two-party chat
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub(crate) String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message document at `chats/{channel}/messages/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(rename = "senderId")]
    pub sender_id: String,
    #[serde(rename = "senderName", default)]
    pub sender_name: Option<String>,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Post document at `posts/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(rename = "userId")]
    pub author_id: String,
    #[serde(rename = "userName", default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "imageUrl", default, deserialize_with = "empty_as_none")]
    pub image_url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Stored counter; informational only, the join counts reactions itself
    #[serde(rename = "reactionCount", alias = "likeCount", default)]
    pub reaction_count: u64,
    #[serde(rename = "commentCount", default)]
    pub comment_count: u64,
}

/// Comment document at `posts/{post}/comments/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(skip)]
    pub post_id: String,
    #[serde(rename = "userId")]
    pub author_id: String,
    #[serde(rename = "username", default)]
    pub author_name: Option<String>,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Denormalized feed entry: post, author snapshot, comments and love count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPost {
    pub id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<Comment>,
    pub love_count: u64,
    /// Set when one of the joins failed and the entry is partial
    pub degraded: bool,
}

impl FeedPost {
    /// Bare entry before any join runs
    pub fn from_post(post: Post) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            author_name: post.author_name,
            author_avatar: None,
            content: post.content,
            image_url: post.image_url,
            created_at: post.created_at,
            comments: Vec::new(),
            love_count: 0,
            degraded: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    Reacted,
    Unreacted,
}

impl ReactionState {
    pub fn is_reacted(&self) -> bool {
        matches!(self, ReactionState::Reacted)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
