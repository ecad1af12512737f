pub mod models;

pub use models::{
    ChannelId, ChatMessage, Comment, FeedPost, Post, ReactionState, SessionContext,
    User, LOVE,
};
