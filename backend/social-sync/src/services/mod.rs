pub mod aggregation;
pub mod channel;
pub mod comments;
pub mod directory;
pub mod feed;
pub mod media;
pub mod messages;
pub mod posts;
pub mod reactions;

pub use aggregation::AggregationJoin;
pub use channel::channel_id;
pub use comments::CommentAppend;
pub use directory::Directory;
pub use feed::{FeedPaginator, DEFAULT_PAGE_SIZE};
pub use media::{HttpMediaHost, MediaHost};
pub use messages::{Conversation, MessageStream, MessageSubscription};
pub use posts::{ImageUpload, PostPublisher};
pub use reactions::ReactionToggle;
