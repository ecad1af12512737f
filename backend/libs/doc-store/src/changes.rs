//! Change notifications over Redis Pub/Sub
//!
//! Every write to the PostgreSQL backend publishes a [`ChangeNotice`] so
//! that all processes holding subscriptions on the touched collection can
//! re-run their queries:
//!
//! ```text
//! PUBLISH docstore:changes {"collection": "chats/u1_u2/messages", "path": "chats/u1_u2/messages/ab12"}
//! ```

use redis::aio::{ConnectionManager, PubSub};
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreResult;
use crate::path::{CollectionPath, DocPath};

/// Channel all document writes are announced on
pub const CHANGES_CHANNEL: &str = "docstore:changes";

/// One applied write
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Collection the written document lives in
    pub collection: String,
    /// Written (or deleted) document
    pub path: String,
}

impl ChangeNotice {
    pub fn for_doc(path: &DocPath) -> Self {
        Self {
            collection: path.collection().to_string(),
            path: path.to_string(),
        }
    }

    /// Whether a subscription on `collection` must re-query.
    ///
    /// True for writes into the collection itself and for cascading deletes
    /// of an ancestor document.
    pub fn affects(&self, collection: &CollectionPath) -> bool {
        if self.collection == collection.as_str() {
            return true;
        }
        DocPath::new(self.path.as_str())
            .map(|path| path.is_ancestor_of(collection))
            .unwrap_or(false)
    }
}

/// Publisher and listener factory for [`ChangeNotice`]s
#[derive(Clone)]
pub struct ChangeFeed {
    client: Client,
    publisher: ConnectionManager,
    channel: String,
}

impl ChangeFeed {
    pub async fn new(redis_url: &str) -> StoreResult<Self> {
        Self::with_channel(redis_url, CHANGES_CHANNEL.to_string()).await
    }

    pub async fn with_channel(redis_url: &str, channel: String) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            publisher,
            channel,
        })
    }

    /// Announce a write; returns the number of listening connections
    pub async fn publish(&self, notice: &ChangeNotice) -> StoreResult<usize> {
        let payload = serde_json::to_string(notice)?;
        let mut conn = self.publisher.clone();
        let receivers: usize = conn.publish(&self.channel, payload).await?;

        debug!(
            collection = %notice.collection,
            path = %notice.path,
            receivers,
            "Change published"
        );
        Ok(receivers)
    }

    /// Dedicated pub/sub connection already subscribed to the change channel
    pub async fn listen(&self) -> StoreResult<PubSub> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;
        Ok(pubsub)
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("channel", &self.channel)
            .finish()
    }
}
