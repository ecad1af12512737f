use std::sync::Arc;

use doc_store::{
    create_pool, migrate, ChangeFeed, DbConfig, DocumentStore, MemoryStore, PgDocumentStore,
};
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::error::{SyncError, SyncResult};
use crate::services::{
    CommentAppend, Directory, FeedPaginator, HttpMediaHost, MediaHost, MessageStream,
    PostPublisher, ReactionToggle,
};

/// Shared collaborators of one user session
#[derive(Clone)]
pub struct SessionState {
    pub store: Arc<dyn DocumentStore>,
    /// Media host for post images, when configured
    pub media: Option<Arc<dyn MediaHost>>,
    pub config: Arc<Config>,
}

impl SessionState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        media: Option<Arc<dyn MediaHost>>,
        config: Config,
    ) -> Self {
        Self {
            store,
            media,
            config: Arc::new(config),
        }
    }

    /// Connect the configured store backend and media host
    pub async fn from_config(config: Config) -> SyncResult<Self> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => {
                info!("Using in-memory document store");
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Postgres => {
                let database_url = config.store.database_url.clone().ok_or_else(|| {
                    SyncError::Config("DATABASE_URL not set".to_string())
                })?;
                let redis_url = config
                    .store
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| SyncError::Config("REDIS_URL not set".to_string()))?;

                let pool = create_pool(&DbConfig {
                    database_url,
                    max_connections: config.store.max_connections,
                    min_connections: config.store.min_connections,
                    ..DbConfig::default()
                })
                .await?;
                migrate(&pool).await?;
                let changes = ChangeFeed::new(redis_url).await?;

                info!("Using PostgreSQL document store");
                Arc::new(PgDocumentStore::new(pool, changes))
            }
        };

        let media: Option<Arc<dyn MediaHost>> = match &config.media {
            Some(cfg) => Some(Arc::new(HttpMediaHost::from_config(cfg)?)),
            None => None,
        };

        Ok(Self::new(store, media, config))
    }

    pub fn message_stream(&self) -> MessageStream {
        MessageStream::new(self.store.clone())
    }

    pub fn directory(&self) -> Directory {
        Directory::new(self.store.clone())
    }

    /// Feed paginator with the configured page size
    pub fn feed(&self) -> SyncResult<FeedPaginator> {
        FeedPaginator::with_page_size(self.store.clone(), self.config.feed.page_size)
    }

    pub fn reactions(&self) -> ReactionToggle {
        ReactionToggle::new(self.store.clone())
    }

    pub fn comments(&self) -> CommentAppend {
        CommentAppend::new(self.store.clone())
    }

    pub fn publisher(&self) -> PostPublisher {
        PostPublisher::new(self.store.clone(), self.media.clone())
    }
}
