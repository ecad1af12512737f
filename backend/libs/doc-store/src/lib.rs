//! Document store abstraction
//!
//! A small document-database contract: collections of JSON documents
//! addressed by slash-separated paths, with ordered range queries and
//! push subscriptions that deliver full ordered snapshots.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local, used by tests and single-process sessions
//! - [`PgDocumentStore`]: PostgreSQL `documents` table with change
//!   notifications fanned out over Redis Pub/Sub
//!
//! ```text
//! writer:   INSERT/DELETE documents  ──►  PUBLISH docstore:changes {"collection": ...}
//!                                                   │
//! watchers: SUBSCRIBE docstore:changes ◄────────────┘
//!           re-run ordered query ──► full snapshot to each live Subscription
//! ```
//!
//! # Example
//!
//! ```no_run
//! use doc_store::{CollectionPath, DocumentStore, Fields, MemoryStore, OrderBy, Query};
//!
//! # async fn run() -> doc_store::StoreResult<()> {
//! let store = MemoryStore::new();
//! let messages = CollectionPath::new("chats/u1_u2/messages")?;
//!
//! let mut sub = store
//!     .subscribe(Query::collection(messages.clone()).order_by(OrderBy::asc("createdAt")))
//!     .await?;
//!
//! store
//!     .add(&messages, Fields::new().with("content", "hi").with_server_timestamp("createdAt"))
//!     .await?;
//!
//! while let Some(snapshot) = sub.next().await {
//!     println!("{} messages", snapshot?.len());
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

mod changes;
mod document;
mod error;
mod memory;
mod path;
mod pool;
mod postgres;
mod query;
mod subscription;

pub use changes::{ChangeFeed, ChangeNotice};
pub use document::{format_timestamp, Document, FieldValue, Fields};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use path::{CollectionPath, DocPath};
pub use pool::{create_pool, migrate, DbConfig};
pub use postgres::PgDocumentStore;
pub use query::{compare_values, Direction, Filter, OrderBy, Query};
pub use subscription::{Snapshot, Subscription};

/// Remote persistent document store.
///
/// Implementations must deliver subscription snapshots in order and must
/// stop delivering once the [`Subscription`] is dropped.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>>;

    /// Ordered range query
    async fn list(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Create or fully overwrite a document
    async fn set(&self, path: &DocPath, fields: Fields) -> StoreResult<()>;

    /// Create a document with a store-assigned id, returning the id
    async fn add(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<String>;

    /// Delete a document together with every sub-collection below it
    async fn delete(&self, path: &DocPath) -> StoreResult<()>;

    /// Atomically create the document if absent or delete it if present.
    ///
    /// Returns `true` when the document exists after the call.
    async fn toggle(&self, path: &DocPath, fields: Fields) -> StoreResult<bool>;

    /// Live query: the first item is the current snapshot, each later item a
    /// full replacement after a change to the collection
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription>;
}

/// Store-assigned identifier for `add`
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
