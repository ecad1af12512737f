//! In-process document store
//!
//! Holds every document in an ordered map behind a mutex and pushes
//! snapshots to watchers synchronously under the same lock, so subscribers
//! observe writes in exactly the order they were applied.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{Document, Fields};
use crate::error::{StoreError, StoreResult};
use crate::path::{CollectionPath, DocPath};
use crate::query::Query;
use crate::subscription::{SnapshotSender, Subscription};
use crate::{generate_id, DocumentStore};

struct Watcher {
    query: Query,
    sender: SnapshotSender,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<DocPath, Map<String, Value>>,
    watchers: HashMap<u64, Watcher>,
    next_watcher: u64,
    last_timestamp: Option<DateTime<Utc>>,
    offline: bool,
}

impl Inner {
    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    /// Strictly increasing server clock
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamped = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamped);
        stamped
    }

    fn snapshot(&self, query: &Query) -> Vec<Document> {
        let docs: Vec<Document> = self
            .docs
            .iter()
            .filter(|(path, _)| path.collection() == query.collection)
            .map(|(path, fields)| Document::new(path.clone(), fields.clone()))
            .collect();
        query.apply(&docs)
    }

    /// Push fresh snapshots to every watcher selected by `affects`
    fn notify<F>(&mut self, affects: F)
    where
        F: Fn(&CollectionPath) -> bool,
    {
        let mut closed = Vec::new();
        for (id, watcher) in &self.watchers {
            if !affects(&watcher.query.collection) {
                continue;
            }
            let snapshot = self.snapshot(&watcher.query);
            if watcher.sender.send(Ok(snapshot)).is_err() {
                closed.push(*id);
            }
        }
        for id in closed {
            self.watchers.remove(&id);
        }
    }
}

/// Process-local [`DocumentStore`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate losing (or regaining) the connection to the store.
    ///
    /// While offline every operation fails with [`StoreError::Unavailable`]
    /// and open subscriptions receive that error once. Coming back online
    /// re-delivers the current snapshot to every subscriber.
    pub fn set_offline(&self, offline: bool) {
        let mut inner = self.lock();
        if inner.offline == offline {
            return;
        }
        inner.offline = offline;

        if offline {
            warn!(watchers = inner.watchers.len(), "Memory store taken offline");
            inner.watchers.retain(|_, watcher| {
                watcher
                    .sender
                    .send(Err(StoreError::Unavailable("store went offline".to_string())))
                    .is_ok()
            });
        } else {
            debug!("Memory store back online");
            inner.notify(|_| true);
        }
    }

    /// Number of stored documents, across all collections
    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live subscriptions
    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let inner = self.lock();
        inner.ensure_online()?;
        Ok(inner
            .docs
            .get(path)
            .map(|fields| Document::new(path.clone(), fields.clone())))
    }

    async fn list(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let inner = self.lock();
        inner.ensure_online()?;
        Ok(inner.snapshot(query))
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.ensure_online()?;

        let now = inner.next_timestamp();
        inner.docs.insert(path.clone(), fields.resolve(now));

        let collection = path.collection();
        inner.notify(|watched| *watched == collection);
        Ok(())
    }

    async fn add(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<String> {
        let id = generate_id();
        let path = collection.doc(&id)?;
        self.set(&path, fields).await?;
        Ok(id)
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.ensure_online()?;

        let before = inner.docs.len();
        inner.docs.retain(|stored, _| !path.contains(stored));
        let removed = before - inner.docs.len();
        debug!(path = %path, removed, "Deleted documents");

        if removed > 0 {
            let collection = path.collection();
            inner.notify(|watched| *watched == collection || path.is_ancestor_of(watched));
        }
        Ok(())
    }

    async fn toggle(&self, path: &DocPath, fields: Fields) -> StoreResult<bool> {
        let mut inner = self.lock();
        inner.ensure_online()?;

        let present = if inner.docs.remove(path).is_some() {
            false
        } else {
            let now = inner.next_timestamp();
            inner.docs.insert(path.clone(), fields.resolve(now));
            true
        };

        let collection = path.collection();
        inner.notify(|watched| *watched == collection);
        Ok(present)
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        let mut inner = self.lock();
        inner.ensure_online()?;

        let (sender, receiver) = Subscription::channel();
        // Initial snapshot is queued before the watcher becomes visible to writers
        let _ = sender.send(Ok(inner.snapshot(&query)));

        let id = inner.next_watcher;
        inner.next_watcher += 1;
        debug!(watcher = id, collection = %query.collection, "Subscription opened");
        inner.watchers.insert(id, Watcher { query, sender });

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(receiver, move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                inner.watchers.remove(&id);
                debug!(watcher = id, "Subscription closed");
            }
        }))
    }
}
