//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use doc_store::{
    format_timestamp, CollectionPath, DocPath, Document, DocumentStore, Fields, MemoryStore, Query,
    StoreError, StoreResult, Subscription,
};

/// Memory store wrapper with injectable failures and call counters
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    failing_reads: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
    get_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    /// Fail reads whose path contains `fragment`
    pub fn fail_reads_containing(&self, fragment: &str) {
        self.failing_reads
            .lock()
            .unwrap()
            .push(fragment.to_string());
    }

    pub fn heal_reads(&self) {
        self.failing_reads.lock().unwrap().clear();
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn check_read(&self, path: &str) -> StoreResult<()> {
        let failing = self.failing_reads.lock().unwrap();
        if failing.iter().any(|fragment| path.contains(fragment.as_str())) {
            return Err(StoreError::Unavailable(format!("injected read failure: {}", path)));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_read(path.as_str())?;
        self.inner.get(path).await
    }

    async fn list(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.check_read(query.collection.as_str())?;
        self.inner.list(query).await
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        self.check_write()?;
        self.inner.set(path, fields).await
    }

    async fn add(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<String> {
        self.check_write()?;
        self.inner.add(collection, fields).await
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        self.check_write()?;
        self.inner.delete(path).await
    }

    async fn toggle(&self, path: &DocPath, fields: Fields) -> StoreResult<bool> {
        self.check_write()?;
        self.inner.toggle(path, fields).await
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        self.check_read(query.collection.as_str())?;
        self.inner.subscribe(query).await
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub async fn seed_user(store: &dyn DocumentStore, id: &str, name: &str, avatar: &str) {
    store
        .set(
            &DocPath::new(format!("users/{}", id)).unwrap(),
            Fields::new().with("username", name).with("profilePic", avatar),
        )
        .await
        .unwrap();
}

/// Post `id` created `minutes` after [`base_time`]
pub async fn seed_post(store: &dyn DocumentStore, id: &str, author: &str, minutes: i64) {
    store
        .set(
            &DocPath::new(format!("posts/{}", id)).unwrap(),
            Fields::new()
                .with("userId", author)
                .with("userName", author)
                .with("content", format!("content of {}", id))
                .with("imageUrl", "")
                .with(
                    "createdAt",
                    format_timestamp(base_time() + Duration::minutes(minutes)),
                ),
        )
        .await
        .unwrap();
}

pub async fn seed_reaction(store: &dyn DocumentStore, post_id: &str, user_id: &str) {
    store
        .set(
            &DocPath::new(format!("posts/{}/reactions/{}", post_id, user_id)).unwrap(),
            Fields::new().with("username", user_id).with("type", "love"),
        )
        .await
        .unwrap();
}

/// `count` posts `p00..` spread over three authors, one minute apart
pub async fn seed_feed(store: &dyn DocumentStore, count: usize) {
    let authors = ["u1", "u2", "u3"];
    for author in authors {
        seed_user(store, author, &format!("user {}", author), &format!("{}.png", author)).await;
    }
    for i in 0..count {
        seed_post(store, &format!("p{:02}", i), authors[i % authors.len()], i as i64).await;
    }
}
