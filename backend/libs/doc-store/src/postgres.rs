//! PostgreSQL-backed document store
//!
//! Documents live in a single `documents` table keyed by full path. Writes
//! publish a [`ChangeNotice`] on Redis; each subscription owns a pub/sub
//! connection and re-runs its query whenever a notice touches its
//! collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, error, warn};

use crate::changes::{ChangeFeed, ChangeNotice};
use crate::document::{Document, Fields};
use crate::error::{StoreError, StoreResult};
use crate::path::{CollectionPath, DocPath};
use crate::query::{Direction, Query};
use crate::subscription::Subscription;
use crate::{generate_id, DocumentStore};

#[derive(sqlx::FromRow)]
struct DocumentRow {
    path: String,
    fields: Json<Map<String, Value>>,
}

impl DocumentRow {
    fn into_document(self) -> StoreResult<Document> {
        Ok(Document::new(DocPath::new(self.path)?, self.fields.0))
    }
}

/// ORDER BY clause for a query; missing fields sort first.
///
/// `$4` is always referenced so the bind count stays fixed. Without an
/// order field it binds NULL and every row ties, leaving the id order.
fn order_clause(query: &Query) -> String {
    let direction = query
        .order_by
        .as_ref()
        .map(|o| o.direction)
        .unwrap_or(Direction::Ascending);
    let nulls = match direction {
        Direction::Ascending => "NULLS FIRST",
        Direction::Descending => "NULLS LAST",
    };
    format!(
        "ORDER BY fields -> $4::text {dir} {nulls}, doc_id {dir}",
        dir = direction.as_sql(),
        nulls = nulls
    )
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    changes: ChangeFeed,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, changes: ChangeFeed) -> Self {
        Self { pool, changes }
    }

    /// Database clock, used for server timestamps
    async fn server_now(&self) -> StoreResult<DateTime<Utc>> {
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT clock_timestamp()")
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }

    async fn resolve(&self, fields: Fields) -> StoreResult<Map<String, Value>> {
        let now = if fields.has_server_timestamps() {
            self.server_now().await?
        } else {
            Utc::now()
        };
        Ok(fields.resolve(now))
    }

    /// Announce a write. The write already happened, so a failed publish
    /// only delays remote subscribers until the next change.
    async fn announce(&self, path: &DocPath) {
        let notice = ChangeNotice::for_doc(path);
        if let Err(e) = self.changes.publish(&notice).await {
            warn!(path = %path, error = %e, "Failed to publish document change");
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT path, fields
            FROM documents
            WHERE path = $1
            "#,
        )
        .bind(path.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    async fn list(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let sql = format!(
            r#"
            SELECT path, fields
            FROM documents
            WHERE collection = $1
              AND ($2::text IS NULL OR fields -> $2::text = $3::jsonb)
            {}
            LIMIT $5
            "#,
            order_clause(query)
        );

        let (filter_field, filter_value) = match &query.filter {
            Some(filter) => (Some(filter.field.clone()), Some(Json(filter.equals.clone()))),
            None => (None, None),
        };
        let order_field = query.order_by.as_ref().map(|o| o.field.clone());
        let limit = query.limit.map(|l| l as i64);

        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(query.collection.as_str())
            .bind(filter_field)
            .bind(filter_value)
            .bind(order_field)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        let fields = self.resolve(fields).await?;

        sqlx::query(
            r#"
            INSERT INTO documents (path, collection, doc_id, fields, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (path) DO UPDATE
            SET fields = EXCLUDED.fields, updated_at = NOW()
            "#,
        )
        .bind(path.as_str())
        .bind(path.collection().as_str())
        .bind(path.id())
        .bind(Json(fields))
        .execute(&self.pool)
        .await?;

        self.announce(path).await;
        Ok(())
    }

    async fn add(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<String> {
        let id = generate_id();
        let path = collection.doc(&id)?;
        self.set(&path, fields).await?;
        Ok(id)
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE path = $1 OR starts_with(path, $1 || '/')
            "#,
        )
        .bind(path.as_str())
        .execute(&self.pool)
        .await?;

        debug!(path = %path, removed = result.rows_affected(), "Deleted documents");
        if result.rows_affected() > 0 {
            self.announce(path).await;
        }
        Ok(())
    }

    async fn toggle(&self, path: &DocPath, fields: Fields) -> StoreResult<bool> {
        let fields = self.resolve(fields).await?;
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent toggles of the same path
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(path.as_str())
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM documents WHERE path = $1")
            .bind(path.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let present = if deleted > 0 {
            false
        } else {
            sqlx::query(
                r#"
                INSERT INTO documents (path, collection, doc_id, fields, updated_at)
                VALUES ($1, $2, $3, $4, NOW())
                "#,
            )
            .bind(path.as_str())
            .bind(path.collection().as_str())
            .bind(path.id())
            .bind(Json(fields))
            .execute(&mut *tx)
            .await?;
            true
        };

        tx.commit().await?;
        self.announce(path).await;
        Ok(present)
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        // Listen before the initial read so no change between the two is missed
        let pubsub = self.changes.listen().await?;
        let initial = self.list(&query).await?;

        let (sender, receiver) = Subscription::channel();
        let _ = sender.send(Ok(initial));

        let store = self.clone();
        let handle = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();

            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        error!(error = ?e, "Failed to read change payload");
                        continue;
                    }
                };
                let notice: ChangeNotice = match serde_json::from_str(&payload) {
                    Ok(n) => n,
                    Err(e) => {
                        error!(error = ?e, payload = %payload, "Malformed change notice");
                        continue;
                    }
                };
                if !notice.affects(&query.collection) {
                    continue;
                }

                let snapshot = store.list(&query).await;
                if sender.send(snapshot).is_err() {
                    return;
                }
            }

            warn!(collection = %query.collection, "Change listener ended");
            let _ = sender.send(Err(StoreError::Unavailable(
                "change feed closed".to_string(),
            )));
        });

        Ok(Subscription::new(receiver, move || handle.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::OrderBy;

    fn posts() -> CollectionPath {
        CollectionPath::new("posts").unwrap()
    }

    #[test]
    fn test_order_clause_descending() {
        let query = Query::collection(posts()).order_by(OrderBy::desc("createdAt"));
        assert_eq!(
            order_clause(&query),
            "ORDER BY fields -> $4::text DESC NULLS LAST, doc_id DESC"
        );
    }

    #[test]
    fn test_order_clause_ascending_and_default() {
        let query = Query::collection(posts()).order_by(OrderBy::asc("createdAt"));
        assert_eq!(
            order_clause(&query),
            "ORDER BY fields -> $4::text ASC NULLS FIRST, doc_id ASC"
        );
        assert_eq!(order_clause(&Query::collection(posts())), order_clause(&query));
    }

    #[test]
    fn test_row_with_collection_path_is_rejected() {
        let row = DocumentRow {
            path: "posts".to_string(),
            fields: Json(Map::new()),
        };
        assert!(row.into_document().is_err());
    }
}
