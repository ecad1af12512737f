//! User directory: conversation picker listing and profile lookups

use std::sync::Arc;

use doc_store::{CollectionPath, DocumentStore, Query};
use tracing::{debug, warn};

use crate::domain::{SessionContext, User};
use crate::error::{SyncError, SyncResult};

pub(crate) fn users_collection() -> SyncResult<CollectionPath> {
    Ok(CollectionPath::new("users")?)
}

#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn DocumentStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Every user except the session user, ordered by id
    pub async fn list_users(&self, ctx: &SessionContext) -> SyncResult<Vec<User>> {
        let docs = self.store.list(&Query::collection(users_collection()?)).await?;

        let users: Vec<User> = docs
            .iter()
            .filter(|doc| doc.id() != ctx.user_id)
            .filter_map(|doc| match doc.decode::<User>() {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(user_id = %doc.id(), error = %e, "Skipping malformed user profile");
                    None
                }
            })
            .collect();

        debug!(count = users.len(), "Listed directory users");
        Ok(users)
    }

    /// One user profile
    pub async fn profile(&self, user_id: &str) -> SyncResult<User> {
        self.find(user_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("user {}", user_id)))
    }

    /// Profile if the user document exists
    pub async fn find(&self, user_id: &str) -> SyncResult<Option<User>> {
        let path = users_collection()?.doc(user_id)?;
        match self.store.get(&path).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }
}
