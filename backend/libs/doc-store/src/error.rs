//! Error types for document store operations

use thiserror::Error;

/// Document store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend unreachable or taken offline
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Malformed collection or document path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Document fields could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// PostgreSQL error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis connection or pub/sub error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Migration failure
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::InvalidPath("posts/".to_string());
        assert_eq!(err.to_string(), "Invalid path: posts/");

        let err = StoreError::Unavailable("offline".to_string());
        assert_eq!(err.to_string(), "Store unavailable: offline");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
