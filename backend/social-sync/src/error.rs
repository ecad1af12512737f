use doc_store::StoreError;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("upload failed: {0}")]
    UploadError(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidPath(msg) => SyncError::InvalidArgument(msg),
            other => SyncError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        let err: SyncError = StoreError::InvalidPath("chats//messages".into()).into();
        assert_eq!(err, SyncError::InvalidArgument("chats//messages".into()));

        let err: SyncError = StoreError::Unavailable("offline".into()).into();
        assert_eq!(
            err,
            SyncError::StoreUnavailable("Store unavailable: offline".into())
        );
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::NotFound("post p1".into());
        assert_eq!(err.to_string(), "not found: post p1");
    }
}
