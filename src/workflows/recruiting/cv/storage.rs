use async_trait::async_trait;

use crate::workflows::recruiting::applications::domain::StorageToken;

/// Read side of the CV upload backend. Uploads happen on the profile
/// surface; the worker only ever reads the bytes behind a token.
#[async_trait]
pub trait CvBlobStore: Send + Sync {
    async fn open_read(&self, token: &StorageToken) -> Result<Vec<u8>, BlobError>;
}

/// Blob access error.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("stored object not found: {0}")]
    Missing(StorageToken),
    #[error("storage backend error: {0}")]
    Backend(String),
}
