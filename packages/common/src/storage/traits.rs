use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Descriptor of an object after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    /// Public reference persisted on listings.
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

/// Per-path result of a best-effort bulk removal.
#[derive(Debug)]
pub struct RemoveOutcome {
    pub path: String,
    /// `Ok(true)` if removed, `Ok(false)` if it was already gone.
    pub result: Result<bool, StorageError>,
}

/// Path-addressed object storage for listing images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes at `path`, replacing any previous object.
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;

    /// Base URL that object paths are appended to.
    fn public_base_url(&self) -> &str;

    /// Publicly resolvable reference for `path`.
    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url().trim_end_matches('/'), path)
    }

    /// Map a reference produced by [`ObjectStore::public_url`] back to its path.
    ///
    /// Returns `None` for references this store does not own (e.g. placeholders).
    fn object_path(&self, reference: &str) -> Option<String> {
        let base = self.public_base_url().trim_end_matches('/');
        let path = reference.strip_prefix(base)?.strip_prefix('/')?;
        let path = path.split(['?', '#']).next().unwrap_or_default();
        super::validate_object_path(path).ok().map(str::to_owned)
    }

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, path: &str) -> Result<BoxReader, StorageError>;

    /// Retrieve all bytes of an object.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Check whether an object exists.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Get the size of an object in bytes.
    async fn size(&self, path: &str) -> Result<u64, StorageError>;

    /// Delete one object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    /// Delete several objects, one at a time. Failures are reported per path, never raised.
    async fn remove(&self, paths: &[String]) -> Vec<RemoveOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.delete(path).await;
            if let Err(e) = &result {
                warn!(path = %path, error = %e, "Failed to remove object");
            }
            outcomes.push(RemoveOutcome {
                path: path.clone(),
                result,
            });
        }
        outcomes
    }
}
