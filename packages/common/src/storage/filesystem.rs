use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::path::validate_object_path;
use super::traits::{BoxReader, ObjectStore, StoredObject};

/// Filesystem-backed object store.
///
/// Objects live at `{base_path}/{object path}`; writes go through a temp file
/// in `{base_path}/.tmp` and are moved into place with a rename.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    public_base_url: String,
    max_size: u64,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into(),
            max_size,
        })
    }

    /// Compute the filesystem path for a validated object path.
    fn object_file(&self, path: &str) -> Result<PathBuf, StorageError> {
        let path = validate_object_path(path)?;
        if path.starts_with(".tmp") {
            return Err(StorageError::InvalidPath(format!("'{path}' is reserved")));
        }
        Ok(self.base_path.join(path))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let object_file = self.object_file(path)?;

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = object_file.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_file).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(StoredObject {
            path: path.to_string(),
            url: self.public_url(path),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    async fn get_stream(&self, path: &str) -> Result<BoxReader, StorageError> {
        let object_file = self.object_file(path)?;
        match fs::File::open(&object_file).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let object_file = self.object_file(path)?;
        Ok(fs::try_exists(&object_file).await?)
    }

    async fn size(&self, path: &str) -> Result<u64, StorageError> {
        let object_file = self.object_file(path)?;
        match fs::metadata(&object_file).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let object_file = self.object_file(path)?;
        match fs::remove_file(&object_file).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
