use std::io::Cursor;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::path::validate_object_path;
use super::traits::{BoxReader, ObjectStore, StoredObject};
use crate::config::StorageConfig;

/// Object store backed by an S3-compatible bucket.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    public_base_url: String,
    max_size: u64,
}

impl S3ObjectStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", config.region));
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials).map_err(backend)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            public_base_url: config.public_base_url.clone(),
            max_size: config.max_object_size,
        })
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_not_found(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

fn check_status(path: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(path.to_string())),
        code => Err(StorageError::Backend(format!(
            "unexpected status {code} for '{path}'"
        ))),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let path = validate_object_path(path)?;
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let response = self
            .bucket
            .put_object_with_content_type(path, data, content_type)
            .await
            .map_err(backend)?;
        check_status(path, response.status_code())?;

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
        let path = validate_object_path(path)?;
        let response = match self.bucket.get_object(path).await {
            Ok(response) => response,
            Err(e) if is_not_found(&e) => return Err(StorageError::NotFound(path.to_string())),
            Err(e) => return Err(backend(e)),
        };
        check_status(path, response.status_code())?;
        Ok(Box::new(Cursor::new(response.bytes().to_vec())))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let path = validate_object_path(path)?;
        match self.bucket.head_object(path).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) => check_status(path, status).map(|()| true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    async fn size(&self, path: &str) -> Result<u64, StorageError> {
        let path = validate_object_path(path)?;
        let (head, status) = match self.bucket.head_object(path).await {
            Ok(result) => result,
            Err(e) if is_not_found(&e) => return Err(StorageError::NotFound(path.to_string())),
            Err(e) => return Err(backend(e)),
        };
        check_status(path, status)?;
        Ok(head.content_length.unwrap_or_default().max(0) as u64)
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let path = validate_object_path(path)?;
        if !self.exists(path).await? {
            return Ok(false);
        }
        let response = self.bucket.delete_object(path).await.map_err(backend)?;
        check_status(path, response.status_code())?;
        Ok(true)
    }
}
