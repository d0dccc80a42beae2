use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::config::ImageConfig;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;
const DEFAULT_EXTENSION: &str = "jpg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("'{file_name}' is empty")]
    Empty { file_name: String },

    #[error("'{file_name}' is {size} bytes; the maximum is {limit} bytes")]
    TooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },

    #[error("'{file_name}' has unsupported type '{content_type}'")]
    UnsupportedType {
        file_name: String,
        content_type: String,
    },

    #[error("Image '{0}' is not part of this listing")]
    UnknownReference(String),

    #[error("No additional image at position {0}")]
    NoSuchIndex(usize),
}

/// A locally received image file that has not been stored yet.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload; the content type falls back to a guess from the file name.
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map(|ct| ct.to_ascii_lowercase())
            .or_else(|| {
                mime_guess::from_path(&file_name)
                    .first()
                    .map(|m| m.essence_str().to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Self {
            file_name,
            content_type,
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lowercased extension of the original file name, `jpg` if it has none.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Size and type rules for uploads.
#[derive(Debug, Clone)]
pub struct ImageRules {
    pub max_bytes: u64,
    pub allowed_types: Vec<String>,
}

impl From<&ImageConfig> for ImageRules {
    fn from(config: &ImageConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            allowed_types: config
                .allowed_types
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Default for ImageRules {
    fn default() -> Self {
        Self::from(&ImageConfig::default())
    }
}

/// Check an upload against the size and type rules before it may enter a slot.
pub fn validate_upload(upload: &ImageUpload, rules: &ImageRules) -> Result<(), ImageError> {
    if upload.data.is_empty() {
        return Err(ImageError::Empty {
            file_name: upload.file_name.clone(),
        });
    }
    if upload.size() > rules.max_bytes {
        return Err(ImageError::TooLarge {
            file_name: upload.file_name.clone(),
            size: upload.size(),
            limit: rules.max_bytes,
        });
    }
    if !rules.allowed_types.iter().any(|t| *t == upload.content_type) {
        return Err(ImageError::UnsupportedType {
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
        });
    }
    Ok(())
}

/// Object store namespace an image is uploaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageNamespace {
    Main,
    Additional,
}

impl ImageNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Additional => "additional",
        }
    }
}

/// Collision-resistant object path: `{namespace}/{millis}-{random}.{ext}`.
pub fn object_name(namespace: ImageNamespace, upload: &ImageUpload, now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();

    format!(
        "{}/{}-{}.{}",
        namespace.as_str(),
        now.timestamp_millis(),
        suffix,
        upload.extension()
    )
}
