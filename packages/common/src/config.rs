use std::path::PathBuf;

use serde::Deserialize;

/// Which object store implementation backs listing images.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// Object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend kind. Default: "filesystem".
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory of the filesystem backend. Default: "./data/media".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Base URL that object paths are appended to when building public references.
    /// Default: "/media".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Bucket name (S3 backend). Default: "umkm-images".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Bucket region (S3 backend). Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Use path-style bucket addressing. Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
    /// Largest object accepted by the store, in bytes. Default: 10 MiB.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/media")
}
fn default_public_base_url() -> String {
    "/media".into()
}
fn default_bucket() -> String {
    "umkm-images".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_path_style() -> bool {
    true
}
fn default_max_object_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            path_style: default_path_style(),
            max_object_size: default_max_object_size(),
        }
    }
}

/// Rules applied to listing image uploads.
#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    /// Maximum size of one image, in bytes. Default: 5 MiB.
    #[serde(default = "default_max_image_bytes")]
    pub max_bytes: u64,
    /// Accepted MIME types.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Reference used when the main image upload fails.
    /// `{name}` is replaced with the percent-encoded listing name.
    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: String,
}

fn default_max_image_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_allowed_types() -> Vec<String> {
    ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_placeholder_url() -> String {
    "https://via.placeholder.com/800x600/2F6B4F/FFFFFF?text={name}".into()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_image_bytes(),
            allowed_types: default_allowed_types(),
            placeholder_url: default_placeholder_url(),
        }
    }
}

/// Slug uniqueness probing.
#[derive(Debug, Deserialize, Clone)]
pub struct SlugConfig {
    /// Number of candidates probed before giving up. Default: 100.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    100
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}
