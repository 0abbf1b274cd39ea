//! Native platform capabilities used by the draft state and the publisher.
//!
//! The application never touches image files or the publisher config file
//! directly; it goes through `PlatformBridge`, which makes every operation
//! return a typed result and lets tests swap the filesystem out.

mod fs_bridge;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fs_bridge::FsPlatformBridge;

/// Errors that can occur during platform operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Image name is not a plain file name
    #[error("Invalid image name: {0}")]
    InvalidName(String),

    /// Image does not exist
    #[error("Image not found: {0}")]
    NotFound(String),

    /// File is not a supported image type
    #[error("Not an image file: {0}")]
    UnsupportedImage(String),

    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Publisher endpoint and key as stored on the platform side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl PublisherConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_url.trim().is_empty()
    }
}

/// Fields to change in the stored publisher config; `None` keeps the old value
#[derive(Debug, Clone, Default)]
pub struct PublisherConfigUpdate {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

impl PublisherConfigUpdate {
    pub(crate) fn apply(self, config: &mut PublisherConfig) {
        if let Some(url) = self.api_url {
            config.api_url = url;
        }
        if let Some(key) = self.api_key {
            config.api_key = key;
        }
    }
}

/// Image attached to the draft, stored through the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub id: String,
    /// Stored image name as returned by `save_image`
    pub path: String,
    #[serde(default)]
    pub is_main: bool,
}

/// Image files and publisher config storage.
#[async_trait]
pub trait PlatformBridge: Send + Sync {
    /// Copy an image into the managed images directory, returning its stored name
    async fn save_image(&self, source: &Path) -> PlatformResult<String>;

    /// Read a stored image
    async fn read_image(&self, name: &str) -> PlatformResult<Vec<u8>>;

    /// Delete a stored image
    async fn delete_image(&self, name: &str) -> PlatformResult<()>;

    /// Size of a stored image in bytes
    async fn image_size(&self, name: &str) -> PlatformResult<u64>;

    /// Names of all stored images
    async fn list_images(&self) -> PlatformResult<Vec<String>>;

    /// Current publisher config (default when none was stored)
    async fn publisher_config(&self) -> PlatformResult<PublisherConfig>;

    /// Merge `update` into the stored publisher config and return the result
    async fn set_publisher_config(
        &self,
        update: PublisherConfigUpdate,
    ) -> PlatformResult<PublisherConfig>;
}

/// Lowercased extension of a file name
pub(crate) fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// MIME type of a file with a known image extension
pub fn image_mime_type(name: &str) -> Option<&'static str> {
    let mime = match file_extension(name)?.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "apng" => "image/apng",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => return None,
    };
    Some(mime)
}

/// Prefix added to stored images: `image_<millis>_`
const STORED_IMAGE_PREFIX: &str = "image_";

/// Stored name for an image copied at `millis`
pub fn stored_image_name(millis: i64, original: &str) -> String {
    format!("{}{}_{}", STORED_IMAGE_PREFIX, millis, original)
}

/// Original file name of a stored image (the `image_<millis>_` prefix removed).
///
/// Names that do not carry the prefix are returned unchanged.
pub fn original_file_name(stored: &str) -> &str {
    stored
        .strip_prefix(STORED_IMAGE_PREFIX)
        .and_then(|rest| rest.split_once('_'))
        .filter(|(millis, name)| {
            !millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit()) && !name.is_empty()
        })
        .map(|(_, name)| name)
        .unwrap_or(stored)
}
