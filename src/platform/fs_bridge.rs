//! Filesystem implementation of the platform bridge.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::config::StorageConfig;

use super::{
    image_mime_type, stored_image_name, PlatformBridge, PlatformError, PlatformResult, PublisherConfig,
    PublisherConfigUpdate,
};

const PUBLISHER_CONFIG_FILE: &str = "publisher_config.json";

/// Platform bridge over a local images directory and a JSON config file.
#[derive(Debug, Clone)]
pub struct FsPlatformBridge {
    images_dir: PathBuf,
    config_path: PathBuf,
}

impl FsPlatformBridge {
    pub fn new(images_dir: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            config_path: config_path.into(),
        }
    }

    /// Images under `images_dir`, config in `<data_dir>/publisher_config.json`
    pub fn from_settings(settings: &StorageConfig) -> Self {
        Self::new(
            settings.images_dir.clone(),
            settings.data_dir.join(PUBLISHER_CONFIG_FILE),
        )
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Resolve a stored image name, refusing anything but a plain file name
    fn image_path(&self, name: &str) -> PlatformResult<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().is_some();
        if !plain {
            return Err(PlatformError::InvalidName(name.to_string()));
        }
        Ok(self.images_dir.join(name))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PlatformError {
    PlatformError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn not_found_or_io(name: &str, path: &Path, e: std::io::Error) -> PlatformError {
    if e.kind() == ErrorKind::NotFound {
        PlatformError::NotFound(name.to_string())
    } else {
        io_error(path, e)
    }
}

#[async_trait]
impl PlatformBridge for FsPlatformBridge {
    async fn save_image(&self, source: &Path) -> PlatformResult<String> {
        let original = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PlatformError::InvalidName(source.display().to_string()))?;
        if image_mime_type(original).is_none() {
            return Err(PlatformError::UnsupportedImage(original.to_string()));
        }

        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .map_err(|e| io_error(&self.images_dir, e))?;

        let name = stored_image_name(Utc::now().timestamp_millis(), original);
        let dest = self.images_dir.join(&name);
        tokio::fs::copy(source, &dest)
            .await
            .map_err(|e| not_found_or_io(&source.display().to_string(), source, e))?;

        tracing::debug!(source = %source.display(), name = %name, "Image saved");
        Ok(name)
    }

    async fn read_image(&self, name: &str) -> PlatformResult<Vec<u8>> {
        let path = self.image_path(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(name, &path, e))
    }

    async fn delete_image(&self, name: &str) -> PlatformResult<()> {
        let path = self.image_path(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(name, &path, e))?;

        tracing::debug!(name = %name, "Image deleted");
        Ok(())
    }

    async fn image_size(&self, name: &str) -> PlatformResult<u64> {
        let path = self.image_path(name)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(name, &path, e))?;
        Ok(metadata.len())
    }

    async fn list_images(&self) -> PlatformResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.images_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.images_dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.images_dir, e))?
        {
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn publisher_config(&self) -> PlatformResult<PublisherConfig> {
        match tokio::fs::read_to_string(&self.config_path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(PublisherConfig::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PublisherConfig::default()),
            Err(e) => Err(io_error(&self.config_path, e)),
        }
    }

    async fn set_publisher_config(
        &self,
        update: PublisherConfigUpdate,
    ) -> PlatformResult<PublisherConfig> {
        let mut config = match self.publisher_config().await {
            Ok(config) => config,
            Err(PlatformError::Serialization(e)) => {
                tracing::warn!(error = %e, "Replacing unreadable publisher config");
                PublisherConfig::default()
            }
            Err(e) => return Err(e),
        };
        update.apply(&mut config);

        if let Some(parent) = self.config_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let raw = serde_json::to_string_pretty(&config)?;
        tokio::fs::write(&self.config_path, raw)
            .await
            .map_err(|e| io_error(&self.config_path, e))?;

        tracing::info!(api_url = %config.api_url, "Publisher config updated");
        Ok(config)
    }
}
