use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Publisher API endpoint settings.
///
/// When set, these take precedence over the publisher config stored through
/// the CLI for the current run, without being written to it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base endpoint of the publisher API (e.g. `https://host/api/forum-post`)
    #[serde(default)]
    pub url: String,
    /// Value sent as `X-API-KEY`
    pub key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// `"file"` (default) or `"memory"`
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Directory holding the per-key JSON state files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding copied images
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `"pretty"` (default) or `"json"`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("data/images")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("api.url", "")?
            .set_default("api.timeout_seconds", 30)?
            .set_default("storage.backend", "file")?
            .set_default("storage.data_dir", "data")?
            .set_default("storage.images_dir", "data/images")?
            .set_default("logging.level", "warn")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // PUBLISHER__API__URL, PUBLISHER__STORAGE__DATA_DIR, ...
            .add_source(
                Environment::with_prefix("PUBLISHER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            images_dir: default_images_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert!(settings.api.url.is_empty());
        assert_eq!(settings.api.timeout_seconds, 30);
        assert_eq!(settings.storage.backend, "file");
        assert_eq!(settings.storage.images_dir, PathBuf::from("data/images"));
        assert_eq!(settings.logging.format, "pretty");
    }
}
