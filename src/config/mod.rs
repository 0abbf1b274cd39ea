mod settings;

pub use settings::{ApiConfig, LoggingConfig, Settings, StorageConfig};
