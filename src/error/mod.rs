use thiserror::Error;

use crate::history::HistoryError;
use crate::platform::PlatformError;
use crate::publish::PublishError;
use crate::storage::StoreError;
use crate::telemetry::TelemetryError;
use crate::template::TemplateError;
use crate::variable::RegistryError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Variable(#[from] RegistryError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    /// Stable error code shown next to the message
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Telemetry(_) => "TELEMETRY_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Io { .. } => "IO_ERROR",
            AppError::Publish(e) if e.is_validation() => "VALIDATION_ERROR",
            AppError::Publish(PublishError::InProgress) => "PUBLISH_IN_PROGRESS",
            AppError::Publish(_) => "PUBLISH_FAILED",
            AppError::Template(TemplateError::NotFound(_))
            | AppError::Variable(RegistryError::NotFound(_))
            | AppError::History(HistoryError::NotFound(_))
            | AppError::Platform(PlatformError::NotFound(_)) => "NOT_FOUND",
            AppError::Template(_)
            | AppError::Variable(_)
            | AppError::History(_)
            | AppError::Platform(PlatformError::UnsupportedImage(_)) => {
                "VALIDATION_ERROR"
            }
            AppError::Platform(_) => "PLATFORM_ERROR",
            AppError::Store(_) => "STORAGE_ERROR",
        }
    }

    /// Log the error and return the line shown to the user
    pub fn report(&self) -> String {
        let code = self.code();
        let message = self.to_string();
        tracing::error!(code = %code, message = %message, "Command failed");
        format!("error[{}]: {}", code, message)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateKind;

    #[test]
    fn test_codes() {
        assert_eq!(
            AppError::from(PublishError::EmptyTitle).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::from(PublishError::NotPublishable(TemplateKind::Untyped)).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::from(PublishError::InProgress).code(),
            "PUBLISH_IN_PROGRESS"
        );
        assert_eq!(
            AppError::from(PublishError::Transport("timeout".into())).code(),
            "PUBLISH_FAILED"
        );
        assert_eq!(
            AppError::from(HistoryError::NotFound("post_1".into())).code(),
            "NOT_FOUND"
        );
        assert_eq!(
            AppError::from(RegistryError::BuiltIn("overview".into())).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::from(PlatformError::UnsupportedImage("notes.txt".into())).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::from(PlatformError::InvalidName("..".into())).code(),
            "PLATFORM_ERROR"
        );
    }

    #[test]
    fn test_report_includes_code_and_message() {
        let line = AppError::from(PublishError::MissingEndpoint).report();
        assert_eq!(
            line,
            "error[VALIDATION_ERROR]: Publisher endpoint is not configured"
        );
    }
}
