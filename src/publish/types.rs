//! Publish request, response and error types

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::history::PublishedPostRecord;
use crate::template::TemplateKind;

/// Reasons a publish attempt can fail.
///
/// The first three are validation failures detected before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("Post title is empty")]
    EmptyTitle,

    #[error("Publisher endpoint is not configured")]
    MissingEndpoint,

    #[error("Template kind '{0}' cannot be published")]
    NotPublishable(TemplateKind),

    #[error("A publish is already in progress")]
    InProgress,

    /// Network failure or unreadable response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the publisher
    #[error("Publisher rejected the post ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl PublishError {
    /// Validation failures never reach the network
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PublishError::EmptyTitle | PublishError::MissingEndpoint | PublishError::NotPublishable(_)
        )
    }
}

/// Result type for publish operations
pub type PublishResult<T> = Result<T, PublishError>;

/// Image file sent with a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// File name announced in the multipart part
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub is_main: bool,
}

/// Everything the publisher receives for one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub title: String,
    pub content: String,
    pub tags: String,
    pub template_kind: TemplateKind,
    pub images: Vec<ImageAttachment>,
}

impl PublishRequest {
    /// Position of the main image in `images`
    pub fn main_image_index(&self) -> Option<usize> {
        self.images.iter().position(|img| img.is_main)
    }
}

/// Existing forum message to update instead of creating a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    pub thread_id: String,
    pub message_id: String,
}

/// Success body returned by the publisher; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublishResponse {
    #[serde(default, deserialize_with = "lenient_id")]
    pub thread_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub thread_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub forum_id: Option<u64>,
}

impl PublishResponse {
    /// Link to the thread, preferring `thread_url`
    pub fn link(&self) -> Option<&str> {
        self.thread_url
            .as_deref()
            .or(self.url.as_deref())
            .filter(|u| !u.is_empty())
    }

    /// Thread and message ids, when both were returned
    pub fn ids(&self) -> Option<(&str, &str)> {
        match (self.thread_id.as_deref(), self.message_id.as_deref()) {
            (Some(thread), Some(message)) if !thread.is_empty() && !message.is_empty() => {
                Some((thread, message))
            }
            _ => None,
        }
    }
}

/// Discord snowflakes may arrive as strings or numbers
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    }))
}

/// What a successful publish did to the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryChange {
    Created(PublishedPostRecord),
    Updated(PublishedPostRecord),
    /// The publisher did not return ids to track
    Untouched,
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub response: PublishResponse,
    pub history: HistoryChange,
}

impl PublishOutcome {
    pub fn url(&self) -> Option<&str> {
        self.response.link()
    }

    pub fn record(&self) -> Option<&PublishedPostRecord> {
        match &self.history {
            HistoryChange::Created(record) | HistoryChange::Updated(record) => Some(record),
            HistoryChange::Untouched => None,
        }
    }

    pub fn is_update(&self) -> bool {
        matches!(self.history, HistoryChange::Updated(_))
    }
}

/// Progress of a publish attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum PublishPhase {
    #[default]
    Idle = 0,
    Validating = 1,
    Rejected = 2,
    Sending = 3,
    Succeeded = 4,
    Failed = 5,
}

impl From<u8> for PublishPhase {
    fn from(value: u8) -> Self {
        match value {
            1 => PublishPhase::Validating,
            2 => PublishPhase::Rejected,
            3 => PublishPhase::Sending,
            4 => PublishPhase::Succeeded,
            5 => PublishPhase::Failed,
            _ => PublishPhase::Idle,
        }
    }
}

impl PublishPhase {
    /// True once an attempt has ended, whatever the result
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PublishPhase::Rejected | PublishPhase::Succeeded | PublishPhase::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_accepts_numeric_ids() {
        let response: PublishResponse = serde_json::from_str(
            r#"{"thread_id": 1234567890123, "message_id": "42", "forum_id": 99, "thread_url": null}"#,
        )
        .unwrap();

        assert_eq!(response.thread_id.as_deref(), Some("1234567890123"));
        assert_eq!(response.ids(), Some(("1234567890123", "42")));
        assert_eq!(response.forum_id, Some(99));
        assert_eq!(response.link(), None);
    }

    #[test]
    fn test_response_link_prefers_thread_url() {
        let response: PublishResponse = serde_json::from_str(
            r#"{"thread_url": "https://discord.com/channels/1/2", "url": "https://other"}"#,
        )
        .unwrap();
        assert_eq!(response.link(), Some("https://discord.com/channels/1/2"));
        assert_eq!(response.ids(), None);
    }

    #[test]
    fn test_main_image_index() {
        let image = |is_main| ImageAttachment {
            filename: "a.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![1],
            is_main,
        };
        let mut request = PublishRequest {
            title: "t".to_string(),
            content: String::new(),
            tags: String::new(),
            template_kind: TemplateKind::My,
            images: vec![image(false), image(true)],
        };
        assert_eq!(request.main_image_index(), Some(1));

        request.images.clear();
        assert_eq!(request.main_image_index(), None);
    }

    #[test]
    fn test_phase_round_trip() {
        for phase in [
            PublishPhase::Idle,
            PublishPhase::Validating,
            PublishPhase::Rejected,
            PublishPhase::Sending,
            PublishPhase::Succeeded,
            PublishPhase::Failed,
        ] {
            assert_eq!(PublishPhase::from(phase as u8), phase);
        }
        assert!(PublishPhase::Failed.is_terminal());
        assert!(!PublishPhase::Sending.is_terminal());
    }

    #[test]
    fn test_validation_errors() {
        assert!(PublishError::EmptyTitle.is_validation());
        assert!(!PublishError::InProgress.is_validation());
        assert!(!PublishError::Transport("x".into()).is_validation());
    }
}
