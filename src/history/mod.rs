//! Published post history.
//!
//! Records are created by a successful publish, patched by a successful
//! re-publish in edit mode and removed only on explicit request. The store is
//! shared between the application state and the publish orchestrator, so
//! every operation takes `&self`.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::template::TemplateKind;

/// History-specific error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Published post not found: {0}")]
    NotFound(String),

    #[error("Published post already exists: {0}")]
    AlreadyExists(String),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// A post that was published to the forum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPostRecord {
    /// Local identifier
    pub id: String,

    /// Last publish time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    pub title: String,

    /// Rendered post text as sent
    pub content: String,

    /// Comma-separated tags
    pub tags: String,

    #[serde(rename = "template")]
    pub template_kind: TemplateKind,

    /// Main image file name, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,

    /// Forum thread id assigned by Discord
    pub thread_id: String,

    /// First message id assigned by Discord
    pub message_id: String,

    /// Link to the thread
    #[serde(rename = "discordUrl", alias = "url", default)]
    pub url: String,

    #[serde(default)]
    pub forum_id: u64,
}

impl PublishedPostRecord {
    /// Create a record with a fresh local id and the current time
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        tags: impl Into<String>,
        template_kind: TemplateKind,
        thread_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("post_{}", Uuid::new_v4().simple()),
            timestamp: Utc::now(),
            title: title.into(),
            content: content.into(),
            tags: tags.into(),
            template_kind,
            image_path: None,
            thread_id: thread_id.into(),
            message_id: message_id.into(),
            url: String::new(),
            forum_id: 0,
        }
    }
}

/// Partial update applied to an existing record
#[derive(Debug, Clone, Default)]
pub struct HistoryUpdate {
    pub timestamp: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<String>,
    pub template_kind: Option<TemplateKind>,
    /// `Some(None)` clears the image
    pub image_path: Option<Option<String>>,
    pub url: Option<String>,
}

impl HistoryUpdate {
    fn apply(self, record: &mut PublishedPostRecord) {
        if let Some(timestamp) = self.timestamp {
            record.timestamp = timestamp;
        }
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(content) = self.content {
            record.content = content;
        }
        if let Some(tags) = self.tags {
            record.tags = tags;
        }
        if let Some(kind) = self.template_kind {
            record.template_kind = kind;
        }
        if let Some(image_path) = self.image_path {
            record.image_path = image_path;
        }
        if let Some(url) = self.url {
            record.url = url;
        }
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    seq: u64,
    record: PublishedPostRecord,
}

/// Published post storage, listed newest first
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: DashMap<String, HistoryEntry>,
    next_seq: AtomicU64,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store from a newest-first list
    pub fn from_records(records: Vec<PublishedPostRecord>) -> Self {
        let store = Self::new();
        for record in records.into_iter().rev() {
            if let Err(e) = store.add(record) {
                tracing::warn!(error = %e, "Skipping duplicate history record");
            }
        }
        store
    }

    /// Add a record in front of the list
    pub fn add(&self, record: PublishedPostRecord) -> HistoryResult<()> {
        if self.entries.contains_key(&record.id) {
            return Err(HistoryError::AlreadyExists(record.id));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries
            .insert(record.id.clone(), HistoryEntry { seq, record });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<PublishedPostRecord> {
        self.entries.get(id).map(|e| e.record.clone())
    }

    /// Find the record of a Discord thread
    pub fn find_by_thread(&self, thread_id: &str) -> Option<PublishedPostRecord> {
        self.entries
            .iter()
            .find(|e| e.record.thread_id == thread_id)
            .map(|e| e.record.clone())
    }

    /// Apply a partial update, keeping the record's position
    pub fn update(&self, id: &str, update: HistoryUpdate) -> HistoryResult<PublishedPostRecord> {
        let mut entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;
        update.apply(&mut entry.record);
        Ok(entry.record.clone())
    }

    pub fn delete(&self, id: &str) -> HistoryResult<PublishedPostRecord> {
        self.entries
            .remove(id)
            .map(|(_, e)| e.record)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }

    /// All records, newest first
    pub fn list(&self) -> Vec<PublishedPostRecord> {
        let mut entries: Vec<HistoryEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries.into_iter().map(|e| e.record).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
