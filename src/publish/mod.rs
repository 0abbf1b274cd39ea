//! Publishing rendered posts to the Discord forum publisher.
//!
//! - `PublishService`: the remote publisher (`HttpPublishService` over reqwest)
//! - `PublishOrchestrator`: validation, single-flight guard, image packaging
//!   and history bookkeeping around a service call

mod orchestrator;
mod service;
mod types;

pub use orchestrator::{mime_type_for, validate, PublishDraft, PublishOrchestrator};
pub use service::{HttpPublishService, PublishService};
pub use types::{
    EditTarget, HistoryChange, ImageAttachment, PublishError, PublishOutcome, PublishPhase,
    PublishRequest, PublishResponse, PublishResult,
};
