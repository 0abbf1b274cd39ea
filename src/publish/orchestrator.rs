//! Publish orchestration.
//!
//! One attempt moves through `Validating -> {Rejected | Sending} ->
//! {Succeeded | Failed}`. Validation is local and always precedes the network
//! call; history is only written after the publisher accepted the post. At
//! most one attempt runs at a time.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::history::{HistoryStore, HistoryUpdate, PublishedPostRecord};
use crate::platform::{
    file_extension, image_mime_type, original_file_name, PlatformBridge, PublisherConfig,
    UploadedImage,
};
use crate::template::TemplateKind;

use super::service::PublishService;
use super::types::{
    EditTarget, HistoryChange, ImageAttachment, PublishError, PublishOutcome, PublishPhase,
    PublishRequest, PublishResponse, PublishResult,
};

/// Draft content handed to the orchestrator
#[derive(Debug, Clone, Default)]
pub struct PublishDraft {
    pub title: String,
    /// Rendered post text
    pub content: String,
    pub tags: String,
    pub template_kind: TemplateKind,
    pub images: Vec<UploadedImage>,
    /// History record to update instead of creating a new post
    pub editing_post_id: Option<String>,
}

/// Check a draft before anything is sent.
///
/// Reports the first failure in the order: empty title, missing endpoint,
/// non-publishable template.
pub fn validate(
    title: &str,
    template_kind: &TemplateKind,
    config: &PublisherConfig,
) -> PublishResult<()> {
    if title.trim().is_empty() {
        return Err(PublishError::EmptyTitle);
    }
    if !config.is_configured() {
        return Err(PublishError::MissingEndpoint);
    }
    if !template_kind.is_publishable() {
        return Err(PublishError::NotPublishable(template_kind.clone()));
    }
    Ok(())
}

/// MIME type announced for an image, from its extension.
///
/// Unknown extensions map to `image/<ext>` when they form a valid MIME
/// subtype, else to `application/octet-stream`.
pub fn mime_type_for(name: &str) -> String {
    if let Some(mime) = image_mime_type(name) {
        return mime.to_string();
    }
    match file_extension(name) {
        Some(ext)
            if !ext.is_empty()
                && ext
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            format!("image/{}", ext)
        }
        _ => "application/octet-stream".to_string(),
    }
}

/// Clears the in-flight flag when the attempt ends, whichever way it ends
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Validates, sends and records published posts.
pub struct PublishOrchestrator {
    service: Arc<dyn PublishService>,
    platform: Arc<dyn PlatformBridge>,
    history: Arc<HistoryStore>,
    in_flight: AtomicBool,
    phase: AtomicU8,
}

impl PublishOrchestrator {
    pub fn new(
        service: Arc<dyn PublishService>,
        platform: Arc<dyn PlatformBridge>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            service,
            platform,
            history,
            in_flight: AtomicBool::new(false),
            phase: AtomicU8::new(PublishPhase::Idle as u8),
        }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Phase of the current attempt, or the final phase of the last one
    pub fn phase(&self) -> PublishPhase {
        PublishPhase::from(self.phase.load(Ordering::Acquire))
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: PublishPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Publish a draft.
    ///
    /// Returns `InProgress` without side effects while another attempt is
    /// running. When the publisher answers with thread ids, exactly one
    /// history change is made: the edited record is updated, or a new record
    /// is added in front.
    #[tracing::instrument(
        name = "publish.publish",
        skip(self, draft, config),
        fields(
            template = %draft.template_kind,
            images = draft.images.len(),
            editing = draft.editing_post_id.is_some()
        )
    )]
    pub async fn publish(
        &self,
        draft: PublishDraft,
        config: &PublisherConfig,
    ) -> PublishResult<PublishOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("Publish ignored, another publish is in flight");
            return Err(PublishError::InProgress);
        };

        self.set_phase(PublishPhase::Validating);
        if let Err(e) = validate(&draft.title, &draft.template_kind, config) {
            self.set_phase(PublishPhase::Rejected);
            tracing::info!(reason = %e, "Publish rejected");
            return Err(e);
        }

        let editing = self.edit_target(draft.editing_post_id.as_deref());
        let images = self.collect_images(&draft.images).await;
        let request = PublishRequest {
            title: draft.title.trim().to_string(),
            content: draft.content.clone(),
            tags: draft.tags.clone(),
            template_kind: draft.template_kind.clone(),
            images,
        };

        self.set_phase(PublishPhase::Sending);
        let api_key = Some(config.api_key.as_str()).filter(|k| !k.is_empty());
        let result = self
            .service
            .publish(
                config.api_url.trim(),
                api_key,
                request,
                editing.as_ref().map(|(_, target)| target),
            )
            .await;

        match result {
            Ok(response) => {
                let history = self.record(draft, editing.map(|(id, _)| id), &response);
                self.set_phase(PublishPhase::Succeeded);
                tracing::info!(
                    url = response.link().unwrap_or_default(),
                    updated = matches!(history, HistoryChange::Updated(_)),
                    "Post published"
                );
                Ok(PublishOutcome { response, history })
            }
            Err(e) => {
                self.set_phase(PublishPhase::Failed);
                tracing::warn!(error = %e, "Publish failed");
                Err(e)
            }
        }
    }

    /// Test the configured endpoint
    pub async fn check_connection(&self, config: &PublisherConfig) -> PublishResult<u16> {
        let api_key = Some(config.api_key.as_str()).filter(|k| !k.is_empty());
        self.service
            .check_connection(config.api_url.trim(), api_key)
            .await
    }

    /// Record to update, when the edited post still exists and has Discord ids
    fn edit_target(&self, editing_post_id: Option<&str>) -> Option<(String, EditTarget)> {
        let id = editing_post_id?;
        match self.history.get(id) {
            Some(record) if !record.thread_id.is_empty() && !record.message_id.is_empty() => Some((
                record.id,
                EditTarget {
                    thread_id: record.thread_id,
                    message_id: record.message_id,
                },
            )),
            Some(_) => {
                tracing::warn!(post_id = %id, "Edited post has no thread ids, publishing as new");
                None
            }
            None => {
                tracing::warn!(post_id = %id, "Edited post not in history, publishing as new");
                None
            }
        }
    }

    /// Read every draft image; unreadable images are left out
    async fn collect_images(&self, images: &[UploadedImage]) -> Vec<ImageAttachment> {
        let mut attachments = Vec::with_capacity(images.len());
        for image in images {
            match self.platform.read_image(&image.path).await {
                Ok(bytes) => attachments.push(ImageAttachment {
                    filename: original_file_name(&image.path).to_string(),
                    mime: mime_type_for(&image.path),
                    bytes,
                    is_main: image.is_main,
                }),
                Err(e) => {
                    tracing::warn!(image = %image.path, error = %e, "Skipping unreadable image");
                }
            }
        }
        attachments
    }

    fn record(
        &self,
        draft: PublishDraft,
        editing_id: Option<String>,
        response: &PublishResponse,
    ) -> HistoryChange {
        let main_image = draft
            .images
            .iter()
            .find(|img| img.is_main)
            .map(|img| img.path.clone());
        let url = response.link().map(str::to_string);

        let Some((thread_id, message_id)) = response.ids() else {
            tracing::warn!("Publisher returned no thread ids, history not updated");
            return HistoryChange::Untouched;
        };

        if let Some(id) = editing_id {
            let update = HistoryUpdate {
                timestamp: Some(Utc::now()),
                title: Some(draft.title.trim().to_string()),
                content: Some(draft.content),
                tags: Some(draft.tags),
                template_kind: Some(draft.template_kind),
                image_path: Some(main_image),
                url,
            };
            return match self.history.update(&id, update) {
                Ok(record) => HistoryChange::Updated(record),
                Err(e) => {
                    tracing::warn!(post_id = %id, error = %e, "Could not update history record");
                    HistoryChange::Untouched
                }
            };
        }

        let mut record = PublishedPostRecord::new(
            draft.title.trim(),
            draft.content,
            draft.tags,
            draft.template_kind,
            thread_id,
            message_id,
        );
        record.image_path = main_image;
        record.url = url.unwrap_or_default();
        record.forum_id = response.forum_id.unwrap_or(0);

        match self.history.add(record.clone()) {
            Ok(()) => HistoryChange::Created(record),
            Err(e) => {
                tracing::warn!(error = %e, "Could not add history record");
                HistoryChange::Untouched
            }
        }
    }
}
