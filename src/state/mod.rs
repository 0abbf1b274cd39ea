//! Application state.
//!
//! `AppState` owns the draft (templates, variables, bindings, post fields,
//! images) and the published history, and persists each piece under its own
//! key in a `StateStore` as soon as it changes. Persistence is best effort: a
//! failed write is logged and the in-memory state stays authoritative.

mod types;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::history::{HistoryError, HistoryResult, HistoryStore, PublishedPostRecord};
use crate::platform::{
    PlatformBridge, PlatformResult, PublisherConfig, PublisherConfigUpdate, UploadedImage,
};
use crate::publish::{
    PublishDraft, PublishOrchestrator, PublishOutcome, PublishPhase, PublishResult, PublishService,
};
use crate::storage::{keys, load_json, save_json, StateStore};
use crate::template::{
    placeholders, render, Template, TemplateResult, TemplateStore, INSTRUCTION_VARIABLE,
};
use crate::variable::{Bindings, RegistryResult, VariableDefinition, VariableRegistry};

pub use types::SavedTag;

/// Variable replaced by saved instructions; dropped when found in saved state
const LEGACY_INSTRUCTIONS_VARIABLE: &str = "install_instructions";

/// Read a key, falling back to `default` when it is missing or unreadable
fn load_or<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
    default: impl FnOnce() -> T,
) -> T {
    match load_json(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => default(),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Unreadable saved state, using default");
            default()
        }
    }
}

/// Draft and history owner.
pub struct AppState {
    store: Arc<dyn StateStore>,
    platform: Arc<dyn PlatformBridge>,
    orchestrator: PublishOrchestrator,
    history: Arc<HistoryStore>,

    registry: VariableRegistry,
    bindings: Bindings,
    templates: TemplateStore,
    current_template: usize,

    post_title: String,
    post_tags: String,
    saved_tags: Vec<SavedTag>,
    saved_instructions: BTreeMap<String, String>,
    saved_translators: Vec<String>,
    uploaded_images: Vec<UploadedImage>,

    editing_post_id: Option<String>,
    config_override: PublisherConfigUpdate,
}

impl AppState {
    /// Restore state from `store`; every key is read independently.
    pub fn load(
        store: Arc<dyn StateStore>,
        platform: Arc<dyn PlatformBridge>,
        service: Arc<dyn PublishService>,
    ) -> Self {
        let s = store.as_ref();

        let variables: Vec<VariableDefinition> = load_or(s, keys::VARIABLES, || {
            VariableRegistry::with_defaults().as_slice().to_vec()
        });
        let registry = VariableRegistry::new(
            variables
                .into_iter()
                .filter(|v| v.name != LEGACY_INSTRUCTIONS_VARIABLE)
                .collect(),
        );

        let mut bindings = Bindings::for_registry(&registry);
        bindings.merge(load_or(s, keys::BINDINGS, Bindings::new));
        let stale = bindings.retain_registered(&registry, &[INSTRUCTION_VARIABLE]);
        if stale > 0 {
            tracing::debug!(count = stale, "Dropped bindings of unknown variables");
        }

        let templates = TemplateStore::new(load_or(s, keys::TEMPLATES, || {
            TemplateStore::with_defaults().list().to_vec()
        }));
        let mut current_template: usize = load_or(s, keys::CURRENT_TEMPLATE, || 0);
        if current_template >= templates.count() {
            current_template = 0;
        }

        let history = Arc::new(HistoryStore::from_records(load_or(
            s,
            keys::PUBLISHED_POSTS,
            Vec::new,
        )));
        let post_title = load_or(s, keys::POST_TITLE, String::new);
        let post_tags = load_or(s, keys::POST_TAGS, String::new);
        let saved_tags = load_or(s, keys::SAVED_TAGS, Vec::new);
        let saved_instructions = load_or(s, keys::SAVED_INSTRUCTIONS, BTreeMap::new);
        let saved_translators = load_or(s, keys::SAVED_TRANSLATORS, Vec::new);
        let uploaded_images = load_or(s, keys::UPLOADED_IMAGES, Vec::new);
        let editing_post_id = load_or(s, keys::EDITING_POST, || None::<String>)
            .filter(|id| history.get(id).is_some());

        let orchestrator = PublishOrchestrator::new(service, platform.clone(), history.clone());
        let state = Self {
            store,
            platform,
            orchestrator,
            history,
            registry,
            bindings,
            templates,
            current_template,
            post_title,
            post_tags,
            saved_tags,
            saved_instructions,
            saved_translators,
            uploaded_images,
            editing_post_id,
            config_override: PublisherConfigUpdate::default(),
        };

        tracing::info!(
            backend = state.store.backend_type(),
            templates = state.templates.count(),
            variables = state.registry.len(),
            posts = state.history.len(),
            "State loaded"
        );
        state
    }

    /// Publisher settings that take precedence over the stored config
    /// without being written to it
    pub fn with_publisher_override(mut self, update: PublisherConfigUpdate) -> Self {
        self.config_override = update;
        self
    }

    fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = save_json(self.store.as_ref(), key, value) {
            tracing::warn!(key = %key, error = %e, "Failed to persist state");
        }
    }

    fn persist_variables(&self) {
        self.persist(keys::VARIABLES, self.registry.as_slice());
        self.persist(keys::BINDINGS, &self.bindings);
    }

    fn persist_templates(&self) {
        self.persist(keys::TEMPLATES, self.templates.list());
        self.persist(keys::CURRENT_TEMPLATE, &self.current_template);
    }

    fn persist_history(&self) {
        self.persist(keys::PUBLISHED_POSTS, &self.history.list());
    }

    // Accessors

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn current_template_index(&self) -> usize {
        self.current_template
    }

    pub fn current_template(&self) -> Option<&Template> {
        self.templates.get(self.current_template).ok()
    }

    pub fn post_title(&self) -> &str {
        &self.post_title
    }

    pub fn post_tags(&self) -> &str {
        &self.post_tags
    }

    pub fn saved_tags(&self) -> &[SavedTag] {
        &self.saved_tags
    }

    pub fn saved_instructions(&self) -> &BTreeMap<String, String> {
        &self.saved_instructions
    }

    pub fn saved_translators(&self) -> &[String] {
        &self.saved_translators
    }

    pub fn uploaded_images(&self) -> &[UploadedImage] {
        &self.uploaded_images
    }

    pub fn editing_post_id(&self) -> Option<&str> {
        self.editing_post_id.as_deref()
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn publish_phase(&self) -> PublishPhase {
        self.orchestrator.phase()
    }

    // Preview

    /// Rendered post for the selected template, empty when there is none
    pub fn preview(&self) -> String {
        self.render_template(self.current_template).unwrap_or_default()
    }

    /// Rendered post for any template, without changing the selection
    pub fn render_template(&self, index: usize) -> TemplateResult<String> {
        let template = self.templates.get(index)?;
        Ok(render(template, self.registry.as_slice(), &self.bindings))
    }

    /// Registered variables the selected template uses that have no value yet
    pub fn missing_fields(&self) -> Vec<String> {
        let Some(template) = self.current_template() else {
            return Vec::new();
        };
        placeholders(&template.body)
            .into_iter()
            .filter(|name| {
                self.registry.contains(name) && self.bindings.get(name).trim().is_empty()
            })
            .collect()
    }

    // Draft fields

    pub fn set_binding(&mut self, name: &str, value: impl Into<String>) {
        self.bindings.set(name, value);
        self.persist(keys::BINDINGS, &self.bindings);
    }

    pub fn set_post_title(&mut self, title: impl Into<String>) {
        self.post_title = title.into();
        self.persist(keys::POST_TITLE, &self.post_title);
    }

    pub fn set_post_tags(&mut self, tags: impl Into<String>) {
        self.post_tags = tags.into();
        self.persist(keys::POST_TAGS, &self.post_tags);
    }

    pub fn select_template(&mut self, index: usize) -> TemplateResult<()> {
        self.templates.get(index)?;
        self.current_template = index;
        self.persist(keys::CURRENT_TEMPLATE, &self.current_template);
        Ok(())
    }

    // Templates

    /// Add a template and return its generated id
    pub fn add_template(&mut self, template: Template) -> TemplateResult<String> {
        let id = self.templates.add(template)?.id.clone();
        self.persist_templates();
        Ok(id)
    }

    pub fn update_template(&mut self, index: usize, template: Template) -> TemplateResult<()> {
        self.templates.update(index, template)?;
        self.persist_templates();
        Ok(())
    }

    /// Delete a template; the selection goes back to the first template
    pub fn delete_template(&mut self, index: usize) -> TemplateResult<Template> {
        let removed = self.templates.delete(index)?;
        self.current_template = 0;
        self.persist_templates();
        Ok(removed)
    }

    // Variables

    pub fn add_variable(&mut self, var: VariableDefinition) -> RegistryResult<()> {
        self.registry.add(var, &mut self.bindings)?;
        self.persist_variables();
        Ok(())
    }

    pub fn update_variable(&mut self, index: usize, var: VariableDefinition) -> RegistryResult<()> {
        self.registry.update(index, var, &mut self.bindings)?;
        self.persist_variables();
        Ok(())
    }

    /// Delete a custom variable and its binding
    pub fn delete_variable(&mut self, index: usize) -> RegistryResult<VariableDefinition> {
        let removed = self.registry.delete(index, &mut self.bindings)?;
        self.persist_variables();
        Ok(removed)
    }

    // Saved tags, instructions and translators

    pub fn add_saved_tag(&mut self, tag: SavedTag) {
        self.saved_tags.push(tag);
        self.persist(keys::SAVED_TAGS, &self.saved_tags);
    }

    pub fn delete_saved_tag(&mut self, index: usize) -> Option<SavedTag> {
        if index >= self.saved_tags.len() {
            return None;
        }
        let removed = self.saved_tags.remove(index);
        self.persist(keys::SAVED_TAGS, &self.saved_tags);
        Some(removed)
    }

    pub fn save_instruction(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.saved_instructions.insert(name.into(), text.into());
        self.persist(keys::SAVED_INSTRUCTIONS, &self.saved_instructions);
    }

    pub fn delete_instruction(&mut self, name: &str) -> Option<String> {
        let removed = self.saved_instructions.remove(name)?;
        self.persist(keys::SAVED_INSTRUCTIONS, &self.saved_instructions);
        Some(removed)
    }

    /// Copy a saved instruction into the `instruction` binding
    pub fn apply_saved_instruction(&mut self, name: &str) -> bool {
        let Some(text) = self.saved_instructions.get(name).cloned() else {
            return false;
        };
        self.set_binding(INSTRUCTION_VARIABLE, text);
        true
    }

    /// Remember a translator name; names already saved are not repeated
    pub fn save_translator(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.saved_translators.iter().any(|t| t == name) {
            return false;
        }
        self.saved_translators.push(name.to_string());
        self.persist(keys::SAVED_TRANSLATORS, &self.saved_translators);
        true
    }

    pub fn delete_translator(&mut self, index: usize) -> Option<String> {
        if index >= self.saved_translators.len() {
            return None;
        }
        let removed = self.saved_translators.remove(index);
        self.persist(keys::SAVED_TRANSLATORS, &self.saved_translators);
        Some(removed)
    }

    // Images

    /// Copy an image into managed storage and attach it to the draft.
    ///
    /// The first attached image becomes the main image.
    pub async fn add_image(&mut self, source: &Path) -> PlatformResult<UploadedImage> {
        let path = self.platform.save_image(source).await?;
        let image = UploadedImage {
            id: format!("img_{}", Uuid::new_v4().simple()),
            path,
            is_main: self.uploaded_images.is_empty(),
        };
        self.uploaded_images.push(image.clone());
        self.persist(keys::UPLOADED_IMAGES, &self.uploaded_images);
        Ok(image)
    }

    /// Detach an image and delete its file.
    ///
    /// A failed file deletion is logged; the image is detached regardless.
    /// When the main image goes, the first remaining image takes its place.
    pub async fn remove_image(&mut self, index: usize) -> Option<UploadedImage> {
        let path = self.uploaded_images.get(index)?.path.clone();
        if let Err(e) = self.platform.delete_image(&path).await {
            tracing::warn!(image = %path, error = %e, "Failed to delete image file");
        }

        let removed = self.uploaded_images.remove(index);
        if !self.uploaded_images.iter().any(|img| img.is_main) {
            if let Some(first) = self.uploaded_images.first_mut() {
                first.is_main = true;
            }
        }
        self.persist(keys::UPLOADED_IMAGES, &self.uploaded_images);
        Some(removed)
    }

    /// Attached images with their stored size; `None` when the file is gone
    pub async fn image_sizes(&self) -> Vec<(UploadedImage, Option<u64>)> {
        let mut sized = Vec::with_capacity(self.uploaded_images.len());
        for image in &self.uploaded_images {
            let size = match self.platform.image_size(&image.path).await {
                Ok(size) => Some(size),
                Err(e) => {
                    tracing::debug!(image = %image.path, error = %e, "Image size unavailable");
                    None
                }
            };
            sized.push((image.clone(), size));
        }
        sized
    }

    /// Delete stored images that neither the draft nor a published post uses.
    ///
    /// Returns the deleted names; a failed deletion is logged and skipped.
    pub async fn prune_images(&self) -> PlatformResult<Vec<String>> {
        let history = self.history.list();
        let in_use = |name: &str| {
            self.uploaded_images.iter().any(|img| img.path == name)
                || history.iter().any(|post| post.image_path.as_deref() == Some(name))
        };

        let mut deleted = Vec::new();
        for name in self.platform.list_images().await? {
            if in_use(&name) {
                continue;
            }
            match self.platform.delete_image(&name).await {
                Ok(()) => deleted.push(name),
                Err(e) => tracing::warn!(image = %name, error = %e, "Failed to prune image"),
            }
        }
        if !deleted.is_empty() {
            tracing::info!(count = deleted.len(), "Pruned unused images");
        }
        Ok(deleted)
    }

    pub fn set_main_image(&mut self, index: usize) -> bool {
        if index >= self.uploaded_images.len() {
            return false;
        }
        for (i, image) in self.uploaded_images.iter_mut().enumerate() {
            image.is_main = i == index;
        }
        self.persist(keys::UPLOADED_IMAGES, &self.uploaded_images);
        true
    }

    // History

    /// Load a published post into the draft; the next publish updates it.
    ///
    /// `id` is a history record id or the post's Discord thread id.
    pub fn load_post_for_editing(&mut self, id: &str) -> HistoryResult<()> {
        let post = self.load_post(id)?;
        self.set_editing(Some(post.id));
        Ok(())
    }

    /// Load a published post into the draft as a new post.
    pub fn load_post_for_duplication(&mut self, id: &str) -> HistoryResult<()> {
        self.load_post(id)?;
        self.set_editing(None);
        Ok(())
    }

    fn load_post(&mut self, id: &str) -> HistoryResult<PublishedPostRecord> {
        let post = self
            .history
            .get(id)
            .or_else(|| self.history.find_by_thread(id))
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;

        self.set_post_title(post.title.clone());
        self.set_post_tags(post.tags.clone());
        if let Some(index) = self.templates.find_by_kind(&post.template_kind) {
            self.current_template = index;
            self.persist(keys::CURRENT_TEMPLATE, &self.current_template);
        }
        Ok(post)
    }

    pub fn cancel_editing(&mut self) {
        self.set_editing(None);
    }

    fn set_editing(&mut self, id: Option<String>) {
        self.editing_post_id = id;
        self.persist(keys::EDITING_POST, &self.editing_post_id);
    }

    pub fn delete_post(&mut self, id: &str) -> HistoryResult<PublishedPostRecord> {
        let removed = self.history.delete(id)?;
        if self.editing_post_id.as_deref() == Some(id) {
            self.set_editing(None);
        }
        self.persist_history();
        Ok(removed)
    }

    // Publishing

    pub async fn publisher_config(&self) -> PlatformResult<PublisherConfig> {
        self.platform.publisher_config().await
    }

    pub async fn set_publisher_config(
        &self,
        update: PublisherConfigUpdate,
    ) -> PlatformResult<PublisherConfig> {
        self.platform.set_publisher_config(update).await
    }

    /// Stored publisher config with overrides applied; an unreadable config
    /// counts as unset
    pub async fn effective_config(&self) -> PublisherConfig {
        let mut config = match self.platform.publisher_config().await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable publisher config");
                PublisherConfig::default()
            }
        };
        self.config_override.clone().apply(&mut config);
        config
    }

    /// Publish the draft with the selected template.
    ///
    /// A successful update leaves edit mode.
    pub async fn publish(&mut self) -> PublishResult<PublishOutcome> {
        let config = self.effective_config().await;
        let draft = PublishDraft {
            title: self.post_title.clone(),
            content: self.preview(),
            tags: self.post_tags.clone(),
            template_kind: self
                .current_template()
                .map(|t| t.kind.clone())
                .unwrap_or_default(),
            images: self.uploaded_images.clone(),
            editing_post_id: self.editing_post_id.clone(),
        };

        let outcome = self.orchestrator.publish(draft, &config).await?;
        if outcome.record().is_some() {
            self.persist_history();
        }
        if outcome.is_update() {
            self.set_editing(None);
        }
        Ok(outcome)
    }

    pub async fn check_connection(&self) -> PublishResult<u16> {
        let config = self.effective_config().await;
        self.orchestrator.check_connection(&config).await
    }
}
