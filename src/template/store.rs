//! Ordered template storage with CRUD operations

use super::types::{slugify, Template, TemplateError, TemplateKind, TemplateResult};

const MINE_BODY: &str = "## :flag_fr: [game_name] est disponible en français ! :tada:

Salut l'équipe ! Le patch est enfin prêt, vous pouvez l'installer dès maintenant pour profiter du titre dans notre langue. Bon jeu à tous ! :point_down:

### :computer: Infos du Mod & Liens de Téléchargement
* **Titre du jeu :** [game_name]
* **Version du jeu :** [game_version]
* **Version traduite :** [translate_version]
* **Lien du jeu (VO) :** [Accès au jeu original]([game_link])
* **Lien de la Traduction :** [Téléchargez la traduction FR ici !]([translate_link])
> **Synopsis du jeu :**
> [overview]
[instruction]
### :sparkling_heart: Soutenez le Traducteur !
Pour m'encourager et soutenir mes efforts :
* **Soutien au Traducteur (Moi !) :** [Offrez-moi un café pour le temps passé !](https://discord.com/channels/1417811606674477139/1433930090349330493)";

const PARTNER_BODY: &str = "## :flag_fr: [game_name] est disponible en français ! :tada:

Salut l'équipe ! Le patch est enfin prêt, vous pouvez l'installer dès maintenant pour profiter du titre dans notre langue. Bon jeu à tous ! :point_down:

### :computer: Infos du Mod & Liens de Téléchargement
* **Traducteur :** [translator]
* **Titre du jeu :** [game_name]
* **Version du jeu :** [game_version]
* **Version traduite :** [translate_version]
* **Lien du jeu (VO) :** [Accès au jeu original]([game_link])
* **Lien de la Traduction :** [Téléchargez la traduction FR ici !]([translate_link])
> **Synopsis du jeu :**
> [overview]
[instruction]";

/// Ordered template storage.
///
/// Ids are unique. Templates are addressed by position, matching how the
/// current selection is tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateStore {
    templates: Vec<Template>,
}

impl TemplateStore {
    /// Create a store from saved templates.
    ///
    /// Legacy entries without an id get one derived from their name.
    pub fn new(templates: Vec<Template>) -> Self {
        let mut store = Self::default();
        for mut template in templates {
            if template.id.is_empty() || store.find(&template.id).is_some() {
                template.id = store.unique_id(&template.name);
            }
            store.templates.push(template);
        }
        store
    }

    /// The two built-in publishable templates
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Template::new("mine", "Mes traductions", TemplateKind::My, MINE_BODY),
            Template::new(
                "partner",
                "Traductions partenaire",
                TemplateKind::Partner,
                PARTNER_BODY,
            ),
        ])
    }

    /// Add a user template; its id is derived from the name.
    pub fn add(&mut self, mut template: Template) -> TemplateResult<&Template> {
        template.validate()?;
        template.id = self.unique_id(&template.name);

        tracing::debug!(template_id = %template.id, "Template added");
        self.templates.push(template);
        Ok(&self.templates[self.templates.len() - 1])
    }

    /// Get a template by position
    pub fn get(&self, index: usize) -> TemplateResult<&Template> {
        self.templates
            .get(index)
            .ok_or(TemplateError::NotFound(index))
    }

    /// Position of the template with the given id
    pub fn find(&self, id: &str) -> Option<usize> {
        self.templates.iter().position(|t| t.id == id)
    }

    /// Position of the first template of the given kind
    pub fn find_by_kind(&self, kind: &TemplateKind) -> Option<usize> {
        self.templates.iter().position(|t| &t.kind == kind)
    }

    /// List all templates
    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    /// Replace the template at `index`.
    ///
    /// An empty id keeps the existing one; a different id must not collide.
    pub fn update(&mut self, index: usize, mut template: Template) -> TemplateResult<&Template> {
        template.validate()?;
        let current = self.get(index)?;

        if template.id.is_empty() {
            template.id = current.id.clone();
        } else if self
            .templates
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.id == template.id)
        {
            return Err(TemplateError::AlreadyExists(template.id));
        }

        self.templates[index] = template;
        Ok(&self.templates[index])
    }

    /// Delete a template by position
    pub fn delete(&mut self, index: usize) -> TemplateResult<Template> {
        if index >= self.templates.len() {
            return Err(TemplateError::NotFound(index));
        }
        let removed = self.templates.remove(index);
        tracing::debug!(template_id = %removed.id, "Template deleted");
        Ok(removed)
    }

    /// Get the number of templates
    pub fn count(&self) -> usize {
        self.templates.len()
    }

    fn unique_id(&self, name: &str) -> String {
        let base = slugify(name);
        if self.find(&base).is_none() {
            return base;
        }
        (2..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| self.find(candidate).is_none())
            .unwrap_or(base)
    }
}
