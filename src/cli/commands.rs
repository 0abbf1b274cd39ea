//! Command implementations.
//!
//! Each command works on the loaded `AppState` and returns the text to print.

use std::fmt::Write as _;

use crate::error::{AppError, Result};
use crate::platform::{original_file_name, PublisherConfigUpdate};
use crate::publish::HistoryChange;
use crate::state::{AppState, SavedTag};
use crate::template::{Template, TemplateKind, INSTRUCTION_VARIABLE};
use crate::variable::{VariableDefinition, VariableKind};

use super::{
    BodyArgs, Command, ConfigArgs, HistoryCommand, ImageCommand, InstructionCommand, TagCommand,
    TemplateCommand, TranslatorCommand, VariableCommand,
};

/// Run one command against the application state.
pub async fn execute(command: Command, state: &mut AppState) -> Result<String> {
    match command {
        Command::Preview(args) => preview(state, args.template),
        Command::Set(args) => {
            set_field(state, &args.name, &args.value)?;
            Ok(format!("{} updated", args.name))
        }
        Command::Title { text } => {
            state.set_post_title(text.trim());
            Ok(format!("Title: {}", state.post_title()))
        }
        Command::Tags { csv } => {
            state.set_post_tags(normalize_tags(&csv));
            Ok(format!("Tags: {}", state.post_tags()))
        }
        Command::Templates => Ok(list_templates(state)),
        Command::Select { index } => {
            state.select_template(index)?;
            let name = state
                .current_template()
                .map(|t| t.name.clone())
                .unwrap_or_default();
            Ok(format!("Selected template {}: {}", index, name))
        }
        Command::Template(cmd) => template(state, cmd).await,
        Command::Variable(cmd) => variable(state, cmd),
        Command::Fields => Ok(list_fields(state)),
        Command::Instruction(cmd) => instruction(state, cmd),
        Command::Image(cmd) => image(state, cmd).await,
        Command::Tag(cmd) => tag(state, cmd),
        Command::Translator(cmd) => translator(state, cmd),
        Command::Publish => publish(state).await,
        Command::History { action: None } => Ok(list_history(state)),
        Command::History {
            action: Some(HistoryCommand::Delete { id }),
        } => {
            let removed = state.delete_post(&id)?;
            Ok(format!("Deleted {} ({})", removed.id, removed.title))
        }
        Command::Edit { id } => {
            state.load_post_for_editing(&id)?;
            Ok(format!(
                "Editing {}: next publish updates the existing post",
                id
            ))
        }
        Command::Duplicate { id } => {
            state.load_post_for_duplication(&id)?;
            Ok(format!("Loaded {} as a new post", id))
        }
        Command::Check => {
            let status = state.check_connection().await?;
            Ok(format!("Publisher reachable (HTTP {})", status))
        }
        Command::Config(args) => config(state, args).await,
    }
}

fn preview(state: &AppState, template: Option<usize>) -> Result<String> {
    let index = template.unwrap_or_else(|| state.current_template_index());
    let mut output = state.render_template(index)?;

    if template.is_none() {
        let missing = state.missing_fields();
        if !missing.is_empty() {
            let _ = write!(output, "\n\n-- empty fields: {}", missing.join(", "));
        }
    }
    Ok(output)
}

/// Set a registered field or the instruction text
fn set_field(state: &mut AppState, name: &str, value: &str) -> Result<()> {
    if !state.registry().contains(name) && name != INSTRUCTION_VARIABLE {
        return Err(AppError::NotFound(format!("field '{}'", name)));
    }
    state.set_binding(name, unescape_newlines(value));
    Ok(())
}

/// Shell arguments carry line breaks as a literal `\n`
fn unescape_newlines(value: &str) -> String {
    value.replace("\\n", "\n")
}

/// Trim every tag and drop empty ones
fn normalize_tags(csv: &str) -> String {
    csv.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn list_templates(state: &AppState) -> String {
    let current = state.current_template_index();
    state
        .templates()
        .list()
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let marker = if i == current { "*" } else { " " };
            let kind = if t.kind.is_publishable() {
                t.kind.to_string()
            } else {
                format!("{} (copy only)", t.kind)
            };
            format!("{} {:>2}  {:<28} {}", marker, i, t.name, kind)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Body from `--body` or `--file`; `None` when neither is given
async fn read_body(args: BodyArgs) -> Result<Option<String>> {
    if let Some(path) = args.file {
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| AppError::Io {
                path: path.display().to_string(),
                source,
            })?;
        return Ok(Some(body));
    }
    Ok(args.body.map(|b| unescape_newlines(&b)))
}

async fn template(state: &mut AppState, cmd: TemplateCommand) -> Result<String> {
    match cmd {
        TemplateCommand::Add { name, kind, body } => {
            let body = read_body(body).await?.unwrap_or_default();
            let id = state.add_template(Template::new(
                "",
                name.trim(),
                TemplateKind::from(kind.trim()),
                body,
            ))?;
            let index = state.templates().find(&id).unwrap_or_default();
            Ok(format!("Added template {}: {}", index, id))
        }
        TemplateCommand::Edit {
            index,
            name,
            kind,
            body,
        } => {
            let mut updated = state.templates().get(index)?.clone();
            if let Some(name) = name {
                updated.name = name.trim().to_string();
            }
            if let Some(kind) = kind {
                updated.kind = TemplateKind::from(kind.trim());
            }
            if let Some(body) = read_body(body).await? {
                updated.body = body;
            }
            let name = updated.name.clone();
            state.update_template(index, updated)?;
            Ok(format!("Updated template {}: {}", index, name))
        }
        TemplateCommand::Delete { index } => {
            let removed = state.delete_template(index)?;
            Ok(format!("Deleted template {}", removed.name))
        }
    }
}

/// Registry position of a field
fn variable_index(state: &AppState, name: &str) -> Result<usize> {
    state
        .registry()
        .iter()
        .position(|v| v.name == name)
        .ok_or_else(|| AppError::NotFound(format!("field '{}'", name)))
}

fn variable(state: &mut AppState, cmd: VariableCommand) -> Result<String> {
    match cmd {
        VariableCommand::List => Ok(state
            .registry()
            .iter()
            .map(|var| {
                let kind = match var.kind {
                    VariableKind::SingleLine => "single-line".to_string(),
                    VariableKind::MultiLine => "multi-line".to_string(),
                    VariableKind::Choice => format!("choice: {}", var.options.join("|")),
                };
                let mut line = format!("{:<20} {:<28} {}", var.name, var.label, kind);
                if !var.scoped_template_ids.is_empty() {
                    let _ = write!(line, " [{}]", var.scoped_template_ids.join(","));
                }
                if var.is_user_defined {
                    line.push_str(" (custom)");
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")),
        VariableCommand::Add {
            name,
            label,
            multiline,
            options,
            placeholder,
            templates,
        } => {
            let kind = if !options.is_empty() {
                VariableKind::Choice
            } else if multiline {
                VariableKind::MultiLine
            } else {
                VariableKind::SingleLine
            };
            let mut var = VariableDefinition::new(name.trim(), label.trim())
                .with_kind(kind)
                .with_options(options)
                .scoped_to(templates);
            if let Some(placeholder) = placeholder {
                var = var.with_placeholder(placeholder);
            }
            state.add_variable(var)?;
            Ok(format!("Field {} added", name.trim()))
        }
        VariableCommand::Edit {
            name,
            label,
            placeholder,
            rename,
        } => {
            let index = variable_index(state, &name)?;
            let mut var = state.registry().as_slice()[index].clone();
            if let Some(label) = label {
                var.label = label.trim().to_string();
            }
            if let Some(placeholder) = placeholder {
                var.placeholder = Some(placeholder).filter(|p| !p.is_empty());
            }
            if let Some(rename) = rename {
                var.name = rename.trim().to_string();
            }
            let new_name = var.name.clone();
            state.update_variable(index, var)?;
            Ok(format!("Field {} updated", new_name))
        }
        VariableCommand::Delete { name } => {
            let index = variable_index(state, &name)?;
            let removed = state.delete_variable(index)?;
            Ok(format!("Field {} deleted", removed.name))
        }
    }
}

fn list_fields(state: &AppState) -> String {
    let template_id = state
        .current_template()
        .map(|t| t.id.clone())
        .unwrap_or_default();

    let mut lines: Vec<String> = state
        .registry()
        .visible_for(&template_id)
        .into_iter()
        .map(|var| {
            let value = state.bindings().get(&var.name);
            let shown = if value.trim().is_empty() {
                "(empty)".to_string()
            } else {
                value.replace('\n', " / ")
            };
            format!("{:<20} {:<28} {}", var.name, var.label, shown)
        })
        .collect();

    let instruction = state.bindings().get(INSTRUCTION_VARIABLE);
    if !instruction.trim().is_empty() {
        lines.push(format!(
            "{:<20} {:<28} {}",
            INSTRUCTION_VARIABLE,
            "Instructions",
            instruction.replace('\n', " / ")
        ));
    }
    lines.join("\n")
}

fn instruction(state: &mut AppState, cmd: InstructionCommand) -> Result<String> {
    match cmd {
        InstructionCommand::Save { name, text } => {
            state.save_instruction(name.clone(), unescape_newlines(&text));
            Ok(format!("Instruction '{}' saved", name))
        }
        InstructionCommand::Apply { name } => {
            if state.apply_saved_instruction(&name) {
                Ok(format!("Instruction '{}' applied", name))
            } else {
                Err(AppError::NotFound(format!("instruction '{}'", name)))
            }
        }
        InstructionCommand::Delete { name } => state
            .delete_instruction(&name)
            .map(|_| format!("Instruction '{}' deleted", name))
            .ok_or_else(|| AppError::NotFound(format!("instruction '{}'", name))),
        InstructionCommand::List => Ok(state
            .saved_instructions()
            .iter()
            .map(|(name, text)| format!("{:<20} {}", name, text.replace('\n', " / ")))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

async fn image(state: &mut AppState, cmd: ImageCommand) -> Result<String> {
    match cmd {
        ImageCommand::Add { path } => {
            let image = state.add_image(&path).await?;
            Ok(format!(
                "Attached {}{}",
                original_file_name(&image.path),
                if image.is_main { " (main)" } else { "" }
            ))
        }
        ImageCommand::Remove { index } => state
            .remove_image(index)
            .await
            .map(|img| format!("Removed {}", original_file_name(&img.path)))
            .ok_or_else(|| AppError::NotFound(format!("image {}", index))),
        ImageCommand::Main { index } => {
            if state.set_main_image(index) {
                Ok(format!("Image {} is now the main image", index))
            } else {
                Err(AppError::NotFound(format!("image {}", index)))
            }
        }
        ImageCommand::List => Ok(state
            .image_sizes()
            .await
            .iter()
            .enumerate()
            .map(|(i, (img, size))| {
                format!(
                    "{} {:>2}  {:<32} {}",
                    if img.is_main { "*" } else { " " },
                    i,
                    original_file_name(&img.path),
                    size.map(format_size).unwrap_or_else(|| "(missing)".to_string())
                )
            })
            .collect::<Vec<_>>()
            .join("\n")),
        ImageCommand::Prune => {
            let deleted = state.prune_images().await?;
            Ok(format!("Deleted {} unused image file(s)", deleted.len()))
        }
    }
}

/// Human-readable byte count
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    match bytes {
        b if b < KB => format!("{} B", b),
        b if b < MB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{:.1} MB", b as f64 / MB as f64),
    }
}

fn tag(state: &mut AppState, cmd: TagCommand) -> Result<String> {
    match cmd {
        TagCommand::Add { name, id, kind } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Validation("tag name must not be empty".to_string()));
            }
            let mut tag = SavedTag::new(name);
            if let Some(id) = id {
                tag = tag.with_id(id.trim());
            }
            if let Some(kind) = kind {
                tag = tag.for_kind(TemplateKind::from(kind.trim()));
            }
            state.add_saved_tag(tag);
            Ok(format!("Tag {} saved", name))
        }
        TagCommand::Delete { index } => state
            .delete_saved_tag(index)
            .map(|t| format!("Tag {} deleted", t.name))
            .ok_or_else(|| AppError::NotFound(format!("tag {}", index))),
        TagCommand::List => Ok(state
            .saved_tags()
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut line = format!("{:>2}  {}", i, t.name);
                if let Some(id) = &t.id {
                    let _ = write!(line, " ({})", id);
                }
                if let Some(kind) = &t.template_kind {
                    let _ = write!(line, " [{}]", kind);
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

fn translator(state: &mut AppState, cmd: TranslatorCommand) -> Result<String> {
    match cmd {
        TranslatorCommand::Add { name } => {
            if state.save_translator(&name) {
                Ok(format!("Translator {} saved", name.trim()))
            } else {
                Err(AppError::Validation(format!(
                    "translator '{}' is empty or already saved",
                    name.trim()
                )))
            }
        }
        TranslatorCommand::Delete { index } => state
            .delete_translator(index)
            .map(|name| format!("Translator {} deleted", name))
            .ok_or_else(|| AppError::NotFound(format!("translator {}", index))),
        TranslatorCommand::List => Ok(state
            .saved_translators()
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{:>2}  {}", i, name))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

async fn publish(state: &mut AppState) -> Result<String> {
    let outcome = state.publish().await?;
    let verb = match outcome.history {
        HistoryChange::Updated(_) => "Updated",
        HistoryChange::Created(_) | HistoryChange::Untouched => "Published",
    };
    Ok(match outcome.url() {
        Some(url) => format!("{}: {}", verb, url),
        None => verb.to_string(),
    })
}

fn list_history(state: &AppState) -> String {
    let posts = state.history().list();
    if posts.is_empty() {
        return "No published posts".to_string();
    }
    posts
        .iter()
        .map(|post| {
            let editing = if state.editing_post_id() == Some(post.id.as_str()) {
                " (editing)"
            } else {
                ""
            };
            format!(
                "{}  {}  {:<8} {}{}  {}",
                post.id,
                post.timestamp.format("%Y-%m-%d %H:%M"),
                post.template_kind.to_string(),
                post.title,
                editing,
                post.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn config(state: &AppState, args: ConfigArgs) -> Result<String> {
    if args.url.is_none() && args.key.is_none() {
        let config = state.effective_config().await;
        return Ok(format!(
            "url: {}\nkey: {}",
            if config.api_url.is_empty() {
                "(not set)"
            } else {
                config.api_url.as_str()
            },
            if config.api_key.is_empty() {
                "(not set)"
            } else {
                "(set)"
            }
        ));
    }

    let config = state
        .set_publisher_config(PublisherConfigUpdate {
            api_url: args.url.map(|u| u.trim().to_string()),
            api_key: args.key,
        })
        .await?;
    Ok(format!("Publisher config saved: {}", config.api_url))
}
