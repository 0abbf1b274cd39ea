//! CLI argument parsing for forum-publisher.
//!
//! Uses clap derive macros for declarative argument definitions.
//! Command execution lives in the `commands` module.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub use commands::execute;

/// Compose Discord forum posts from templates and publish them.
///
/// The draft (template selection, field values, title, tags, images) is kept
/// between runs; each command changes one part of it.
#[derive(Parser, Debug)]
#[command(name = "forum-publisher")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the rendered post.
    Preview(PreviewArgs),

    /// Set the value of a template field.
    Set(SetArgs),

    /// Set the post title.
    Title {
        /// Title of the forum thread
        text: String,
    },

    /// Set the post tags (comma-separated).
    Tags {
        /// Tags, e.g. "rpg,fr"
        csv: String,
    },

    /// List templates.
    Templates,

    /// Add, edit or delete templates.
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Manage template fields.
    #[command(subcommand)]
    Variable(VariableCommand),

    /// Select the template used for the post.
    Select {
        /// Template index as shown by `templates`
        index: usize,
    },

    /// List template fields and their values.
    Fields,

    /// Manage installation instructions.
    #[command(subcommand)]
    Instruction(InstructionCommand),

    /// Manage attached images.
    #[command(subcommand)]
    Image(ImageCommand),

    /// Manage saved forum tags.
    #[command(subcommand)]
    Tag(TagCommand),

    /// Manage saved translator names.
    #[command(subcommand)]
    Translator(TranslatorCommand),

    /// Publish the draft (or update the post being edited).
    Publish,

    /// List published posts, or delete one.
    History {
        #[command(subcommand)]
        action: Option<HistoryCommand>,
    },

    /// Load a published post into the draft for updating.
    Edit {
        /// History record id or Discord thread id
        id: String,
    },

    /// Load a published post into the draft as a new post.
    Duplicate {
        /// History record id or Discord thread id
        id: String,
    },

    /// Check that the publisher endpoint answers.
    Check,

    /// Show or change the publisher endpoint and API key.
    Config(ConfigArgs),
}

/// Arguments for the `preview` command.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Render this template instead of the selected one
    #[arg(long, short = 't')]
    pub template: Option<usize>,
}

/// Arguments for the `set` command.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Field name, e.g. game_name
    pub name: String,

    /// Value; `\n` sequences become line breaks
    pub value: String,
}

/// Template body given inline or read from a file.
#[derive(Args, Debug, Default)]
pub struct BodyArgs {
    /// Body text; `\n` sequences become line breaks
    #[arg(long, conflicts_with = "file")]
    pub body: Option<String>,

    /// Read the body from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Template commands.
#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Add a template.
    Add {
        name: String,

        /// Template type: my, partner, or any other tag for copy-only templates
        #[arg(long, short = 'k', default_value = "")]
        kind: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Change a template's name, type or body.
    Edit {
        /// Template index as shown by `templates`
        index: usize,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, short = 'k')]
        kind: Option<String>,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Delete a template.
    Delete { index: usize },
}

/// Template field commands.
#[derive(Subcommand, Debug)]
pub enum VariableCommand {
    /// List every field, including those hidden for the selected template.
    List,

    /// Add a custom field.
    Add {
        /// Field name, used as `[name]` in templates
        name: String,

        /// Label shown next to the input
        label: String,

        /// Edit the value as multi-line text
        #[arg(long, conflicts_with = "options")]
        multiline: bool,

        /// Allowed value; makes the field a choice
        #[arg(long = "option", value_name = "VALUE")]
        options: Vec<String>,

        /// Example value shown for an empty field
        #[arg(long)]
        placeholder: Option<String>,

        /// Only show the field for this template id
        #[arg(long = "template", value_name = "ID")]
        templates: Vec<String>,
    },

    /// Change a field's label, placeholder or name.
    Edit {
        name: String,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        placeholder: Option<String>,

        /// New field name; the current value moves with it
        #[arg(long)]
        rename: Option<String>,
    },

    /// Delete a custom field and its value.
    Delete { name: String },
}

/// Saved tag commands.
#[derive(Subcommand, Debug)]
pub enum TagCommand {
    /// Save a tag.
    Add {
        name: String,

        /// Discord tag id
        #[arg(long)]
        id: Option<String>,

        /// Template type the tag belongs to
        #[arg(long, short = 'k')]
        kind: Option<String>,
    },

    /// Delete a saved tag.
    Delete { index: usize },

    /// List saved tags.
    List,
}

/// Saved translator commands.
#[derive(Subcommand, Debug)]
pub enum TranslatorCommand {
    /// Save a translator name.
    Add { name: String },

    /// Delete a saved translator.
    Delete { index: usize },

    /// List saved translators.
    List,
}

/// Installation instruction commands.
#[derive(Subcommand, Debug)]
pub enum InstructionCommand {
    /// Save an instruction under a name.
    Save { name: String, text: String },

    /// Use a saved instruction for the current post.
    Apply { name: String },

    /// Delete a saved instruction.
    Delete { name: String },

    /// List saved instructions.
    List,
}

/// Image commands.
#[derive(Subcommand, Debug)]
pub enum ImageCommand {
    /// Attach an image file.
    Add { path: PathBuf },

    /// Detach an image.
    Remove { index: usize },

    /// Make an image the main image.
    Main { index: usize },

    /// List attached images with their size.
    List,

    /// Delete stored image files no longer used by the draft or history.
    Prune,
}

/// History commands.
#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Delete a record.
    Delete { id: String },
}

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Publisher endpoint URL
    #[arg(long)]
    pub url: Option<String>,

    /// Publisher API key
    #[arg(long)]
    pub key: Option<String>,
}
