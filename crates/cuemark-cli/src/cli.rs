//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use cuemark_codec::ImportMode;
use cuemark_types::{FieldKind, Frame};

/// Define event templates, place them on a timeline, and move both in and
/// out of JSON.
#[derive(Debug, Parser)]
#[command(name = "cuemark", version, about)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Session file, overriding the configured one.
    #[arg(long, global = true)]
    pub session: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage event templates.
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Manage the custom fields of a template.
    #[command(subcommand)]
    Field(FieldCommand),

    /// Place and edit events on the timeline.
    #[command(subcommand)]
    Event(EventCommand),

    /// Remove every event and its marker from the timeline.
    Clear,

    /// Move the frame cursor.
    Cursor {
        /// New cursor frame.
        #[arg(allow_negative_numbers = true)]
        frame: Frame,
    },

    /// Show templates, events and markers.
    List,

    /// Verify that events are unique and mirrored by their markers.
    Check,

    /// Export or import the template palette.
    #[command(subcommand)]
    Palette(PaletteCommand),

    /// Export or import the placed events.
    #[command(subcommand)]
    Events(EventsCommand),
}

impl Command {
    /// Whether the command leaves the session unchanged.
    pub const fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::List
                | Self::Check
                | Self::Template(TemplateCommand::List)
                | Self::Palette(PaletteCommand::Export { .. })
                | Self::Events(EventsCommand::Export { .. })
        )
    }
}

/// Template commands.
#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    /// Add a template with a generated name and select it.
    Add,
    /// Remove a template. Events that use it keep its name.
    Remove {
        /// Template name.
        name: String,
    },
    /// Rename a template. Events keep the old name.
    Rename {
        /// Current name.
        name: String,
        /// New name.
        new_name: String,
    },
    /// Change a template's description or color.
    Edit {
        /// Template name.
        name: String,
        /// New description.
        #[arg(long)]
        description: Option<String>,
        /// New color as three components in [0, 1].
        #[arg(
            long,
            num_args = 3,
            value_names = ["R", "G", "B"],
            allow_negative_numbers = true,
            value_parser = parse_component
        )]
        color: Option<Vec<f64>>,
    },
    /// Make a template the active one.
    Select {
        /// Template name.
        name: String,
    },
    /// List templates and their fields.
    List,
}

/// Field commands.
#[derive(Debug, Subcommand)]
pub enum FieldCommand {
    /// Add a `STRING` field with a generated name.
    Add {
        /// Template name.
        template: String,
    },
    /// Remove a field. Existing events keep their value for it.
    Remove {
        /// Template name.
        template: String,
        /// Field name.
        field: String,
    },
    /// Change a field definition.
    Edit(FieldEdit),
}

/// Changes to one field definition. Unset options are left alone.
#[derive(Debug, Args)]
pub struct FieldEdit {
    /// Template name.
    pub template: String,
    /// Field name.
    pub field: String,
    /// New field name.
    #[arg(long)]
    pub rename: Option<String>,
    /// New kind. Resets the default when it changes.
    #[arg(long, value_parser = parse_kind)]
    pub kind: Option<FieldKind>,
    /// New default, as JSON (bare words are taken as text).
    #[arg(long)]
    pub default: Option<String>,
    /// Comma-separated options for `ENUM` fields.
    #[arg(long)]
    pub options: Option<String>,
    /// New description.
    #[arg(long)]
    pub description: Option<String>,
}

/// Event commands. Events are addressed by frame; `--template` picks one
/// when several templates share the frame.
#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Place a template on the timeline.
    Add {
        /// Template name (default: the active template).
        #[arg(long)]
        template: Option<String>,
        /// Frame (default: the cursor).
        #[arg(long, allow_negative_numbers = true)]
        frame: Option<Frame>,
    },
    /// Copy an event, with its current values, to another frame.
    Duplicate {
        /// Frame of the source event.
        #[arg(allow_negative_numbers = true)]
        frame: Frame,
        /// Template of the source event.
        #[arg(long)]
        template: Option<String>,
        /// Target frame (default: the cursor).
        #[arg(long, allow_negative_numbers = true)]
        to: Option<Frame>,
    },
    /// Move an event to another frame.
    Move {
        /// Current frame.
        #[arg(allow_negative_numbers = true)]
        frame: Frame,
        /// Target frame.
        #[arg(allow_negative_numbers = true)]
        to: Frame,
        /// Template of the event.
        #[arg(long)]
        template: Option<String>,
    },
    /// Move an event to the cursor.
    MoveHere {
        /// Current frame.
        #[arg(allow_negative_numbers = true)]
        frame: Frame,
        /// Template of the event.
        #[arg(long)]
        template: Option<String>,
    },
    /// Switch an event to another template, resetting its field values.
    Retarget {
        /// Frame of the event.
        #[arg(allow_negative_numbers = true)]
        frame: Frame,
        /// New template name.
        new_template: String,
        /// Current template of the event.
        #[arg(long)]
        template: Option<String>,
    },
    /// Set one field value of an event.
    Set {
        /// Frame of the event.
        #[arg(allow_negative_numbers = true)]
        frame: Frame,
        /// Field name.
        field: String,
        /// New value, as JSON (bare words are taken as text).
        value: String,
        /// Template of the event.
        #[arg(long)]
        template: Option<String>,
    },
    /// Remove the event (and marker) on a frame.
    Remove {
        /// Frame.
        #[arg(allow_negative_numbers = true)]
        frame: Frame,
    },
    /// Move the cursor to an event.
    Goto {
        /// Frame of the event.
        #[arg(allow_negative_numbers = true)]
        frame: Frame,
        /// Template of the event.
        #[arg(long)]
        template: Option<String>,
    },
}

/// Palette file commands.
#[derive(Debug, Subcommand)]
pub enum PaletteCommand {
    /// Write every template to a JSON file.
    Export {
        /// Output file.
        path: PathBuf,
    },
    /// Load templates from a JSON file.
    Import {
        /// Input file.
        path: PathBuf,
        /// Keep existing templates, or replace them all.
        #[arg(long, value_enum, default_value_t = ModeArg::Merge)]
        mode: ModeArg,
    },
}

/// Events file commands.
#[derive(Debug, Subcommand)]
pub enum EventsCommand {
    /// Write every event to a JSON file.
    Export {
        /// Output file.
        path: PathBuf,
    },
    /// Replace the timeline's events with those of a JSON file.
    Import {
        /// Input file.
        path: PathBuf,
    },
}

/// Palette import mode as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Skip templates whose name is taken.
    Merge,
    /// Drop every template first.
    Replace,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Merge => Self::Merge,
            ModeArg::Replace => Self::Replace,
        }
    }
}

fn parse_component(text: &str) -> Result<f64, String> {
    let component = text
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("{text}: {err}"))?;
    if component.is_finite() {
        Ok(component)
    } else {
        Err(format!("{text}: color components must be finite"))
    }
}

fn parse_kind(tag: &str) -> Result<FieldKind, String> {
    tag.parse::<FieldKind>().map_err(|err| err.to_string())
}
