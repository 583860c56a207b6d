//! Command handlers.
//!
//! Each handler resolves names and frames to ids, runs one store or codec
//! operation and reports to `out`. The returned [`Outcome`] decides whether
//! the session is written back.

use std::io::Write;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use cuemark_codec::{ImportReport, load_events, load_palette, save_events, save_palette};
use cuemark_timeline::{EditOutcome, MarkerTrack, TimelineError, TimelineStore};
use cuemark_types::{Frame, InstanceId, Outcome, Rgb, TemplateId};

use crate::cli::{
    Command, EventCommand, EventsCommand, FieldCommand, FieldEdit, PaletteCommand,
    TemplateCommand,
};
use crate::error::CliError;

/// The store every command runs against.
pub type Store = TimelineStore<MarkerTrack>;

/// Run `command` against `store`, writing human-readable output to `out`.
pub fn execute<W: Write>(
    command: Command,
    store: &mut Store,
    out: &mut W,
) -> Result<Outcome, CliError> {
    match command {
        Command::Template(cmd) => template(cmd, store, out),
        Command::Field(cmd) => field(cmd, store, out),
        Command::Event(cmd) => event(cmd, store, out),
        Command::Clear => {
            let removed = store.clear_all();
            writeln!(out, "Cleared {removed} events")?;
            Ok(Outcome::Finished)
        }
        Command::Cursor { frame } => {
            store.set_current_frame(frame);
            writeln!(out, "Cursor at frame {frame}")?;
            Ok(Outcome::Finished)
        }
        Command::List => {
            list_templates(store, out)?;
            list_events(store, out)?;
            Ok(Outcome::Finished)
        }
        Command::Check => check(store, out),
        Command::Palette(cmd) => palette(cmd, store, out),
        Command::Events(cmd) => events(cmd, store, out),
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

fn template_id(store: &Store, name: &str) -> Result<TemplateId, CliError> {
    store
        .template_by_name(name)
        .map(|t| t.id)
        .ok_or_else(|| CliError::not_found("template", name))
}

fn instance_id(
    store: &Store,
    frame: Frame,
    template: Option<&str>,
) -> Result<InstanceId, CliError> {
    store.instance_at(frame, template).map(|i| i.id).ok_or_else(|| {
        let name = template.map_or_else(
            || format!("frame {frame}"),
            |t| format!("'{t}' on frame {frame}"),
        );
        CliError::not_found("event", name)
    })
}

/// JSON if it parses, otherwise the text itself.
fn parse_value(text: &str) -> JsonValue {
    serde_json::from_str(text).unwrap_or_else(|_not_json| JsonValue::String(text.to_owned()))
}

// ---------------------------------------------------------------------------
// Templates and fields
// ---------------------------------------------------------------------------

fn template<W: Write>(
    cmd: TemplateCommand,
    store: &mut Store,
    out: &mut W,
) -> Result<Outcome, CliError> {
    match cmd {
        TemplateCommand::Add => {
            let added = store.add_template()?;
            writeln!(out, "Added template '{}'", added.name)?;
        }
        TemplateCommand::Remove { name } => {
            let id = template_id(store, &name)?;
            let removed = store.remove_template(id)?;
            writeln!(out, "Removed template '{}'", removed.name)?;
        }
        TemplateCommand::Rename { name, new_name } => {
            let target = store
                .template_by_name_mut(&name)
                .ok_or_else(|| CliError::not_found("template", name.as_str()))?;
            target.name.clone_from(&new_name);
            info!(from = %name, to = %new_name, "template renamed");
            writeln!(out, "Renamed template '{name}' to '{new_name}'")?;
        }
        TemplateCommand::Edit {
            name,
            description,
            color,
        } => {
            let target = store
                .template_by_name_mut(&name)
                .ok_or_else(|| CliError::not_found("template", name.as_str()))?;
            if let Some(description) = description {
                target.description = description;
            }
            if let Some([r, g, b]) = color.as_deref() {
                target.color = Rgb::clamped(*r, *g, *b);
            }
            writeln!(out, "Updated template '{name}'")?;
        }
        TemplateCommand::Select { name } => {
            let id = template_id(store, &name)?;
            store.select_template(id)?;
            writeln!(out, "Selected template '{name}'")?;
        }
        TemplateCommand::List => list_templates(store, out)?,
    }
    Ok(Outcome::Finished)
}

fn field<W: Write>(cmd: FieldCommand, store: &mut Store, out: &mut W) -> Result<Outcome, CliError> {
    match cmd {
        FieldCommand::Add { template } => {
            let id = template_id(store, &template)?;
            let added = store.add_field(id)?;
            writeln!(out, "Added field '{}' to '{template}'", added.name)?;
        }
        FieldCommand::Remove { template, field } => {
            let id = template_id(store, &template)?;
            let removed = store.remove_field(id, &field)?;
            writeln!(out, "Removed field '{}' from '{template}'", removed.name)?;
        }
        FieldCommand::Edit(edit) => edit_field(edit, store, out)?,
    }
    Ok(Outcome::Finished)
}

fn edit_field<W: Write>(edit: FieldEdit, store: &mut Store, out: &mut W) -> Result<(), CliError> {
    let target = store
        .template_by_name_mut(&edit.template)
        .ok_or_else(|| CliError::not_found("template", edit.template.as_str()))?;
    let owner = target.name.clone();
    let definition = target.field_mut(&edit.field).ok_or_else(|| TimelineError::UnknownField {
        owner,
        field: edit.field.clone(),
    })?;

    if let Some(kind) = edit.kind {
        definition.set_kind(kind);
    }
    if let Some(options) = edit.options {
        definition.set_enum_options(options);
    }
    if let Some(default) = edit.default {
        definition
            .set_default(&parse_value(&default))
            .map_err(|source| TimelineError::Coercion {
                field: edit.field.clone(),
                source,
            })?;
    }
    if let Some(description) = edit.description {
        definition.description = description;
    }
    if let Some(rename) = edit.rename {
        definition.name = rename;
    }

    info!(
        template = %edit.template,
        field = %definition.name,
        kind = %definition.kind(),
        "field updated"
    );
    writeln!(
        out,
        "{}: {} = {}",
        definition.name,
        definition.kind(),
        definition.default_value()
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

fn event<W: Write>(cmd: EventCommand, store: &mut Store, out: &mut W) -> Result<Outcome, CliError> {
    match cmd {
        EventCommand::Add { template, frame } => {
            let placed = match (template, frame) {
                (None, None) => store.add_active_to_current()?,
                (template, frame) => {
                    let id = match template {
                        Some(name) => template_id(store, &name)?,
                        None => {
                            store
                                .active_template()
                                .ok_or(TimelineError::NoActiveTemplate)?
                                .id
                        }
                    };
                    let frame = frame.unwrap_or_else(|| store.current_frame());
                    store.add_to_timeline(id, frame)?
                }
            };
            writeln!(out, "Placed '{}' at frame {}", placed.template_name, placed.frame)?;
            Ok(Outcome::Finished)
        }
        EventCommand::Duplicate {
            frame,
            template,
            to,
        } => {
            let id = instance_id(store, frame, template.as_deref())?;
            let copy = store.duplicate_event(id, to)?;
            writeln!(
                out,
                "Duplicated '{}' from frame {frame} to frame {}",
                copy.template_name, copy.frame
            )?;
            Ok(Outcome::Finished)
        }
        EventCommand::Move {
            frame,
            to,
            template,
        } => {
            let id = instance_id(store, frame, template.as_deref())?;
            let edit = store.set_frame(id, to)?;
            report_edit(&edit, out)
        }
        EventCommand::MoveHere { frame, template } => {
            let id = instance_id(store, frame, template.as_deref())?;
            let edit = store.move_to_current(id)?;
            report_edit(&edit, out)
        }
        EventCommand::Retarget {
            frame,
            new_template,
            template,
        } => {
            let id = instance_id(store, frame, template.as_deref())?;
            let edit = store.set_template_name(id, &new_template)?;
            report_edit(&edit, out)
        }
        EventCommand::Set {
            frame,
            field,
            value,
            template,
        } => {
            let id = instance_id(store, frame, template.as_deref())?;
            let stored = store.set_field_value(id, &field, &parse_value(&value))?;
            writeln!(out, "{} = {}", stored.name, stored.value)?;
            Ok(Outcome::Finished)
        }
        EventCommand::Remove { frame } => {
            let removed = store
                .remove_from_timeline(frame)
                .ok_or_else(|| CliError::not_found("event", format!("frame {frame}")))?;
            writeln!(
                out,
                "Removed '{}' from frame {frame}",
                removed.template_name
            )?;
            Ok(Outcome::Finished)
        }
        EventCommand::Goto { frame, template } => {
            let id = instance_id(store, frame, template.as_deref())?;
            store.select_instance(id)?;
            let landed = store.go_to_event(id)?;
            writeln!(out, "Cursor at frame {landed}")?;
            Ok(Outcome::Finished)
        }
    }
}

fn report_edit<W: Write>(edit: &EditOutcome, out: &mut W) -> Result<Outcome, CliError> {
    match edit {
        EditOutcome::Applied => writeln!(out, "Event updated")?,
        EditOutcome::Substituted { template_name } if template_name.is_empty() => {
            writeln!(out, "Template not found and no templates exist, event cleared")?;
        }
        EditOutcome::Substituted { template_name } => {
            writeln!(out, "Template not found, using '{template_name}'")?;
        }
        EditOutcome::Reverted {
            template_name,
            frame,
        } => {
            writeln!(
                out,
                "Event '{template_name}' already exists on frame {frame}, change reverted"
            )?;
        }
    }
    Ok(edit.outcome())
}

// ---------------------------------------------------------------------------
// Listing and checks
// ---------------------------------------------------------------------------

fn list_templates<W: Write>(store: &Store, out: &mut W) -> Result<(), CliError> {
    let active = store.active_template().map(|t| t.id);
    writeln!(out, "Templates ({}):", store.templates().len())?;
    for template in store.templates() {
        let mark = if Some(template.id) == active { '*' } else { ' ' };
        let [r, g, b] = template.color.0;
        writeln!(
            out,
            "{mark} {} [{r:.2} {g:.2} {b:.2}] {}",
            template.name, template.description
        )?;
        for field in &template.fields {
            write!(out, "    {}: {} = {}", field.name, field.kind(), field.default_value())?;
            if !field.enum_options_source().is_empty() {
                write!(out, " ({})", field.enum_options_source())?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

fn list_events<W: Write>(store: &Store, out: &mut W) -> Result<(), CliError> {
    let active = store.active_instance().map(|i| i.id);
    writeln!(
        out,
        "Events ({}), cursor at frame {}:",
        store.instances().len(),
        store.current_frame()
    )?;
    for instance in store.instances() {
        let mark = if Some(instance.id) == active { '*' } else { ' ' };
        let values = instance
            .field_values
            .iter()
            .map(|v| format!("{}={}", v.name, v.value))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            out,
            "{mark} {:>6}  {}  {values}",
            instance.frame, instance.marker_name
        )?;
    }
    Ok(())
}

fn check<W: Write>(store: &Store, out: &mut W) -> Result<Outcome, CliError> {
    let result = store.audit();
    if result.is_consistent() {
        writeln!(
            out,
            "OK: {} events, {} markers",
            store.instances().len(),
            store.markers().len()
        )?;
        return Ok(Outcome::Finished);
    }
    for violation in result.violations() {
        warn!(%violation, "timeline invariant broken");
        writeln!(out, "{violation}")?;
    }
    Ok(Outcome::Error)
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

fn palette<W: Write>(
    cmd: PaletteCommand,
    store: &mut Store,
    out: &mut W,
) -> Result<Outcome, CliError> {
    match cmd {
        PaletteCommand::Export { path } => {
            let written = save_palette(store, &path)?;
            writeln!(out, "Exported {written} templates to {}", path.display())?;
        }
        PaletteCommand::Import { path, mode } => {
            let report = load_palette(store, &path, mode.into())?;
            writeln!(
                out,
                "Imported {} templates ({} skipped)",
                report.imported, report.skipped
            )?;
            print_summary(&report, out)?;
        }
    }
    Ok(Outcome::Finished)
}

fn events<W: Write>(
    cmd: EventsCommand,
    store: &mut Store,
    out: &mut W,
) -> Result<Outcome, CliError> {
    match cmd {
        EventsCommand::Export { path } => {
            let written = save_events(store, &path)?;
            writeln!(out, "Exported {written} events to {}", path.display())?;
        }
        EventsCommand::Import { path } => {
            let report = load_events(store, &path)?;
            writeln!(
                out,
                "Imported {} events and {} templates",
                report.imported, report.templates_imported
            )?;
            print_summary(&report, out)?;
        }
    }
    Ok(Outcome::Finished)
}

fn print_summary<W: Write>(report: &ImportReport, out: &mut W) -> Result<(), CliError> {
    if !report.has_errors() {
        return Ok(());
    }
    warn!(errors = report.errors.len(), "import finished with entry errors");
    if let Some(summary) = report.summary() {
        writeln!(out, "{summary}")?;
    }
    Ok(())
}
