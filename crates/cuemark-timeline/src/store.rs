//! The timeline store: templates, placed instances, and their markers.
//!
//! [`TimelineStore`] is an explicitly constructed object; the marker list it
//! mirrors instances into is injected at construction. Every operation runs
//! to completion before returning, and validates before it writes: when an
//! operation is refused, nothing in the store or the marker list changed.
//!
//! # Design
//!
//! - **By-name references**: an instance names its template. Renaming or
//!   removing a template leaves existing instances pointing at the old name.
//! - **Snapshots**: instances copy field values when created (or when their
//!   template is switched). Later template edits do not reach them.
//! - **First match wins**: duplicate template or field names are tolerated;
//!   every lookup by name resolves to the first entry.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use cuemark_types::{
    EventInstance, FieldDefinition, FieldKind, FieldValue, Frame, InstanceId, Outcome, Rgb,
    Template, TemplateId, Value, coerce, marker_name_for,
};

use crate::TimelineError;
use crate::audit::{AuditResult, audit};
use crate::marker::MarkerStore;

/// Frame rate assumed when none is configured.
pub const DEFAULT_FPS: u32 = 24;

const fn default_fps() -> u32 {
    DEFAULT_FPS
}

// ---------------------------------------------------------------------------
// Edit outcome
// ---------------------------------------------------------------------------

/// How a frame or template-name edit on a live instance was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit was applied and the marker follows it.
    Applied,
    /// The requested template does not exist; the instance was switched to
    /// this template instead (the first in the palette, or none).
    Substituted {
        /// Template name actually applied.
        template_name: String,
    },
    /// Another instance already holds the target pair; the instance kept its
    /// previous template and frame.
    Reverted {
        /// Template name of the conflicting pair.
        template_name: String,
        /// Frame of the conflicting pair.
        frame: Frame,
    },
}

impl EditOutcome {
    /// Outcome class of this edit.
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Applied | Self::Substituted { .. } => Outcome::Finished,
            Self::Reverted { .. } => Outcome::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory collection of templates and instances, kept in step with a
/// [`MarkerStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineStore<M> {
    /// Palette, in display order.
    templates: Vec<Template>,
    /// Placed instances, in creation order.
    instances: Vec<EventInstance>,
    /// Host marker list.
    markers: M,
    /// Selected template.
    active_template: Option<TemplateId>,
    /// Selected instance.
    active_instance: Option<InstanceId>,
    /// Frame cursor.
    current_frame: Frame,
    /// Frames per second, used for exported times. Configuration, not state.
    #[serde(skip, default = "default_fps")]
    fps: u32,
}

impl<M: MarkerStore + Default> Default for TimelineStore<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: MarkerStore> TimelineStore<M> {
    /// An empty store mirroring into `markers`.
    pub const fn new(markers: M) -> Self {
        Self {
            templates: Vec::new(),
            instances: Vec::new(),
            markers,
            active_template: None,
            active_instance: None,
            current_frame: 0,
            fps: DEFAULT_FPS,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// All templates, in display order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// All instances, in creation order.
    pub fn instances(&self) -> &[EventInstance] {
        &self.instances
    }

    /// The mirrored marker list.
    pub const fn markers(&self) -> &M {
        &self.markers
    }

    /// Mutable access to the marker list, for hosts that edit markers
    /// directly.
    pub const fn markers_mut(&mut self) -> &mut M {
        &mut self.markers
    }

    /// Frames per second.
    pub const fn fps(&self) -> u32 {
        self.fps
    }

    /// Set the frame rate used for exported times.
    pub const fn set_fps(&mut self, fps: u32) {
        self.fps = fps;
    }

    /// Frame cursor.
    pub const fn current_frame(&self) -> Frame {
        self.current_frame
    }

    /// Template with the given id.
    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Mutable template with the given id.
    pub fn template_mut(&mut self, id: TemplateId) -> Option<&mut Template> {
        self.templates.iter_mut().find(|t| t.id == id)
    }

    /// First template named `name`.
    pub fn template_by_name(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Mutable first template named `name`.
    pub fn template_by_name_mut(&mut self, name: &str) -> Option<&mut Template> {
        self.templates.iter_mut().find(|t| t.name == name)
    }

    /// Instance with the given id.
    pub fn instance(&self, id: InstanceId) -> Option<&EventInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    fn instance_mut(&mut self, id: InstanceId) -> Result<&mut EventInstance, TimelineError> {
        self.instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(TimelineError::UnknownInstance(id))
    }

    /// First instance at `frame`, optionally restricted to one template.
    pub fn instance_at(&self, frame: Frame, template_name: Option<&str>) -> Option<&EventInstance> {
        self.instances
            .iter()
            .find(|i| i.frame == frame && template_name.is_none_or(|name| i.template_name == name))
    }

    /// Selected template, if it still exists.
    pub fn active_template(&self) -> Option<&Template> {
        self.active_template.and_then(|id| self.template(id))
    }

    /// Selected instance, if it still exists.
    pub fn active_instance(&self) -> Option<&EventInstance> {
        self.active_instance.and_then(|id| self.instance(id))
    }

    /// Select a template.
    pub fn select_template(&mut self, id: TemplateId) -> Result<(), TimelineError> {
        self.template(id).ok_or(TimelineError::UnknownTemplate(id))?;
        self.active_template = Some(id);
        Ok(())
    }

    /// Select an instance.
    pub fn select_instance(&mut self, id: InstanceId) -> Result<(), TimelineError> {
        self.instance(id).ok_or(TimelineError::UnknownInstance(id))?;
        self.active_instance = Some(id);
        Ok(())
    }

    /// Check the uniqueness and mirroring invariants.
    pub fn audit(&self) -> AuditResult {
        audit(&self.instances, &self.markers)
    }

    // -----------------------------------------------------------------------
    // Template management
    // -----------------------------------------------------------------------

    /// Add an empty orange template with a generated name (`Event_<n>`) and
    /// select it.
    pub fn add_template(&mut self) -> Result<&Template, TimelineError> {
        let name = next_free_name("Event", self.templates.len(), |candidate| {
            self.template_by_name(candidate).is_some()
        });
        let template = Template::new(name, Rgb::NEW_TEMPLATE);
        info!(template = %template.name, "template added");

        self.active_template = Some(template.id);
        self.templates.push(template);
        self.templates.last().ok_or(TimelineError::InternalError(
            "failed to retrieve template after insert",
        ))
    }

    /// Remove a template. Instances referring to it by name are left alone.
    ///
    /// If it was selected, the selection moves to the previous template.
    pub fn remove_template(&mut self, id: TemplateId) -> Result<Template, TimelineError> {
        let index = self
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or(TimelineError::UnknownTemplate(id))?;
        let removed = self.templates.remove(index);

        if self.active_template == Some(id) {
            self.active_template = self.templates.get(index.saturating_sub(1)).map(|t| t.id);
        }
        let orphans = self
            .instances
            .iter()
            .filter(|i| i.template_name == removed.name)
            .count();
        info!(template = %removed.name, orphans, "template removed");
        Ok(removed)
    }

    /// Append a `STRING` field named `field_<n>` to a template.
    pub fn add_field(&mut self, template: TemplateId) -> Result<&FieldDefinition, TimelineError> {
        let target = self
            .template_mut(template)
            .ok_or(TimelineError::UnknownTemplate(template))?;
        let name = next_free_name("field", target.fields.len(), |candidate| {
            target.field(candidate).is_some()
        });
        info!(template = %target.name, field = %name, "field added");

        target.fields.push(FieldDefinition::new(name, FieldKind::String));
        target.fields.last().ok_or(TimelineError::InternalError(
            "failed to retrieve field after insert",
        ))
    }

    /// Remove the first field named `field` from a template. Existing
    /// instances keep their value for it.
    pub fn remove_field(
        &mut self,
        template: TemplateId,
        field: &str,
    ) -> Result<FieldDefinition, TimelineError> {
        let target = self
            .template_mut(template)
            .ok_or(TimelineError::UnknownTemplate(template))?;
        let index = target
            .fields
            .iter()
            .position(|f| f.name == field)
            .ok_or_else(|| TimelineError::UnknownField {
                owner: target.name.clone(),
                field: field.to_owned(),
            })?;
        let removed = target.fields.remove(index);
        info!(template = %target.name, field = %removed.name, "field removed");
        Ok(removed)
    }

    /// Remove every template.
    pub fn clear_templates(&mut self) {
        self.templates.clear();
        self.active_template = None;
    }

    /// Append a fully built template without any name check.
    pub fn push_template(&mut self, template: Template) -> TemplateId {
        let id = template.id;
        self.templates.push(template);
        id
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Place an instance of `template` at `frame` and select it.
    ///
    /// The instance receives a snapshot of the template's field defaults and
    /// a marker named `"{template}_{frame}"`.
    pub fn add_to_timeline(
        &mut self,
        template: TemplateId,
        frame: Frame,
    ) -> Result<&EventInstance, TimelineError> {
        let source = self
            .template(template)
            .ok_or(TimelineError::UnknownTemplate(template))?;
        let template_name = source.name.clone();
        let field_values = source.snapshot_values();

        self.ensure_free(&template_name, frame, None)?;
        info!(template = %template_name, frame, "event added to timeline");
        self.place_selected(template_name, frame, field_values)
    }

    /// Place the selected template at the frame cursor.
    pub fn add_active_to_current(&mut self) -> Result<&EventInstance, TimelineError> {
        let template = self.active_template().ok_or(TimelineError::NoActiveTemplate)?.id;
        self.add_to_timeline(template, self.current_frame)
    }

    /// Copy an instance to `target` (the frame cursor when `None`) and select
    /// the copy.
    ///
    /// Field values are copied from `source` as they are, stale kinds
    /// included; they are not re-derived from the template.
    pub fn duplicate_event(
        &mut self,
        source: InstanceId,
        target: Option<Frame>,
    ) -> Result<&EventInstance, TimelineError> {
        let frame = target.unwrap_or(self.current_frame);
        let original = self
            .instance(source)
            .ok_or(TimelineError::UnknownInstance(source))?;
        let template_name = original.template_name.clone();
        let field_values = original.field_values.clone();

        self.ensure_free(&template_name, frame, None)?;
        info!(template = %template_name, from = original.frame, to = frame, "event duplicated");
        self.place_selected(template_name, frame, field_values)
    }

    /// Place an instance without the duplicate check and without selecting
    /// it. Used by bulk import.
    pub fn push_imported(
        &mut self,
        template_name: String,
        frame: Frame,
        field_values: Vec<FieldValue>,
    ) -> Result<&EventInstance, TimelineError> {
        debug!(template = %template_name, frame, fields = field_values.len(), "event imported");
        self.place(template_name, frame, field_values)
    }

    /// Remove the first marker at `frame` and the first instance at `frame`.
    ///
    /// Neither lookup is scoped by template: when instances of different
    /// templates share the frame, the earliest one goes, together with
    /// whichever marker comes first on that frame.
    pub fn remove_from_timeline(&mut self, frame: Frame) -> Option<EventInstance> {
        if let Some(marker) = self.markers.find_by_frame(frame).cloned() {
            self.markers.remove(&marker);
        }

        let index = self.instances.iter().position(|i| i.frame == frame)?;
        let removed = self.instances.remove(index);
        if self.active_instance == Some(removed.id) {
            self.active_instance = None;
        }
        info!(template = %removed.template_name, frame, "event removed from timeline");
        Some(removed)
    }

    /// Remove every instance and every marker named after one. Returns the
    /// number of instances removed.
    pub fn clear_all(&mut self) -> usize {
        for instance in &self.instances {
            while let Some(marker) = self.markers.find_by_name(&instance.marker_name).cloned() {
                if !self.markers.remove(&marker) {
                    break;
                }
            }
        }
        let removed = self.instances.len();
        self.instances.clear();
        self.active_instance = None;
        info!(removed, "all events cleared from timeline");
        removed
    }

    // -----------------------------------------------------------------------
    // Edits on live instances
    // -----------------------------------------------------------------------

    /// Move an instance to `frame`.
    ///
    /// If another instance of the same template already sits on `frame` the
    /// edit is reverted: the instance's frame is read back from its marker
    /// and nothing else changes. Otherwise the marker is moved and renamed.
    pub fn set_frame(
        &mut self,
        id: InstanceId,
        frame: Frame,
    ) -> Result<EditOutcome, TimelineError> {
        let instance = self.instance(id).ok_or(TimelineError::UnknownInstance(id))?;
        let template_name = instance.template_name.clone();
        let marker_name = instance.marker_name.clone();

        if self.has_conflict(&template_name, frame, Some(id)) {
            let restored = self.markers.find_by_name(&marker_name).map(|m| m.frame);
            let instance = self.instance_mut(id)?;
            if let Some(restored) = restored {
                instance.frame = restored;
            }
            warn!(
                template = %template_name,
                frame,
                "frame edit conflicts with an existing event, reverted"
            );
            return Ok(EditOutcome::Reverted {
                template_name,
                frame,
            });
        }

        self.remirror(id, template_name, frame)?;
        Ok(EditOutcome::Applied)
    }

    /// Switch an instance to another template.
    ///
    /// The name resolves to the first template with that name; an unknown
    /// name is replaced by the first template in the palette, or by the empty
    /// name when the palette is empty. If the resolved pair collides with
    /// another instance the edit is reverted. Otherwise the instance's field
    /// values are replaced by a fresh snapshot of the resolved template and
    /// its marker is renamed.
    pub fn set_template_name(
        &mut self,
        id: InstanceId,
        requested: &str,
    ) -> Result<EditOutcome, TimelineError> {
        let frame = self
            .instance(id)
            .ok_or(TimelineError::UnknownInstance(id))?
            .frame;

        let resolved = self
            .template_by_name(requested)
            .or_else(|| self.templates.first())
            .map(|t| (t.name.clone(), t.snapshot_values()));
        let (template_name, field_values) = resolved.map_or_else(
            || (String::new(), None),
            |(name, values)| (name, Some(values)),
        );

        if self.has_conflict(&template_name, frame, Some(id)) {
            warn!(
                template = %template_name,
                frame,
                "template edit conflicts with an existing event, reverted"
            );
            return Ok(EditOutcome::Reverted {
                template_name,
                frame,
            });
        }

        self.remirror(id, template_name.clone(), frame)?;
        if let Some(values) = field_values {
            self.instance_mut(id)?.field_values = values;
        }

        if template_name == requested {
            Ok(EditOutcome::Applied)
        } else {
            warn!(requested, applied = %template_name, "template not found, substituted");
            Ok(EditOutcome::Substituted { template_name })
        }
    }

    /// Move an instance to the frame cursor.
    ///
    /// Unlike [`set_frame`](Self::set_frame), a conflict is reported as
    /// [`TimelineError::DuplicateEvent`] instead of being silently reverted.
    pub fn move_to_current(&mut self, id: InstanceId) -> Result<EditOutcome, TimelineError> {
        let frame = self.current_frame;
        let template_name = self
            .instance(id)
            .ok_or(TimelineError::UnknownInstance(id))?
            .template_name
            .clone();
        self.ensure_free(&template_name, frame, Some(id))?;
        self.set_frame(id, frame)
    }

    /// Overwrite one field value of an instance.
    ///
    /// `raw` is coerced into the value's snapshotted kind. For `ENUM` values
    /// whose template still declares options, the selection must be one of
    /// them.
    pub fn set_field_value(
        &mut self,
        id: InstanceId,
        field: &str,
        raw: &JsonValue,
    ) -> Result<&FieldValue, TimelineError> {
        let instance = self.instance(id).ok_or(TimelineError::UnknownInstance(id))?;
        let current = instance
            .field_value(field)
            .ok_or_else(|| TimelineError::UnknownField {
                owner: instance.marker_name.clone(),
                field: field.to_owned(),
            })?;
        let value = coerce(raw, current.kind()).map_err(|source| TimelineError::Coercion {
            field: field.to_owned(),
            source,
        })?;

        if let Value::Enum(selected) = &value {
            let options = self
                .template_by_name(&instance.template_name)
                .and_then(|t| t.field(field))
                .filter(|d| d.kind() == FieldKind::Enum)
                .map(FieldDefinition::enum_options)
                .unwrap_or_default();
            if !options.is_empty() && !options.contains(selected) {
                return Err(TimelineError::InvalidEnumOption {
                    field: field.to_owned(),
                    value: selected.clone(),
                    options,
                });
            }
        }

        let instance = self.instance_mut(id)?;
        let owner = instance.marker_name.clone();
        let slot = instance
            .field_values
            .iter_mut()
            .find(|v| v.name == field)
            .ok_or_else(|| TimelineError::UnknownField {
                owner,
                field: field.to_owned(),
            })?;
        debug!(field, value = %value, "field value set");
        slot.value = value;
        Ok(&*slot)
    }

    // -----------------------------------------------------------------------
    // Frame cursor
    // -----------------------------------------------------------------------

    /// Move the frame cursor. The first instance on the new frame, if any,
    /// becomes the selection.
    pub fn set_current_frame(&mut self, frame: Frame) {
        self.current_frame = frame;
        if let Some(found) = self.instances.iter().find(|i| i.frame == frame) {
            self.active_instance = Some(found.id);
        }
    }

    /// Move the frame cursor to an instance's frame.
    pub fn go_to_event(&mut self, id: InstanceId) -> Result<Frame, TimelineError> {
        let frame = self
            .instance(id)
            .ok_or(TimelineError::UnknownInstance(id))?
            .frame;
        self.current_frame = frame;
        info!(frame, "jumped to event frame");
        Ok(frame)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn has_conflict(&self, template_name: &str, frame: Frame, except: Option<InstanceId>) -> bool {
        self.instances
            .iter()
            .any(|i| Some(i.id) != except && i.occupies(template_name, frame))
    }

    fn ensure_free(
        &self,
        template_name: &str,
        frame: Frame,
        except: Option<InstanceId>,
    ) -> Result<(), TimelineError> {
        if self.has_conflict(template_name, frame, except) {
            warn!(template = %template_name, frame, "event already exists on frame");
            return Err(TimelineError::DuplicateEvent {
                template_name: template_name.to_owned(),
                frame,
            });
        }
        Ok(())
    }

    fn place(
        &mut self,
        template_name: String,
        frame: Frame,
        field_values: Vec<FieldValue>,
    ) -> Result<&EventInstance, TimelineError> {
        let instance = EventInstance::new(template_name, frame, field_values);
        self.markers.create(&instance.marker_name, frame);
        self.instances.push(instance);
        self.instances.last().ok_or(TimelineError::InternalError(
            "failed to retrieve instance after insert",
        ))
    }

    fn place_selected(
        &mut self,
        template_name: String,
        frame: Frame,
        field_values: Vec<FieldValue>,
    ) -> Result<&EventInstance, TimelineError> {
        let id = self.place(template_name, frame, field_values)?.id;
        self.active_instance = Some(id);
        self.instance(id).ok_or(TimelineError::InternalError(
            "failed to retrieve instance after insert",
        ))
    }

    /// Point an instance at `(template_name, frame)` and bring its marker
    /// along. A marker that has gone missing is recreated.
    fn remirror(
        &mut self,
        id: InstanceId,
        template_name: String,
        frame: Frame,
    ) -> Result<(), TimelineError> {
        let old_name = self
            .instance(id)
            .ok_or(TimelineError::UnknownInstance(id))?
            .marker_name
            .clone();
        let new_name = marker_name_for(&template_name, frame);

        let relocated = self
            .markers
            .find_by_name(&old_name)
            .cloned()
            .is_some_and(|marker| self.markers.relocate(&marker, &new_name, frame));
        if !relocated {
            warn!(marker = %old_name, "mirrored marker missing, recreating");
            self.markers.create(&new_name, frame);
        }

        let instance = self.instance_mut(id)?;
        info!(from = %old_name, to = %new_name, "event marker resynchronized");
        instance.template_name = template_name;
        instance.frame = frame;
        instance.marker_name = new_name;
        Ok(())
    }
}

/// First `"{prefix}_{n}"` with `n > taken` for which `exists` is false.
fn next_free_name(prefix: &str, taken: usize, exists: impl Fn(&str) -> bool) -> String {
    let mut n = taken.saturating_add(1);
    loop {
        let candidate = format!("{prefix}_{n}");
        if !exists(&candidate) || n == usize::MAX {
            return candidate;
        }
        n = n.saturating_add(1);
    }
}
