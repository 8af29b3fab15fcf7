//! Interactive control layout model and its pure transforms.
//!
//! A layout is the full set of controls attached to one result message.
//! Layouts are immutable values: every transform returns a new layout
//! and the input is left untouched. Mutation of the actual message is
//! the dispatcher's job, done by whole-layout replacement.

use std::collections::HashMap;

use crate::actions::{encode_control_id, encode_rating_control_id, FollowUpKind, JobAction,
    RATING_OPTIONS};

/// Visual emphasis of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlStyle {
    /// The resting style of an untouched control.
    #[default]
    Neutral,
    /// The highlighted style of an activated (consumed) control.
    Emphasized,
}

/// One interactive control (a button) on a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// Colon-delimited follow-up identifier, see [`crate::actions`].
    pub id: String,
    pub style: ControlStyle,
    pub disabled: bool,
    /// Glyph shown on the control; rating controls carry one.
    pub glyph: Option<String>,
    /// Short text label, e.g. `U3`.
    pub label: Option<String>,
}

impl Control {
    fn labeled(id: String, label: String) -> Self {
        Self {
            id,
            style: ControlStyle::Neutral,
            disabled: false,
            glyph: None,
            label: Some(label),
        }
    }

    fn glyphed(id: String, glyph: String) -> Self {
        Self {
            id,
            style: ControlStyle::Neutral,
            disabled: false,
            glyph: Some(glyph),
            label: None,
        }
    }
}

/// Ordered rows of ordered controls attached to one message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlLayout {
    pub rows: Vec<Vec<Control>>,
}

impl ControlLayout {
    /// Build an identifier -> (row, column) index for O(1) lookup.
    fn index(&self) -> HashMap<&str, (usize, usize)> {
        let mut map = HashMap::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, control) in row.iter().enumerate() {
                map.insert(control.id.as_str(), (r, c));
            }
        }
        map
    }

    /// Find a control by identifier.
    pub fn find(&self, control_id: &str) -> Option<&Control> {
        let (r, c) = *self.index().get(control_id)?;
        Some(&self.rows[r][c])
    }

    /// Whether a control exists and has not been activated yet.
    pub fn is_enabled(&self, control_id: &str) -> bool {
        self.find(control_id).is_some_and(|control| !control.disabled)
    }
}

/// Return a copy of `layout` with the named control emphasized and
/// disabled. All other controls are unchanged.
///
/// An unknown identifier returns the layout as-is: the layout is then
/// already consistent with the requested state. Activation is one-way,
/// so applying this twice equals applying it once.
pub fn activate_control(control_id: &str, layout: &ControlLayout) -> ControlLayout {
    let mut updated = layout.clone();
    if let Some(&(r, c)) = layout.index().get(control_id) {
        let control = &mut updated.rows[r][c];
        control.style = ControlStyle::Emphasized;
        control.disabled = true;
    }
    updated
}

/// Number of image slots a generation result exposes per action row.
const SLOTS_PER_ROW: u32 = 4;

/// Build the follow-up controls presented under a terminal result.
///
/// An upscaled image gets a single row of rating controls. Every other
/// result gets a variation row and an upscale row, one control per
/// image slot.
pub fn build_follow_up_rows(
    action: JobAction,
    user_id: &str,
    job_id: &str,
    image_index: u32,
) -> ControlLayout {
    let rows = match action {
        JobAction::Upscale => vec![rating_row(user_id, job_id, image_index)],
        JobAction::Generate | JobAction::Variation => vec![
            slot_row(FollowUpKind::Variation, user_id, job_id),
            slot_row(FollowUpKind::Upscale, user_id, job_id),
        ],
    };
    ControlLayout { rows }
}

fn slot_row(kind: FollowUpKind, user_id: &str, job_id: &str) -> Vec<Control> {
    let initial = kind
        .as_str()
        .chars()
        .next()
        .unwrap_or('?')
        .to_ascii_uppercase();

    (0..SLOTS_PER_ROW)
        .map(|slot| {
            Control::labeled(
                encode_control_id(kind, user_id, job_id, slot),
                format!("{initial}{}", slot + 1),
            )
        })
        .collect()
}

fn rating_row(user_id: &str, job_id: &str, image_index: u32) -> Vec<Control> {
    RATING_OPTIONS
        .iter()
        .map(|option| {
            Control::glyphed(
                encode_rating_control_id(user_id, job_id, image_index, option.value),
                option.glyph.to_string(),
            )
        })
        .collect()
}
