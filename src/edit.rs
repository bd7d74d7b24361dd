//! Per-row display/edit state machine for writable pins.

use tracing::{debug, warn};

use crate::error::{ScanError, ScanResult};
use crate::models::{display_value, PinValue, PinValueRequest};
use crate::registry::Row;
use crate::view::RowView;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Viewing,
    Editing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditEvent {
    Open,
    Commit,
    Cancel,
}

impl EditState {
    /// `None` when the event is not accepted in this state.
    pub fn next(self, event: EditEvent) -> Option<EditState> {
        match (self, event) {
            (EditState::Viewing, EditEvent::Open) => Some(EditState::Editing),
            (EditState::Editing, EditEvent::Commit) => Some(EditState::Viewing),
            (EditState::Editing, EditEvent::Cancel) => Some(EditState::Viewing),
            _ => None,
        }
    }
}

fn transition<R>(row: &mut Row<R>, event: EditEvent) -> ScanResult<()> {
    let current = row
        .edit
        .ok_or_else(|| ScanError::NotWritable(row.name.clone()))?;
    let next = current.next(event).ok_or_else(|| match current {
        EditState::Editing => ScanError::AlreadyEditing(row.name.clone()),
        EditState::Viewing => ScanError::NotEditing(row.name.clone()),
    })?;
    row.edit = Some(next);
    Ok(())
}

/// Viewing -> Editing. The input starts out holding the row's current value;
/// the rendered value fragment is never read back.
pub fn begin_edit<R: RowView>(row: &mut Row<R>) -> ScanResult<()> {
    transition(row, EditEvent::Open)?;
    let current = display_value(row.value.as_ref());
    row.view.open_editor(&current);
    debug!(pin = %row.name, "edit opened");
    Ok(())
}

/// Editing -> Viewing, keeping the input. The display updates before the
/// returned write request is sent and is not rolled back if the write fails.
/// Write-only pins hold no value, so their display stays empty.
pub fn commit_edit<R: RowView>(row: &mut Row<R>) -> ScanResult<PinValueRequest> {
    transition(row, EditEvent::Commit)?;
    let input = row.view.editor_input();
    let value = PinValue::parse_for_type(&row.kind, &input);
    if matches!(value, PinValue::Text(_)) && matches!(row.kind.as_str(), "numeric" | "boolean") {
        warn!(pin = %row.name, kind = %row.kind, input = %input, "input does not match pin type; sending as text");
    }
    if row.readable {
        row.view.set_value_text(&input);
        row.value = Some(value.clone());
    }
    row.view.close_editor();
    debug!(pin = %row.name, value = %value, "edit committed");
    Ok(PinValueRequest::write(row.name.clone(), value))
}

/// Editing -> Viewing, discarding the input.
pub fn cancel_edit<R: RowView>(row: &mut Row<R>) -> ScanResult<()> {
    transition(row, EditEvent::Cancel)?;
    row.view.close_editor();
    debug!(pin = %row.name, "edit cancelled");
    Ok(())
}
