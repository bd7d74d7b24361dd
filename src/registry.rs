use std::collections::HashMap;

use crate::edit::EditState;
use crate::error::{ScanError, ScanResult};
use crate::models::{PinDescriptor, PinValue};
use crate::view::{RowView, TableView};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowState {
    Active,
    Stale,
}

/// A displayed pin. Created once per name and never removed.
pub struct Row<R> {
    pub(crate) name: String,
    pub(crate) kind: String,
    pub(crate) view: R,
    pub(crate) state: RowState,
    /// Write-only pins (events) are never part of the batched read.
    pub(crate) readable: bool,
    /// `None` for read-only pins.
    pub(crate) edit: Option<EditState>,
    pub(crate) value: Option<PinValue>,
}

impl<R: RowView> Row<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn view(&self) -> &R {
        &self.view
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn edit_state(&self) -> Option<EditState> {
        self.edit
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.edit.is_some()
    }

    pub fn is_editing(&self) -> bool {
        self.edit == Some(EditState::Editing)
    }

    /// Last value applied to this row, from a snapshot, a read or an edit.
    pub fn value(&self) -> Option<&PinValue> {
        self.value.as_ref()
    }

    pub fn displayed_text(&self) -> String {
        self.view.value_text()
    }
}

/// Pin name to row, in first-seen order. Append-only.
pub struct RowRegistry<R> {
    rows: Vec<Row<R>>,
    index: HashMap<String, usize>,
}

impl<R> Default for RowRegistry<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<R: RowView> RowRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Renders a row for `pin` at the end of `table` and registers it.
    pub fn create<T>(&mut self, table: &T, pin: &PinDescriptor) -> ScanResult<&mut Row<R>>
    where
        T: TableView<Row = R>,
    {
        if self.has(&pin.name) {
            return Err(ScanError::AlreadyRegistered(pin.name.clone()));
        }
        let view = table.append_row(pin)?;
        let position = self.rows.len();
        self.rows.push(Row {
            name: pin.name.clone(),
            kind: pin.kind.clone(),
            view,
            state: RowState::Active,
            readable: pin.readable,
            edit: pin.writable.then_some(EditState::Viewing),
            value: pin.value.clone(),
        });
        self.index.insert(pin.name.clone(), position);
        Ok(&mut self.rows[position])
    }

    pub fn get(&self, name: &str) -> ScanResult<&Row<R>> {
        self.index
            .get(name)
            .map(|position| &self.rows[*position])
            .ok_or_else(|| ScanError::NotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> ScanResult<&mut Row<R>> {
        match self.index.get(name) {
            Some(position) => Ok(&mut self.rows[*position]),
            None => Err(ScanError::NotFound(name.to_string())),
        }
    }

    pub fn mark_stale(&mut self, name: &str) -> ScanResult<()> {
        let row = self.get_mut(name)?;
        if row.state != RowState::Stale {
            row.state = RowState::Stale;
            row.view.set_stale(true);
        }
        Ok(())
    }

    pub fn mark_active(&mut self, name: &str) -> ScanResult<()> {
        let row = self.get_mut(name)?;
        if row.state != RowState::Active {
            row.state = RowState::Active;
            row.view.set_stale(false);
        }
        Ok(())
    }

    pub fn for_each(&self, mut f: impl FnMut(&Row<R>)) {
        self.rows.iter().for_each(|row| f(row));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row<R>> {
        self.rows.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
