//! The seam between the dashboard core and whatever draws the table.
//!
//! In the browser this is the DOM (see `wasm_app`); natively it is
//! [`HeadlessTable`], which keeps the same state in memory.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ScanResult;
use crate::models::{display_value, LogEntry, PinDescriptor};

/// One rendered table row.
pub trait RowView {
    /// Replaces the text of the value display element.
    fn set_value_text(&self, text: &str);
    fn value_text(&self) -> String;
    /// Dims (or restores) the topic cell.
    fn set_stale(&self, stale: bool);
    /// Hides the value display and edit trigger, shows the input holding `current`.
    fn open_editor(&self, current: &str);
    /// Current content of the edit input.
    fn editor_input(&self) -> String;
    /// Shows the value display and edit trigger, hides the input.
    fn close_editor(&self);
}

pub trait TableView {
    type Row: RowView;

    /// Renders the pin's fragments into a new row at the end of the table.
    /// Writable pins get the Edit/OK/Cancel affordances.
    fn append_row(&self, pin: &PinDescriptor) -> ScanResult<Self::Row>;

    /// Adds one line to the end of the logs panel.
    fn append_log(&self, entry: &LogEntry);
}

#[derive(Debug, Default)]
struct HeadlessRowState {
    name: String,
    topic_markup: String,
    value_markup: String,
    value_text: String,
    stale: bool,
    editable: bool,
    editor_open: bool,
    input: String,
}

/// In-memory row, cheap to clone; clones share state.
#[derive(Clone, Debug, Default)]
pub struct HeadlessRow {
    inner: Rc<RefCell<HeadlessRowState>>,
}

impl HeadlessRow {
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn topic_markup(&self) -> String {
        self.inner.borrow().topic_markup.clone()
    }

    pub fn value_markup(&self) -> String {
        self.inner.borrow().value_markup.clone()
    }

    pub fn is_stale(&self) -> bool {
        self.inner.borrow().stale
    }

    pub fn has_edit_trigger(&self) -> bool {
        let state = self.inner.borrow();
        state.editable && !state.editor_open
    }

    pub fn is_editor_open(&self) -> bool {
        self.inner.borrow().editor_open
    }

    /// Simulates the operator typing into the open editor.
    pub fn type_input(&self, text: &str) {
        self.inner.borrow_mut().input = text.to_string();
    }
}

impl RowView for HeadlessRow {
    fn set_value_text(&self, text: &str) {
        self.inner.borrow_mut().value_text = text.to_string();
    }

    fn value_text(&self) -> String {
        self.inner.borrow().value_text.clone()
    }

    fn set_stale(&self, stale: bool) {
        self.inner.borrow_mut().stale = stale;
    }

    fn open_editor(&self, current: &str) {
        let mut state = self.inner.borrow_mut();
        state.editor_open = true;
        state.input = current.to_string();
    }

    fn editor_input(&self) -> String {
        self.inner.borrow().input.clone()
    }

    fn close_editor(&self) {
        let mut state = self.inner.borrow_mut();
        state.editor_open = false;
        state.input.clear();
    }
}

/// Table kept in memory, in append order.
#[derive(Clone, Debug, Default)]
pub struct HeadlessTable {
    rows: Rc<RefCell<Vec<HeadlessRow>>>,
    logs: Rc<RefCell<Vec<LogEntry>>>,
}

impl HeadlessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<HeadlessRow> {
        self.rows.borrow().clone()
    }

    pub fn row(&self, name: &str) -> Option<HeadlessRow> {
        self.rows
            .borrow()
            .iter()
            .find(|row| row.inner.borrow().name == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.rows.borrow().iter().map(HeadlessRow::name).collect()
    }

    /// Messages in the logs panel, oldest first.
    pub fn log_lines(&self) -> Vec<String> {
        self.logs
            .borrow()
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }
}

impl TableView for HeadlessTable {
    type Row = HeadlessRow;

    fn append_row(&self, pin: &PinDescriptor) -> ScanResult<HeadlessRow> {
        let row = HeadlessRow {
            inner: Rc::new(RefCell::new(HeadlessRowState {
                name: pin.name.clone(),
                topic_markup: pin.html_template.topic.clone(),
                value_markup: pin.html_template.value.clone(),
                value_text: display_value(pin.value.as_ref()),
                stale: false,
                editable: pin.writable,
                editor_open: false,
                input: String::new(),
            })),
        };
        self.rows.borrow_mut().push(row.clone());
        Ok(row)
    }

    fn append_log(&self, entry: &LogEntry) {
        self.logs.borrow_mut().push(entry.clone());
    }
}
