//! Diffing a fresh snapshot against the row registry.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::models::{display_value, PinDescriptor, PinValue};
use crate::registry::{RowRegistry, RowState};
use crate::view::{RowView, TableView};

/// What one reconciliation pass did to the registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    /// Rows rendered this pass, in snapshot order.
    pub created: Vec<String>,
    /// Rows that existed before this pass and are still present.
    pub continuing: Vec<String>,
    /// The readable subset of `continuing`; the payload of the batched read.
    pub to_read: Vec<String>,
    /// Previously stale rows that reappeared (also listed in `continuing`).
    pub revived: Vec<String>,
    /// Rows absent from the snapshot, now stale.
    pub vanished: Vec<String>,
}

/// Creates rows for new pins, collects continuing ones and marks missing
/// ones stale. Staleness is applied after every create, so no pin is both
/// new and stale within one pass.
pub fn apply_snapshot<T>(
    registry: &mut RowRegistry<T::Row>,
    table: &T,
    snapshot: &[PinDescriptor],
) -> SnapshotOutcome
where
    T: TableView,
{
    let present: HashSet<&str> = snapshot.iter().map(|pin| pin.name.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(snapshot.len());
    let mut outcome = SnapshotOutcome::default();

    for pin in snapshot {
        if !seen.insert(pin.name.as_str()) {
            debug!(pin = %pin.name, "duplicate pin in snapshot; ignoring repeat");
            continue;
        }

        if !registry.has(&pin.name) {
            match registry.create(table, pin) {
                Ok(_) => outcome.created.push(pin.name.clone()),
                Err(err) => warn!(pin = %pin.name, %err, "failed to render pin row"),
            }
            continue;
        }

        let was_stale = match registry.get_mut(&pin.name) {
            Ok(row) => {
                row.readable = pin.readable;
                row.state() == RowState::Stale
            }
            Err(_) => false,
        };
        if was_stale && registry.mark_active(&pin.name).is_ok() {
            outcome.revived.push(pin.name.clone());
        }
        outcome.continuing.push(pin.name.clone());
        if pin.readable {
            outcome.to_read.push(pin.name.clone());
        } else {
            debug!(pin = %pin.name, "pin is not readable; leaving it out of the read");
        }
    }

    let missing: Vec<String> = registry
        .names()
        .filter(|name| !present.contains(name))
        .map(str::to_string)
        .collect();
    for name in missing {
        if registry.mark_stale(&name).is_ok() {
            outcome.vanished.push(name);
        }
    }

    outcome
}

/// Applies a batched read response. Rows being edited keep their input
/// untouched; every other row takes the value. Returns the names updated.
pub fn apply_reads<R: RowView>(
    registry: &mut RowRegistry<R>,
    values: &BTreeMap<String, Option<PinValue>>,
) -> Vec<String> {
    let mut updated = Vec::with_capacity(values.len());
    for (name, value) in values {
        let row = match registry.get_mut(name) {
            Ok(row) => row,
            Err(_) => {
                debug!(pin = %name, "read returned unknown pin; skipping");
                continue;
            }
        };
        if row.is_editing() {
            debug!(pin = %name, "pin is being edited; skipping refreshed value");
            continue;
        }
        row.view.set_value_text(&display_value(value.as_ref()));
        row.value = value.clone();
        updated.push(name.clone());
    }
    updated
}
