//! The live pin table: registry, poller, edit controller and service wired
//! together behind one handle.
//!
//! Everything runs on one thread. Poll cycles are fire-and-forget: a cycle
//! still waiting on the network when the next tick fires is not cancelled,
//! and both apply their results in arrival order. Each cycle carries a
//! [`CycleId`] so that ordering is observable and, with
//! [`OverlapPolicy::DiscardSuperseded`], enforceable for reads.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::edit;
use crate::error::{ScanError, ScanResult};
use crate::logs::LogCursor;
use crate::models::{PinValue, PinValueRequest};
use crate::options::{ClientConfig, OverlapPolicy};
use crate::poller::{Poller, Scheduler};
use crate::reconcile::{apply_reads, apply_snapshot, SnapshotOutcome};
use crate::registry::RowRegistry;
use crate::service::PinService;
use crate::view::TableView;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// No readable continuing pins, so no read was sent.
    Skipped,
    Applied(Vec<String>),
    /// A newer cycle's read was already applied and the policy discards.
    Superseded,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub id: CycleId,
    pub snapshot: SnapshotOutcome,
    pub read: ReadOutcome,
    /// Lines appended to the logs panel.
    pub logs: usize,
}

struct Inner<T: TableView, P, S: Scheduler> {
    table: T,
    service: P,
    scheduler: S,
    registry: RefCell<RowRegistry<T::Row>>,
    poller: RefCell<Poller<S>>,
    log_cursor: RefCell<LogCursor>,
    overlap: OverlapPolicy,
    next_cycle: Cell<u64>,
    newest_applied_read: Cell<Option<CycleId>>,
}

pub struct Dashboard<T: TableView, P, S: Scheduler> {
    inner: Rc<Inner<T, P, S>>,
}

impl<T: TableView, P, S: Scheduler> Clone for Dashboard<T, P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, P, S> Dashboard<T, P, S>
where
    T: TableView + 'static,
    P: PinService + 'static,
    S: Scheduler + Clone + 'static,
{
    pub fn new(table: T, service: P, scheduler: S, config: &ClientConfig) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<Inner<T, P, S>>| {
            let weak = weak.clone();
            let poller = Poller::new(scheduler.clone(), move || {
                if let Some(inner) = weak.upgrade() {
                    Dashboard { inner }.spawn_cycle();
                }
            });
            Inner {
                table,
                service,
                scheduler,
                registry: RefCell::new(RowRegistry::new()),
                poller: RefCell::new(poller),
                log_cursor: RefCell::new(LogCursor::new()),
                overlap: config.overlap,
                next_cycle: Cell::new(0),
                newest_applied_read: Cell::new(None),
            }
        });
        Self { inner }
    }

    /// Initial load plus the repeating timer at `refresh_ms`.
    pub fn start(&self, refresh_ms: u32) {
        info!(refresh_ms, "dashboard starting");
        self.trigger_once();
        self.inner.poller.borrow_mut().start(refresh_ms);
    }

    pub fn stop(&self) {
        self.inner.poller.borrow_mut().stop();
    }

    /// 0 disables polling until a positive interval is set.
    pub fn set_interval(&self, interval_ms: u32) {
        self.inner.poller.borrow_mut().set_interval(interval_ms);
    }

    pub fn interval_ms(&self) -> u32 {
        self.inner.poller.borrow().interval_ms()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.borrow().is_running()
    }

    /// Runs one poll cycle outside the timer.
    pub fn trigger_once(&self) {
        self.inner.poller.borrow().trigger_once();
    }

    fn spawn_cycle(&self) {
        let dashboard = self.clone();
        self.inner.scheduler.spawn(Box::pin(async move {
            // failures are logged inside the cycle
            let _ = dashboard.run_cycle().await;
        }));
    }

    /// Fetches a snapshot, reconciles it, refreshes readable continuing pins
    /// with one batched read and appends new server log lines.
    pub async fn run_cycle(&self) -> ScanResult<CycleReport> {
        let id = CycleId(self.inner.next_cycle.get());
        self.inner.next_cycle.set(id.0 + 1);

        let snapshot = match self.inner.service.all_pins().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(cycle = id.0, ?err, "failed to fetch pins");
                return Err(ScanError::Service(err));
            }
        };

        let outcome = {
            let mut registry = self.inner.registry.borrow_mut();
            apply_snapshot(&mut *registry, &self.inner.table, &snapshot)
        };
        debug!(
            cycle = id.0,
            pins = snapshot.len(),
            created = outcome.created.len(),
            continuing = outcome.continuing.len(),
            vanished = outcome.vanished.len(),
            "snapshot reconciled"
        );

        let read = if outcome.to_read.is_empty() {
            ReadOutcome::Skipped
        } else {
            let request = PinValueRequest::read(outcome.to_read.clone());
            match self.inner.service.pin_value(&request).await {
                Ok(response) => {
                    self.apply_read_response(id, response.read_pins.unwrap_or_default())
                }
                Err(err) => {
                    warn!(cycle = id.0, ?err, "failed to read pin values");
                    ReadOutcome::Failed
                }
            }
        };
        let logs = self.refresh_logs(id).await;

        Ok(CycleReport {
            id,
            snapshot: outcome,
            read,
            logs,
        })
    }

    /// A failed fetch leaves the panel as it is; the next cycle asks again
    /// from the same timestamp.
    async fn refresh_logs(&self, id: CycleId) -> usize {
        let since = self.inner.log_cursor.borrow().query_timestamp();
        let entries = match self.inner.service.logs(since).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(cycle = id.0, ?err, "failed to fetch logs");
                return 0;
            }
        };
        let fresh = self.inner.log_cursor.borrow_mut().accept(entries);
        for entry in &fresh {
            self.inner.table.append_log(entry);
        }
        fresh.len()
    }

    fn apply_read_response(
        &self,
        id: CycleId,
        values: BTreeMap<String, Option<PinValue>>,
    ) -> ReadOutcome {
        if let Some(newest) = self.inner.newest_applied_read.get() {
            if id < newest {
                match self.inner.overlap {
                    OverlapPolicy::DiscardSuperseded => {
                        debug!(cycle = id.0, newest = newest.0, "discarding superseded read");
                        return ReadOutcome::Superseded;
                    }
                    OverlapPolicy::LastArrivalWins => {
                        debug!(cycle = id.0, newest = newest.0, "applying read from an older cycle");
                    }
                }
            }
        }
        let newest = self.inner.newest_applied_read.get().map_or(id, |newest| newest.max(id));
        self.inner.newest_applied_read.set(Some(newest));

        let mut registry = self.inner.registry.borrow_mut();
        ReadOutcome::Applied(apply_reads(&mut *registry, &values))
    }

    pub fn begin_edit(&self, name: &str) -> ScanResult<()> {
        let mut registry = self.inner.registry.borrow_mut();
        edit::begin_edit(registry.get_mut(name)?)
    }

    pub fn cancel_edit(&self, name: &str) -> ScanResult<()> {
        let mut registry = self.inner.registry.borrow_mut();
        edit::cancel_edit(registry.get_mut(name)?)
    }

    /// Shows the input immediately and sends the write in the background.
    /// A failed write is logged; the display keeps the entered value.
    pub fn commit_edit(&self, name: &str) -> ScanResult<()> {
        let request = {
            let mut registry = self.inner.registry.borrow_mut();
            edit::commit_edit(registry.get_mut(name)?)?
        };
        let dashboard = self.clone();
        self.inner.scheduler.spawn(Box::pin(async move {
            dashboard.send_write(request).await;
        }));
        Ok(())
    }

    async fn send_write(&self, request: PinValueRequest) {
        if let Err(err) = self.inner.service.pin_value(&request).await {
            let pins: Vec<&String> = request.write_pins.keys().collect();
            warn!(?pins, ?err, "failed to write pin value");
        }
    }

    /// Read access to the registry for callers that render or inspect it.
    pub fn with_registry<U>(&self, f: impl FnOnce(&RowRegistry<T::Row>) -> U) -> U {
        let registry = self.inner.registry.borrow();
        f(&*registry)
    }

    pub fn table(&self) -> &T {
        &self.inner.table
    }
}
