//! Test doubles for the scheduler and the pin service.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures_util::future::LocalBoxFuture;
use tokio::sync::oneshot;

use crate::models::{
    LogEntry, PinDescriptor, PinValue, PinValueRequest, PinValueResponse, RenderFragment,
};
use crate::poller::Scheduler;
use crate::service::PinService;

pub(crate) fn pin(name: &str, value: PinValue, kind: &str, writable: bool) -> PinDescriptor {
    PinDescriptor {
        name: name.to_string(),
        namespace: String::new(),
        value: Some(value),
        kind: kind.to_string(),
        readable: true,
        writable,
        html_template: RenderFragment {
            topic: format!("<span class=\"title\">{}</span>", name),
            value: String::new(),
            editable: String::new(),
        },
        value_history: Vec::new(),
    }
}

struct TimerSlot {
    period: Duration,
    tick: Box<dyn FnMut()>,
    cancelled: Rc<Cell<bool>>,
}

pub(crate) struct ManualTimer {
    cancelled: Rc<Cell<bool>>,
}

impl Drop for ManualTimer {
    fn drop(&mut self) {
        self.cancelled.set(true);
    }
}

/// Timers fire only when told to; spawned tasks run only when drained.
#[derive(Clone, Default)]
pub(crate) struct ManualScheduler {
    timers: Rc<RefCell<Vec<TimerSlot>>>,
    tasks: Rc<RefCell<VecDeque<LocalBoxFuture<'static, ()>>>>,
}

impl ManualScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn active_periods(&self) -> Vec<Duration> {
        self.timers
            .borrow()
            .iter()
            .filter(|slot| !slot.cancelled.get())
            .map(|slot| slot.period)
            .collect()
    }

    /// One tick of every live timer.
    pub(crate) fn fire_timers(&self) {
        let mut slots = std::mem::take(&mut *self.timers.borrow_mut());
        for slot in slots.iter_mut() {
            if !slot.cancelled.get() {
                (slot.tick)();
            }
        }
        let mut timers = self.timers.borrow_mut();
        slots.append(&mut timers);
        slots.retain(|slot| !slot.cancelled.get());
        *timers = slots;
    }

    pub(crate) fn pending_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub(crate) async fn run_pending(&self) {
        loop {
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task.await,
                None => break,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    type Timer = ManualTimer;

    fn every(&self, period: Duration, tick: Box<dyn FnMut()>) -> ManualTimer {
        let cancelled = Rc::new(Cell::new(false));
        self.timers.borrow_mut().push(TimerSlot {
            period,
            tick,
            cancelled: Rc::clone(&cancelled),
        });
        ManualTimer { cancelled }
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push_back(task);
    }
}

#[derive(Default)]
struct FakeState {
    snapshots: VecDeque<Result<Vec<PinDescriptor>, String>>,
    last_snapshot: Vec<PinDescriptor>,
    snapshot_calls: usize,
    values: BTreeMap<String, Option<PinValue>>,
    fail_reads: bool,
    fail_writes: bool,
    read_gates: VecDeque<oneshot::Receiver<()>>,
    requests: Vec<PinValueRequest>,
    logs: Vec<LogEntry>,
    fail_logs: bool,
    log_queries: Vec<u64>,
}

/// Scripted pin server. Snapshots are served in push order; the last one
/// repeats once the queue is empty.
#[derive(Clone, Default)]
pub(crate) struct FakePinService {
    state: Rc<RefCell<FakeState>>,
}

impl FakePinService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_snapshot(&self, pins: Vec<PinDescriptor>) {
        self.state.borrow_mut().snapshots.push_back(Ok(pins));
    }

    pub(crate) fn push_snapshot_failure(&self) {
        self.state
            .borrow_mut()
            .snapshots
            .push_back(Err("connection refused".to_string()));
    }

    pub(crate) fn set_value(&self, name: &str, value: PinValue) {
        self.state
            .borrow_mut()
            .values
            .insert(name.to_string(), Some(value));
    }

    pub(crate) fn value(&self, name: &str) -> Option<PinValue> {
        self.state.borrow().values.get(name).cloned().flatten()
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    /// The next read answers with the values current at request time but
    /// only returns once the sender fires.
    pub(crate) fn gate_next_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.borrow_mut().read_gates.push_back(rx);
        tx
    }

    pub(crate) fn push_log(&self, timestamp: u64, message: &str) {
        self.state.borrow_mut().logs.push(LogEntry {
            timestamp,
            message: message.to_string(),
        });
    }

    pub(crate) fn set_fail_logs(&self, fail: bool) {
        self.state.borrow_mut().fail_logs = fail;
    }

    /// `timestamp` parameters of every logs fetch, in order.
    pub(crate) fn log_queries(&self) -> Vec<u64> {
        self.state.borrow().log_queries.clone()
    }

    pub(crate) fn snapshot_calls(&self) -> usize {
        self.state.borrow().snapshot_calls
    }

    pub(crate) fn reads(&self) -> Vec<Vec<String>> {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|request| !request.read_pins.is_empty())
            .map(|request| request.read_pins.clone())
            .collect()
    }

    pub(crate) fn writes(&self) -> Vec<PinValueRequest> {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|request| !request.write_pins.is_empty())
            .cloned()
            .collect()
    }
}

impl PinService for FakePinService {
    async fn all_pins(&self) -> Result<Vec<PinDescriptor>> {
        let mut state = self.state.borrow_mut();
        state.snapshot_calls += 1;
        match state.snapshots.pop_front() {
            Some(Ok(pins)) => {
                for pin in &pins {
                    state
                        .values
                        .entry(pin.name.clone())
                        .or_insert_with(|| pin.value.clone());
                }
                state.last_snapshot = pins.clone();
                Ok(pins)
            }
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(state.last_snapshot.clone()),
        }
    }

    async fn pin_value(&self, request: &PinValueRequest) -> Result<PinValueResponse> {
        let (response, gate) = {
            let mut state = self.state.borrow_mut();
            state.requests.push(request.clone());
            if !request.write_pins.is_empty() {
                if state.fail_writes {
                    return Err(anyhow!("write rejected"));
                }
                for (name, value) in &request.write_pins {
                    state.values.insert(name.clone(), Some(value.clone()));
                }
            }
            if request.read_pins.is_empty() {
                return Ok(PinValueResponse::default());
            }
            if state.fail_reads {
                return Err(anyhow!("read timed out"));
            }
            let read_pins = request
                .read_pins
                .iter()
                .filter_map(|name| {
                    state
                        .values
                        .get(name)
                        .map(|value| (name.clone(), value.clone()))
                })
                .collect();
            let gate = state.read_gates.pop_front();
            (
                PinValueResponse {
                    read_pins: Some(read_pins),
                },
                gate,
            )
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(response)
    }

    async fn logs(&self, since: u64) -> Result<Vec<LogEntry>> {
        let mut state = self.state.borrow_mut();
        state.log_queries.push(since);
        if state.fail_logs {
            return Err(anyhow!("logs unavailable"));
        }
        Ok(state
            .logs
            .iter()
            .filter(|entry| entry.timestamp >= since)
            .cloned()
            .collect())
    }
}
