use std::rc::Rc;
use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use tracing::debug;

/// Timers and fire-and-forget tasks on a single-threaded event loop.
pub trait Scheduler {
    /// Repeating timer; dropping it cancels further ticks.
    type Timer;

    /// Calls `tick` every `period`, first after one full period.
    fn every(&self, period: Duration, tick: Box<dyn FnMut()>) -> Self::Timer;

    /// Runs `task` to completion in the background.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Owns the refresh timer. An interval of 0 means no timer at all.
pub struct Poller<S: Scheduler> {
    scheduler: S,
    interval_ms: u32,
    timer: Option<S::Timer>,
    tick: Rc<dyn Fn()>,
}

impl<S: Scheduler> Poller<S> {
    pub fn new(scheduler: S, tick: impl Fn() + 'static) -> Self {
        Self {
            scheduler,
            interval_ms: 0,
            timer: None,
            tick: Rc::new(tick),
        }
    }

    pub fn start(&mut self, interval_ms: u32) {
        self.set_interval(interval_ms);
    }

    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            debug!(interval_ms = self.interval_ms, "poll timer stopped");
        }
    }

    /// Cancels the current timer, then schedules a new one unless
    /// `interval_ms` is 0. Requests already in flight are not affected.
    pub fn set_interval(&mut self, interval_ms: u32) {
        self.stop();
        self.interval_ms = interval_ms;
        if interval_ms == 0 {
            debug!("polling disabled");
            return;
        }
        let tick = Rc::clone(&self.tick);
        let timer = self.scheduler.every(
            Duration::from_millis(u64::from(interval_ms)),
            Box::new(move || tick()),
        );
        self.timer = Some(timer);
        debug!(interval_ms, "poll timer started");
    }

    /// Runs the tick callback once, outside the timer.
    pub fn trigger_once(&self) {
        (self.tick)();
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }
}
