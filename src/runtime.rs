use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::poller::Scheduler;

/// Scheduler for a tokio `LocalSet`. Must be used from inside one.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

/// Aborts the timer task when dropped.
pub struct TokioTimer(JoinHandle<()>);

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Scheduler for TokioScheduler {
    type Timer = TokioTimer;

    fn every(&self, period: Duration, mut tick: Box<dyn FnMut()>) -> TokioTimer {
        TokioTimer(tokio::task::spawn_local(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick();
            }
        }))
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}
