use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use pin_scanner::models::LogEntry;

use crate::util::now_ms;

/// Bounded in-memory log served by `/logs`; the oldest lines are dropped first.
pub(crate) struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    limit: usize,
}

impl LogBuffer {
    pub(crate) fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(VecDeque::new()),
            limit,
        })
    }

    pub(crate) fn push(&self, timestamp: u64, message: String) {
        if self.limit == 0 {
            return;
        }
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push_back(LogEntry { timestamp, message });
        while entries.len() > self.limit {
            entries.pop_front();
        }
    }

    /// Entries stamped at or after `timestamp`, oldest first.
    pub(crate) fn since(&self, timestamp: u64) -> Vec<LogEntry> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .iter()
            .filter(|entry| entry.timestamp >= timestamp)
            .cloned()
            .collect()
    }
}

/// Copies every event that passes the subscriber's filter into a `LogBuffer`.
pub(crate) struct LogBufferLayer {
    buffer: Arc<LogBuffer>,
}

impl LogBufferLayer {
    pub(crate) fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for LogBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        self.buffer.push(
            now_ms(),
            format!(
                "{} {}: {}{}",
                meta.level(),
                meta.target(),
                visitor.message,
                visitor.fields
            ),
        );
    }
}
