//! Incremental log fetching for the logs panel.
//!
//! `GET /logs?timestamp=t` answers every entry stamped at or after `t`, so
//! the entries sharing the newest millisecond come back on the next fetch.
//! [`LogCursor`] remembers how many of those it has already shown.

use crate::models::LogEntry;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogCursor {
    newest: u64,
    seen_at_newest: usize,
}

impl LogCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `timestamp` query parameter for the next fetch.
    pub fn query_timestamp(&self) -> u64 {
        self.newest
    }

    /// Keeps the entries not accepted before, in server order. Entries older
    /// than the cursor are dropped.
    pub fn accept(&mut self, entries: Vec<LogEntry>) -> Vec<LogEntry> {
        let mut skip = self.seen_at_newest;
        let mut fresh = Vec::new();
        for entry in entries {
            if entry.timestamp < self.newest {
                continue;
            }
            if entry.timestamp == self.newest && skip > 0 {
                skip -= 1;
                continue;
            }
            if entry.timestamp > self.newest {
                self.newest = entry.timestamp;
                self.seen_at_newest = 0;
                skip = 0;
            }
            self.seen_at_newest += 1;
            fresh.push(entry);
        }
        fresh
    }
}
