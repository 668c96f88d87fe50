//! Recent activity log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of entries kept.
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 5;

/// Severity of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    /// Routine event.
    Info,
    /// Completed action.
    Success,
    /// Degraded or suspicious condition.
    Warning,
}

/// One activity log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// When the event happened.
    pub time: DateTime<Utc>,
    /// What happened.
    pub description: String,
    /// Severity.
    pub status: ActivityStatus,
}

impl ActivityEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(time: DateTime<Utc>, description: impl Into<String>, status: ActivityStatus) -> Self {
        Self {
            time,
            description: description.into(),
            status,
        }
    }
}

/// Bounded FIFO of recent activity; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}

impl ActivityLog {
    /// Create a log holding at most `capacity` entries (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: ActivityEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    /// Copy of the entries from oldest to newest.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn entry(n: usize) -> ActivityEntry {
        let time = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ActivityEntry::new(time, format!("event {n}"), ActivityStatus::Info)
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = ActivityLog::default();
        for n in 0..7 {
            log.push(entry(n));
        }
        assert_eq!(log.len(), 5);
        let descriptions: Vec<_> = log.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, ["event 2", "event 3", "event 4", "event 5", "event 6"]);
    }

    #[test]
    fn capacity_is_at_least_one() {
        let mut log = ActivityLog::new(0);
        assert_eq!(log.capacity(), 1);
        assert!(log.is_empty());
        log.push(entry(1));
        log.push(entry(2));
        assert_eq!(log.to_vec(), vec![entry(2)]);
    }
}
