//! Bounded in-memory record of guard verdicts.

use crate::guard::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Default number of entries kept.
const MAX_GUARD_LOG: usize = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardLogEntry {
    pub conversation_id: String,
    pub guard: String,
    pub verdict: Verdict,
    pub rejections: u32,
    pub timestamp: DateTime<Utc>,
}

/// Shared across requests; the oldest entries are dropped first.
#[derive(Debug)]
pub struct GuardLog {
    entries: RwLock<VecDeque<GuardLogEntry>>,
    capacity: usize,
}

impl Default for GuardLog {
    fn default() -> Self {
        Self::new(MAX_GUARD_LOG)
    }
}

impl GuardLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, conversation_id: &str, guard: &str, verdict: &Verdict, rejections: u32) {
        let entry = GuardLogEntry {
            conversation_id: conversation_id.to_string(),
            guard: guard.to_string(),
            verdict: verdict.clone(),
            rejections,
            timestamp: Utc::now(),
        };
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Snapshot, oldest first.
    pub fn entries(&self) -> Vec<GuardLogEntry> {
        match self.entries.read() {
            Ok(entries) => entries.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rejections(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| !e.verdict.is_accept())
            .count()
    }
}
