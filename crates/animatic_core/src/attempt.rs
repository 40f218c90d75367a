//! Cross-attempt memory for one job: failure history and blocked scripts.

use crate::{ErrorDetails, Fingerprint, Script};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// One failed render attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct AttemptRecord {
    attempt_number: u32,
    script: Script,
    error: ErrorDetails,
    session_id: String,
}

impl AttemptRecord {
    /// Record a failed attempt.
    pub fn new(
        attempt_number: u32,
        script: Script,
        error: ErrorDetails,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            attempt_number,
            script,
            error,
            session_id: session_id.into(),
        }
    }
}

/// FIFO window over failed attempts.
///
/// Bounds only what is replayed to the generator, not how many attempts run.
/// The newest records are always kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptHistory {
    limit: usize,
    records: VecDeque<AttemptRecord>,
}

impl AttemptHistory {
    /// Empty history keeping at most `limit` records (minimum 1).
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            records: VecDeque::new(),
        }
    }

    /// Append a record, evicting the oldest beyond the limit.
    ///
    /// Returns the number of evicted records.
    pub fn push(&mut self, record: AttemptRecord) -> usize {
        self.records.push_back(record);
        let mut evicted = 0;
        while self.records.len() > self.limit {
            self.records.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Records oldest first.
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records.iter().cloned().collect()
    }

    /// Iterate records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.records.iter()
    }

    /// Most recent record.
    pub fn latest(&self) -> Option<&AttemptRecord> {
        self.records.back()
    }

    /// Window size.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no attempt has failed yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Scripts already rejected during this job, keyed by fingerprint.
///
/// Only grows. Scripts are handed to the generator by value so it can avoid
/// resubmitting them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockedScripts {
    order: Vec<Fingerprint>,
    scripts: HashMap<Fingerprint, Script>,
}

impl BlockedScripts {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script. Returns `false` when its fingerprint was already blocked.
    pub fn insert(&mut self, script: &Script) -> bool {
        let fp = script.fingerprint();
        if self.scripts.contains_key(&fp) {
            return false;
        }
        self.order.push(fp.clone());
        self.scripts.insert(fp, script.clone());
        true
    }

    /// Whether a script with the same fingerprint is blocked.
    pub fn contains(&self, script: &Script) -> bool {
        self.scripts.contains_key(&script.fingerprint())
    }

    /// Blocked scripts in insertion order.
    pub fn scripts(&self) -> Vec<Script> {
        self.order
            .iter()
            .filter_map(|fp| self.scripts.get(fp).cloned())
            .collect()
    }

    /// Number of blocked fingerprints.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is blocked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
