//! Diagnostic side channel for asynchronous queries
//!
//! Handles swallow faults and cancellations so waiters only ever see a
//! result buffer. What was swallowed lands here, and in the `tracing`
//! stream, so operators can still tell "no solutions" from "failed".

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of records kept before the oldest is dropped
pub const DEFAULT_HISTORY: usize = 256;

/// Category of a recorded fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Engine,
    Cancelled,
    Limit,
    Goal,
    /// Advancing a drained iterator. Only synchronous callers see this;
    /// handles drain with `has_next` and never record it.
    Exhausted,
}

/// One swallowed fault or cancellation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultRecord {
    /// Handle that observed the fault
    pub handle: Uuid,
    pub kind: FaultKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl FaultRecord {
    pub fn new(handle: Uuid, kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            handle,
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Bounded, shareable log of fault records
///
/// Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    records: Arc<Mutex<VecDeque<FaultRecord>>>,
    capacity: usize,
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Append a record, emitting it to `tracing` as well.
    pub fn record(&self, record: FaultRecord) {
        match record.kind {
            FaultKind::Cancelled => tracing::info!(
                handle = %record.handle,
                "query cancelled: {}",
                record.message
            ),
            kind => tracing::warn!(
                handle = %record.handle,
                kind = ?kind,
                "query fault swallowed: {}",
                record.message
            ),
        }

        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// All records, oldest first
    pub fn snapshot(&self) -> Vec<FaultRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Records observed by one handle
    pub fn for_handle(&self, handle: Uuid) -> Vec<FaultRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.handle == handle)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}
