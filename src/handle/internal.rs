//! Completion slot shared between a handle and its worker

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use super::{Outcome, QueryState};
use crate::diagnostics::{DiagnosticLog, FaultRecord};
use crate::error::QueryError;
use crate::task::{CancelToken, GoalTask, Solutions};

struct Slot {
    state: QueryState,
    outcome: Option<Outcome>,
}

/// State written once by the worker (or by `cancel` before it starts)
/// and read by any number of waiters.
pub(crate) struct Shared {
    pub(crate) id: Uuid,
    slot: Mutex<Slot>,
    done: Condvar,
    token: CancelToken,
    diagnostics: DiagnosticLog,
}

impl Shared {
    pub(crate) fn new(diagnostics: DiagnosticLog) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot: Mutex::new(Slot {
                state: QueryState::Created,
                outcome: None,
            }),
            done: Condvar::new(),
            token: CancelToken::new(),
            diagnostics,
        }
    }

    pub(crate) fn state(&self) -> QueryState {
        self.slot.lock().state
    }

    pub(crate) fn outcome(&self) -> Option<Outcome> {
        self.slot.lock().outcome.clone()
    }

    /// Created → Scheduled. Called right before the task is handed to the pool.
    pub(crate) fn mark_scheduled(&self) {
        let mut slot = self.slot.lock();
        if slot.state == QueryState::Created {
            slot.state = QueryState::Scheduled;
        }
    }

    /// Scheduled → Running. Returns false when the handle was cancelled first.
    fn begin(&self) -> bool {
        let mut slot = self.slot.lock();
        if slot.state.is_terminal() {
            return false;
        }
        slot.state = QueryState::Running;
        true
    }

    fn finish(&self, result: Result<Solutions, QueryError>) {
        let outcome = match result {
            Ok(buffer) if buffer.is_empty() => Outcome::Empty,
            Ok(buffer) => Outcome::Solutions(buffer),
            Err(QueryError::Cancelled) => Outcome::Cancelled,
            Err(err) => Outcome::Faulted(Arc::new(err)),
        };
        // Record before publishing so a woken waiter already sees it.
        if let Some(record) = self.fault_record(&outcome) {
            self.diagnostics.record(record);
        }

        {
            let mut slot = self.slot.lock();
            slot.state = outcome.state();
            slot.outcome = Some(outcome);
        }
        self.done.notify_all();
    }

    fn fault_record(&self, outcome: &Outcome) -> Option<FaultRecord> {
        match outcome {
            Outcome::Faulted(err) => Some(FaultRecord::new(self.id, err.kind(), err.to_string())),
            Outcome::Cancelled => Some(FaultRecord::new(
                self.id,
                QueryError::Cancelled.kind(),
                QueryError::Cancelled.to_string(),
            )),
            _ => None,
        }
    }

    /// Request cancellation.
    ///
    /// Before the worker starts the handle goes straight to `Cancelled`;
    /// a running worker stops at its next solution boundary.
    pub(crate) fn cancel(&self) -> bool {
        let mut slot = self.slot.lock();
        let state = slot.state;
        match state {
            QueryState::Created | QueryState::Scheduled => {
                self.token.cancel();
                self.diagnostics.record(FaultRecord::new(
                    self.id,
                    QueryError::Cancelled.kind(),
                    "cancelled before start",
                ));
                slot.state = QueryState::Cancelled;
                slot.outcome = Some(Outcome::Cancelled);
                drop(slot);
                self.done.notify_all();
                true
            }
            QueryState::Running => {
                self.token.cancel();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn wait(&self) -> Outcome {
        let mut slot = self.slot.lock();
        loop {
            if let Some(outcome) = &slot.outcome {
                return outcome.clone();
            }
            self.done.wait(&mut slot);
        }
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait());
        };
        let mut slot = self.slot.lock();
        loop {
            if let Some(outcome) = &slot.outcome {
                return Some(outcome.clone());
            }
            if self.done.wait_until(&mut slot, deadline).timed_out() {
                return slot.outcome.clone();
            }
        }
    }
}

/// Worker body: run the task unless cancelled, then publish the outcome.
pub(crate) fn execute(shared: Arc<Shared>, task: GoalTask) {
    if !shared.begin() {
        tracing::debug!(handle = %shared.id, "skipping cancelled task");
        return;
    }

    let token = shared.token.clone();
    let result = panic::catch_unwind(AssertUnwindSafe(|| task.run_until(&token)))
        .unwrap_or_else(|payload| Err(QueryError::Engine(anyhow!(panic_message(&*payload)))));

    shared.finish(result);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("engine panicked: {}", detail)
}
