//! Asynchronous, cancellable query execution
//!
//! An `AsyncQueryHandle` runs one `GoalTask` on a worker and lets any
//! number of callers wait for its result buffer.
//!
//! Waiters get a lenient view: a fault or a cancellation yields an empty
//! buffer, exactly like a goal with no solutions. Background and bulk
//! callers rely on never being failed by a single query. The cause is not
//! lost; it goes to the executor's [`DiagnosticLog`] and to `tracing`, and
//! [`AsyncQueryHandle::await_outcome`] exposes the typed result for
//! callers that need to tell the cases apart.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prolog_facade::{AsyncQueryHandle, GoalTask, ScryerProvider, Term};
//!
//! let provider = Arc::new(ScryerProvider::from_facts(&[
//!     Term::compound("parent", vec![Term::atom("tom"), Term::atom("bob")]),
//! ])?);
//! let goal = vec![Term::compound("parent", vec![Term::var("X"), Term::var("Y")])];
//!
//! let handle = AsyncQueryHandle::submit(GoalTask::new(provider, goal)?);
//! for solution in handle.await_result() {
//!     println!("{:?}", solution);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

mod internal;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use facade_term::Term;
use serde::Serialize;
use uuid::Uuid;

use crate::diagnostics::{DiagnosticLog, FaultRecord};
use crate::error::QueryError;
use crate::executor::Executor;
use crate::task::{GoalTask, Solutions};

pub(crate) use internal::{execute, Shared};

/// Lifecycle of a handle
///
/// `Completed`, `Faulted` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    Created,
    Scheduled,
    Running,
    Completed,
    Faulted,
    Cancelled,
}

impl QueryState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueryState::Completed | QueryState::Faulted | QueryState::Cancelled
        )
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryState::Created => "created",
            QueryState::Scheduled => "scheduled",
            QueryState::Running => "running",
            QueryState::Completed => "completed",
            QueryState::Faulted => "faulted",
            QueryState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Typed final result of a handle
#[derive(Debug, Clone)]
pub enum Outcome {
    /// At least one solution, in engine order
    Solutions(Solutions),
    /// The goal ran to exhaustion without a solution
    Empty,
    Faulted(Arc<QueryError>),
    Cancelled,
}

impl Outcome {
    /// Legacy view: faults and cancellations collapse to an empty buffer.
    pub fn into_solutions(self) -> Solutions {
        match self {
            Outcome::Solutions(buffer) => buffer,
            Outcome::Empty | Outcome::Faulted(_) | Outcome::Cancelled => Vec::new(),
        }
    }

    /// Borrowing form of [`Outcome::into_solutions`].
    pub fn solutions(&self) -> &[Vec<Term>] {
        match self {
            Outcome::Solutions(buffer) => buffer,
            _ => &[],
        }
    }

    pub fn fault(&self) -> Option<&Arc<QueryError>> {
        match self {
            Outcome::Faulted(err) => Some(err),
            _ => None,
        }
    }

    /// Terminal state this outcome corresponds to
    pub fn state(&self) -> QueryState {
        match self {
            Outcome::Solutions(_) | Outcome::Empty => QueryState::Completed,
            Outcome::Faulted(_) => QueryState::Faulted,
            Outcome::Cancelled => QueryState::Cancelled,
        }
    }
}

/// Awaitable handle to one submitted goal task
///
/// Clones refer to the same submission.
#[derive(Clone)]
pub struct AsyncQueryHandle {
    shared: Arc<Shared>,
    diagnostics: DiagnosticLog,
}

impl AsyncQueryHandle {
    /// Submit `task` to the process-wide default executor.
    pub fn submit(task: GoalTask) -> Self {
        Executor::global().submit(task)
    }

    pub(crate) fn from_shared(shared: Arc<Shared>, diagnostics: DiagnosticLog) -> Self {
        Self {
            shared,
            diagnostics,
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn state(&self) -> QueryState {
        self.shared.state()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Block until the task is done and return its solutions.
    ///
    /// Faults and cancellations return an empty buffer; see
    /// [`AsyncQueryHandle::await_outcome`] to distinguish them. Calling
    /// this again returns the same buffer without re-running anything.
    ///
    /// Do not call this from a worker of the executor that owns the
    /// handle: a saturated pool would never get to run the task.
    pub fn await_result(&self) -> Solutions {
        self.await_outcome().into_solutions()
    }

    /// Block until the task is done and return its typed outcome.
    pub fn await_outcome(&self) -> Outcome {
        self.shared.wait()
    }

    /// Wait at most `timeout`; `None` if the task is still pending.
    pub fn await_timeout(&self, timeout: Duration) -> Option<Outcome> {
        self.shared.wait_timeout(timeout)
    }

    /// Request cancellation. Best-effort.
    ///
    /// Returns false if the handle had already reached a terminal state.
    /// A task that finished draining its engine concurrently still
    /// completes with its solutions.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Fault recorded for this handle, if it faulted.
    pub fn fault(&self) -> Option<Arc<QueryError>> {
        self.shared.outcome()?.fault().cloned()
    }

    /// Diagnostic records for this handle
    pub fn diagnostics(&self) -> Vec<FaultRecord> {
        self.diagnostics.for_handle(self.id())
    }
}

impl fmt::Debug for AsyncQueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncQueryHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::FaultKind;
    use crate::solutions::tests::{numbered, Step};
    use crate::task::tests::{goal, ScriptedProvider};
    use anyhow::Result;
    use facade_term::{Bindings, Engine, Provider, Query};
    use parking_lot::{Condvar, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    fn single_worker() -> Executor {
        Executor::builder().threads(1).build().expect("pool")
    }

    fn wait_for_state(handle: &AsyncQueryHandle, state: QueryState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.state() != state {
            assert!(Instant::now() < deadline, "handle never reached {}", state);
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Provider whose engines block until the gate opens
    struct GateProvider {
        open: Mutex<bool>,
        opened: Condvar,
        calls: AtomicUsize,
    }

    impl GateProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                open: Mutex::new(false),
                opened: Condvar::new(),
                calls: AtomicUsize::new(0),
            })
        }

        fn release(&self) {
            *self.open.lock() = true;
            self.opened.notify_all();
        }
    }

    impl Provider for GateProvider {
        fn new_engine(&self) -> Result<Box<dyn Engine>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut open = self.open.lock();
            while !*open {
                self.opened.wait(&mut open);
            }
            Ok(Box::new(Endless))
        }
    }

    /// Engine with an unbounded stream of solutions
    struct Endless;

    struct EndlessQuery(i64);

    impl Query for EndlessQuery {
        fn has_more_solutions(&self) -> bool {
            true
        }

        fn next_solution(&mut self) -> Result<()> {
            self.next_variables_solution().map(|_| ())
        }

        fn next_variables_solution(&mut self) -> Result<Bindings> {
            thread::sleep(Duration::from_millis(1));
            self.0 += 1;
            let mut b = Bindings::new();
            b.insert("N", Term::int(self.0));
            Ok(b)
        }
    }

    impl Engine for Endless {
        fn query(&mut self, _goals: &[Term]) -> Result<Box<dyn Query + '_>> {
            Ok(Box::new(EndlessQuery(0)))
        }
    }

    /// One-shot signal between test threads
    struct Latch {
        set: Mutex<bool>,
        changed: Condvar,
    }

    impl Latch {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                set: Mutex::new(false),
                changed: Condvar::new(),
            })
        }

        fn open(&self) {
            *self.set.lock() = true;
            self.changed.notify_all();
        }

        fn wait(&self) {
            let mut set = self.set.lock();
            while !*set {
                self.changed.wait(&mut set);
            }
        }
    }

    /// Provider whose queries stall inside their last solution
    struct StallOnLast {
        reached: Arc<Latch>,
        release: Arc<Latch>,
    }

    struct StallQuery {
        remaining: i64,
        reached: Arc<Latch>,
        release: Arc<Latch>,
    }

    impl Query for StallQuery {
        fn has_more_solutions(&self) -> bool {
            self.remaining > 0
        }

        fn next_solution(&mut self) -> Result<()> {
            self.next_variables_solution().map(|_| ())
        }

        fn next_variables_solution(&mut self) -> Result<Bindings> {
            if self.remaining == 1 {
                self.reached.open();
                self.release.wait();
            }
            self.remaining -= 1;
            let mut b = Bindings::new();
            b.insert("N", Term::int(self.remaining));
            Ok(b)
        }
    }

    struct StallEngine {
        reached: Arc<Latch>,
        release: Arc<Latch>,
    }

    impl Engine for StallEngine {
        fn query(&mut self, _goals: &[Term]) -> Result<Box<dyn Query + '_>> {
            Ok(Box::new(StallQuery {
                remaining: 2,
                reached: Arc::clone(&self.reached),
                release: Arc::clone(&self.release),
            }))
        }
    }

    impl Provider for StallOnLast {
        fn new_engine(&self) -> Result<Box<dyn Engine>> {
            Ok(Box::new(StallEngine {
                reached: Arc::clone(&self.reached),
                release: Arc::clone(&self.release),
            }))
        }
    }

    #[test]
    fn test_completed_handle_returns_buffer() {
        let executor = single_worker();
        let provider = ScriptedProvider::new(numbered(3));
        let handle = executor.submit(GoalTask::new(provider, goal()).unwrap());

        let buffer = handle.await_result();
        assert_eq!(buffer.len(), 3);
        assert_eq!(handle.state(), QueryState::Completed);
        assert!(handle.fault().is_none());
        assert!(handle.diagnostics().is_empty());
    }

    #[test]
    fn test_await_twice_is_idempotent() {
        let executor = single_worker();
        let provider = ScriptedProvider::new(numbered(2));
        let handle = executor.submit(GoalTask::new(provider.clone(), goal()).unwrap());

        let first = handle.await_result();
        let second = handle.await_result();
        assert_eq!(first, second);
        assert_eq!(provider.engines_created(), 1);
    }

    #[test]
    fn test_fault_is_swallowed_and_recorded() {
        let executor = single_worker();
        let mut script = numbered(1);
        script.push(Step::Fault("existence_error(procedure, foo/0)"));
        let provider = ScriptedProvider::new(script);
        let handle = executor.submit(GoalTask::new(provider, goal()).unwrap());

        assert!(handle.await_result().is_empty());
        assert_eq!(handle.state(), QueryState::Faulted);
        assert!(matches!(handle.await_outcome(), Outcome::Faulted(_)));

        let records = handle.diagnostics();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, FaultKind::Engine);
        assert!(records[0].message.contains("existence_error"));
    }

    #[test]
    fn test_zero_solutions_is_empty_outcome() {
        let executor = single_worker();
        let provider = ScriptedProvider::new(vec![]);
        let handle = executor.submit(GoalTask::new(provider, goal()).unwrap());

        assert!(matches!(handle.await_outcome(), Outcome::Empty));
        assert_eq!(handle.state(), QueryState::Completed);
        assert!(handle.diagnostics().is_empty());
    }

    #[test]
    fn test_cancel_before_start_never_calls_provider() {
        let executor = single_worker();
        let gate = GateProvider::new();
        let blocker = executor.submit(GoalTask::new(gate.clone(), goal()).unwrap());
        wait_for_state(&blocker, QueryState::Running);

        let provider = ScriptedProvider::new(numbered(3));
        let queued = executor.submit(GoalTask::new(provider.clone(), goal()).unwrap());
        assert_eq!(queued.state(), QueryState::Scheduled);
        assert!(queued.cancel());
        assert_eq!(queued.state(), QueryState::Cancelled);

        blocker.cancel();
        gate.release();

        assert!(queued.await_result().is_empty());
        assert!(matches!(queued.await_outcome(), Outcome::Cancelled));
        assert!(blocker.await_result().is_empty());
        assert_eq!(provider.engines_created(), 0);
        assert_eq!(queued.diagnostics()[0].kind, FaultKind::Cancelled);
    }

    #[test]
    fn test_cancel_while_running_interrupts() {
        let executor = single_worker();
        let gate = GateProvider::new();
        gate.release();
        let handle = executor.submit(GoalTask::new(gate.clone(), goal()).unwrap());
        wait_for_state(&handle, QueryState::Running);

        assert!(handle.cancel());
        assert!(handle.await_result().is_empty());
        assert_eq!(handle.state(), QueryState::Cancelled);
        assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_after_completion_is_rejected() {
        let executor = single_worker();
        let provider = ScriptedProvider::new(numbered(2));
        let handle = executor.submit(GoalTask::new(provider, goal()).unwrap());
        handle.await_result();

        assert!(!handle.cancel());
        assert_eq!(handle.await_result().len(), 2);
    }

    #[test]
    fn test_await_timeout_on_pending_task() {
        let executor = single_worker();
        let gate = GateProvider::new();
        let handle = executor.submit(GoalTask::new(gate.clone(), goal()).unwrap());

        assert!(handle.await_timeout(Duration::from_millis(20)).is_none());

        handle.cancel();
        gate.release();
        let outcome = handle.await_timeout(Duration::from_secs(5));
        assert!(matches!(outcome, Some(Outcome::Cancelled)));
    }

    #[test]
    fn test_await_timeout_accepts_unbounded_duration() {
        let executor = single_worker();
        let provider = ScriptedProvider::new(numbered(2));
        let handle = executor.submit(GoalTask::new(provider, goal()).unwrap());

        let outcome = handle.await_timeout(Duration::MAX).expect("finished");
        assert_eq!(outcome.into_solutions().len(), 2);
        let again = handle.await_timeout(Duration::MAX).expect("finished");
        assert_eq!(again.state(), QueryState::Completed);
    }

    #[test]
    fn test_cancel_during_last_solution_still_completes() {
        let executor = single_worker();
        let reached = Latch::new();
        let release = Latch::new();
        let provider = Arc::new(StallOnLast {
            reached: Arc::clone(&reached),
            release: Arc::clone(&release),
        });
        let handle = executor.submit(GoalTask::new(provider, goal()).unwrap());

        reached.wait();
        assert_eq!(handle.state(), QueryState::Running);
        assert!(handle.cancel());
        release.open();

        match handle.await_outcome() {
            Outcome::Solutions(buffer) => {
                assert_eq!(buffer, vec![vec![Term::int(1)], vec![Term::int(0)]])
            }
            other => panic!("expected solutions, got {:?}", other),
        }
        assert_eq!(handle.state(), QueryState::Completed);
        assert!(handle.diagnostics().is_empty());
    }

    #[test]
    fn test_panicking_engine_is_a_fault() {
        let executor = single_worker();
        let provider: Arc<dyn Provider> =
            Arc::new(|| -> Result<Box<dyn Engine>> { panic!("engine blew up") });
        let handle = executor.submit(GoalTask::new(provider, goal()).unwrap());

        assert!(handle.await_result().is_empty());
        let fault = handle.fault().expect("fault recorded");
        assert!(fault.to_string().contains("engine blew up"));
    }

    #[test]
    fn test_waiters_on_other_threads_see_same_buffer() {
        let executor = single_worker();
        let provider = ScriptedProvider::new(numbered(4));
        let handle = executor.submit(GoalTask::new(provider, goal()).unwrap());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || handle.await_result())
            })
            .collect();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap().len(), 4);
        }
    }

    #[test]
    fn test_outcome_views() {
        let outcome = Outcome::Faulted(Arc::new(QueryError::Exhausted));
        assert!(outcome.solutions().is_empty());
        assert_eq!(outcome.state(), QueryState::Faulted);
        assert!(outcome.fault().is_some());
        assert!(outcome.into_solutions().is_empty());

        let outcome = Outcome::Solutions(vec![vec![Term::int(1)]]);
        assert_eq!(outcome.solutions().len(), 1);
        assert_eq!(outcome.state(), QueryState::Completed);
    }
}
