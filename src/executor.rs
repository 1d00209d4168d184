//! Worker pool for asynchronous queries

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::FacadeConfig;
use crate::diagnostics::{DiagnosticLog, DEFAULT_HISTORY};
use crate::handle::{execute, AsyncQueryHandle, Shared};
use crate::task::GoalTask;

enum Pool {
    /// rayon's global pool
    Global,
    Owned(ThreadPool),
}

/// Runs goal tasks on worker threads and collects their diagnostics
pub struct Executor {
    pool: Pool,
    diagnostics: DiagnosticLog,
    solution_limit: Option<usize>,
}

/// Builder for [`Executor`]
#[derive(Debug, Clone)]
pub struct ExecutorBuilder {
    threads: Option<usize>,
    thread_name: String,
    history: usize,
    solution_limit: Option<usize>,
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self {
            threads: None,
            thread_name: "plq-worker".to_string(),
            history: DEFAULT_HISTORY,
            solution_limit: None,
        }
    }
}

impl ExecutorBuilder {
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    /// Limit applied to submitted tasks that don't set their own
    pub fn solution_limit(mut self, limit: usize) -> Self {
        self.solution_limit = Some(limit);
        self
    }

    pub fn build(self) -> Result<Executor> {
        let name = self.thread_name;
        let mut builder = ThreadPoolBuilder::new().thread_name(move |i| format!("{}-{}", name, i));
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build().context("Failed to build worker pool")?;

        Ok(Executor {
            pool: Pool::Owned(pool),
            diagnostics: DiagnosticLog::new(self.history),
            solution_limit: self.solution_limit,
        })
    }
}

static GLOBAL: OnceLock<Executor> = OnceLock::new();

impl Executor {
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    /// Executor with its own pool, configured from `config`.
    pub fn from_config(config: &FacadeConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .thread_name(config.executor.thread_name.clone())
            .history(config.diagnostics.history);
        if let Some(threads) = config.executor.threads {
            builder = builder.threads(threads);
        }
        if let Some(limit) = config.query.solution_limit {
            builder = builder.solution_limit(limit);
        }
        builder.build()
    }

    /// Process-wide executor, built on first use from the default config.
    ///
    /// Falls back to rayon's global pool if its own pool can't be built.
    pub fn global() -> &'static Executor {
        GLOBAL.get_or_init(|| {
            Self::from_config(&FacadeConfig::default()).unwrap_or_else(|err| {
                tracing::warn!("default executor unavailable, using rayon global pool: {:#}", err);
                Executor {
                    pool: Pool::Global,
                    diagnostics: DiagnosticLog::default(),
                    solution_limit: None,
                }
            })
        })
    }

    /// Schedule `task` and return immediately.
    pub fn submit(&self, mut task: GoalTask) -> AsyncQueryHandle {
        if let (None, Some(limit)) = (task.solution_limit(), self.solution_limit) {
            task = task.with_solution_limit(limit);
        }

        let shared = Arc::new(Shared::new(self.diagnostics.clone()));
        let handle = AsyncQueryHandle::from_shared(Arc::clone(&shared), self.diagnostics.clone());
        tracing::debug!(handle = %handle.id(), "submitting goal task");

        shared.mark_scheduled();
        let job = move || execute(shared, task);
        match &self.pool {
            Pool::Global => rayon::spawn(job),
            Pool::Owned(pool) => pool.spawn(job),
        }
        handle
    }

    /// Fault records of every handle this executor produced
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn threads(&self) -> usize {
        match &self.pool {
            Pool::Global => rayon::current_num_threads(),
            Pool::Owned(pool) => pool.current_num_threads(),
        }
    }
}
