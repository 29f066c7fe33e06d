//! Parallel shard dispatch.
//!
//! [`Runner`] owns a fixed pool of `workers` threads. Pending shards go into a
//! shared queue; each worker pulls one shard, runs the caller's task on it to
//! completion, reports the outcome and only then pulls the next. There is no
//! ordering across shards when more than one worker is running.
//!
//! Failure handling per task result:
//!
//! - `Ok` → the shard is reported as completed;
//! - [`TaskError::Shard`] → retried up to `max_attempts`, then reported as
//!   failed; the other workers carry on;
//! - a panic inside the task → treated like [`TaskError::Shard`];
//! - [`TaskError::Fatal`] → every worker stops taking new shards and the
//!   dispatch returns that error once in-flight shards have finished.
//!
//! A [`CancellationToken`] stops workers from taking new shards without
//! interrupting the ones in flight.

use crate::error::FlattenError;
use crate::manifest::ManifestEntry;
use anyhow::{Context, anyhow};
use crossbeam_channel::unbounded;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cooperative stop signal shared between a caller and the workers.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask workers to stop taking new shards.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a task on one shard did not succeed.
#[derive(Debug)]
pub enum TaskError {
    /// Confined to this shard; worth retrying.
    Shard(anyhow::Error),
    /// The whole run must stop.
    Fatal(FlattenError),
}

/// A shard that ended in failure after all attempts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardFailure {
    pub shard_id: String,
    pub attempts: u32,
    /// Rendered error chain of the last attempt.
    pub error: String,
}

/// Result of one shard.
#[derive(Debug)]
pub enum ShardOutcome<R> {
    Completed {
        shard_id: String,
        attempts: u32,
        elapsed_ms: u64,
        report: R,
    },
    Failed(ShardFailure),
}

/// Everything a dispatch produced.
#[derive(Debug)]
pub struct DispatchReport<R> {
    /// One entry per shard a worker picked up, in completion order.
    pub outcomes: Vec<ShardOutcome<R>>,
    /// Shards never picked up because of cancellation.
    pub not_started: Vec<String>,
    /// Whether the token was cancelled while dispatching.
    pub cancelled: bool,
}

enum WorkerMessage<R> {
    Done(ShardOutcome<R>),
    Fatal(String, FlattenError),
}

/// Fixed-size worker pool for shard tasks.
#[derive(Clone, Copy, Debug)]
pub struct Runner {
    pub workers: usize,
    pub max_attempts: u32,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            max_attempts: 2,
        }
    }
}

impl Runner {
    #[must_use]
    pub fn new(workers: usize, max_attempts: u32) -> Self {
        Self {
            workers: workers.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run `task` on every shard using the worker pool.
    ///
    /// # Errors
    /// Returns the first [`TaskError::Fatal`] raised by any task, or a
    /// precondition error if the thread pool cannot be built.
    pub fn dispatch<R, F>(
        &self,
        shards: Vec<ManifestEntry>,
        cancel: &CancellationToken,
        task: F,
    ) -> Result<DispatchReport<R>, FlattenError>
    where
        R: Send,
        F: Fn(&ManifestEntry) -> Result<R, TaskError> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("flatten-worker-{i}"))
            .build()
            .context("build worker pool")
            .map_err(FlattenError::Precondition)?;

        let (task_tx, task_rx) = unbounded::<ManifestEntry>();
        for shard in shards {
            // The receiver is alive until the end of this function.
            let _ = task_tx.send(shard);
        }
        drop(task_tx);

        let (out_tx, out_rx) = unbounded::<WorkerMessage<R>>();
        let abort = AtomicBool::new(false);

        pool.scope(|scope| {
            for _ in 0..self.workers {
                let task_rx = task_rx.clone();
                let out_tx = out_tx.clone();
                let (task, abort) = (&task, &abort);
                scope.spawn(move |_| {
                    while !cancel.is_cancelled() && !abort.load(Ordering::SeqCst) {
                        let Ok(entry) = task_rx.recv() else {
                            break;
                        };
                        let message = self.run_one(&entry, task);
                        let fatal = matches!(message, WorkerMessage::Fatal(..));
                        if fatal {
                            abort.store(true, Ordering::SeqCst);
                        }
                        let _ = out_tx.send(message);
                        if fatal {
                            break;
                        }
                    }
                });
            }
        });
        drop(out_tx);

        let mut outcomes = Vec::new();
        let mut fatal = None;
        for message in out_rx.try_iter() {
            match message {
                WorkerMessage::Done(outcome) => outcomes.push(outcome),
                WorkerMessage::Fatal(shard_id, e) => {
                    tracing::error!(shard = %shard_id, error = %e, "fatal error, stopping run");
                    fatal.get_or_insert(e);
                }
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        let not_started: Vec<String> = task_rx.try_iter().map(|e| e.shard_id).collect();
        let cancelled = cancel.is_cancelled();
        if cancelled {
            tracing::warn!(not_started = not_started.len(), "dispatch cancelled");
        }
        Ok(DispatchReport {
            outcomes,
            not_started,
            cancelled,
        })
    }

    fn run_one<R, F>(&self, entry: &ManifestEntry, task: &F) -> WorkerMessage<R>
    where
        F: Fn(&ManifestEntry) -> Result<R, TaskError>,
    {
        let shard_id = entry.shard_id.clone();
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!(shard = %shard_id, attempt, "processing shard");
            let result = catch_unwind(AssertUnwindSafe(|| task(entry))).unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                Err(TaskError::Shard(anyhow!("worker panicked: {message}")))
            });
            match result {
                Ok(report) => {
                    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    return WorkerMessage::Done(ShardOutcome::Completed {
                        shard_id,
                        attempts: attempt,
                        elapsed_ms,
                        report,
                    });
                }
                Err(TaskError::Shard(e)) if attempt < self.max_attempts => {
                    tracing::warn!(shard = %shard_id, attempt, error = %format!("{e:#}"), "shard failed, retrying");
                }
                Err(TaskError::Shard(e)) => {
                    let error = FlattenError::ShardIo {
                        shard: shard_id.clone(),
                        error: e,
                    };
                    tracing::error!(attempts = attempt, error = %error, "shard left pending");
                    return WorkerMessage::Done(ShardOutcome::Failed(ShardFailure {
                        shard_id,
                        attempts: attempt,
                        error: error.to_string(),
                    }));
                }
                Err(TaskError::Fatal(e)) => return WorkerMessage::Fatal(shard_id, e),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
