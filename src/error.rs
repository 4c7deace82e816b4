use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the execution pool for a single submitted job.
#[derive(Error, Debug, PartialEq)]
pub enum PoolError {
  #[error("Pool is closed, cannot accept new submissions")]
  Closed,

  #[error("Pool's execution slots were closed unexpectedly")]
  SlotsClosed,

  #[error("Job did not resolve within {0:?}")]
  ResolveTimedOut(Duration),

  #[error("Job panicked: {0}")]
  JobPanicked(String),

  #[error("Job result channel closed before a result was delivered")]
  ResultChannelClosed,
}

/// Errors surfaced by [`BatchProcessor`](crate::BatchProcessor) operations.
///
/// Registration problems (`MissingArguments`, `DuplicateIdentifier`) are
/// reported eagerly by `add_task`; the remaining variants come out of `run`.
/// `TaskFailed` carries the failing task's identifier rendered with its
/// `Debug` form, plus the underlying [`PoolError`] as its source.
#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
  #[error("No worker set, call set_worker() before run()")]
  WorkerNotSet,

  #[error("Task '{id}' was registered with neither positional nor named arguments")]
  MissingArguments { id: String },

  #[error("Task '{id}' is already registered")]
  DuplicateIdentifier { id: String },

  #[error("No tasks registered, call add_task() before run()")]
  NoTasksRegistered,

  #[error("Processor already ran, its pool is closed")]
  PoolClosed,

  #[error("Task '{id}' failed: {source}")]
  TaskFailed {
    id: String,
    #[source]
    source: PoolError,
  },
}
