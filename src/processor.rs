use crate::error::BatchError;
use crate::handle::TaskHandle;
use crate::pool::ExecutionPool;
use crate::progress::{ConsoleProgress, ProgressObserver};
use crate::registry::TaskSet;
use crate::task::{TaskArgs, WorkerFn};

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle as TokioHandle;
use tracing::{debug, error, info, info_span, trace, Instrument};

/// The per-task resolution timeout applied when callers have no opinion.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(600);

/// Fans a batch of registered tasks out over an [`ExecutionPool`] and
/// collects their results keyed by identifier.
///
/// A processor is built for exactly one batch: register tasks against a
/// shared worker, call [`run`](Self::run) once, then read
/// [`results`](Self::results). The pool is consumed by the run, so a second
/// `run` on the same instance fails with [`BatchError::PoolClosed`]; build a
/// fresh processor to run again.
///
/// Type parameters: `I` is the caller's task identifier, `V` the argument
/// value type handed to the worker, `R` the worker's result type.
pub struct BatchProcessor<I, V, R> {
  name: Arc<String>,
  worker: Option<WorkerFn<V, R>>,
  tasks: TaskSet<I, V>,
  results: HashMap<I, R>,
  pool: ExecutionPool,
  observer: Arc<dyn ProgressObserver>,
}

impl<I, V, R> BatchProcessor<I, V, R>
where
  I: Clone + Eq + Hash + Debug,
  V: Clone + Send + 'static,
  R: Send + 'static,
{
  /// Creates a processor with no worker configured.
  ///
  /// `threads` is the requested number of concurrent execution slots; the
  /// pool clamps it to the host's hardware parallelism, floor one. The
  /// processor spawns its supervision futures onto `tokio_handle`, and
  /// `name` tags every log line it and its pool emit.
  pub fn new(threads: usize, tokio_handle: TokioHandle, name: &str) -> Self {
    BatchProcessor {
      name: Arc::new(name.to_string()),
      worker: None,
      tasks: TaskSet::new(),
      results: HashMap::new(),
      pool: ExecutionPool::new(threads, tokio_handle, name),
      observer: Arc::new(ConsoleProgress::new()),
    }
  }

  /// Creates a processor with the worker already configured.
  pub fn with_worker<F>(threads: usize, tokio_handle: TokioHandle, name: &str, worker: F) -> Self
  where
    F: Fn(TaskArgs<V>) -> R + Send + Sync + 'static,
  {
    let mut processor = Self::new(threads, tokio_handle, name);
    processor.set_worker(worker);
    processor
  }

  /// Sets or replaces the worker shared by every task in the batch.
  ///
  /// Replacement affects tasks dispatched afterwards; it does not touch
  /// anything already submitted.
  pub fn set_worker<F>(&mut self, worker: F)
  where
    F: Fn(TaskArgs<V>) -> R + Send + Sync + 'static,
  {
    self.worker = Some(Arc::new(worker));
  }

  /// Replaces the progress observer used when `run` is asked for progress.
  /// The default is [`ConsoleProgress`] writing to standard output.
  pub fn set_progress_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
    self.observer = observer;
  }

  /// Registers one task under `id` with the given arguments.
  ///
  /// # Errors
  /// Returns `BatchError::DuplicateIdentifier` if `id` is already registered;
  /// the existing entry is untouched.
  /// Returns `BatchError::MissingArguments` if the argument shape holds
  /// nothing at all; the registry is untouched.
  pub fn add_task(&mut self, id: I, args: impl Into<TaskArgs<V>>) -> Result<(), BatchError> {
    let args = args.into();
    debug!(processor_name = %self.name, task = ?id, shape = args.shape(), "Registering task.");
    self.tasks.insert(id, args)
  }

  /// Runs the batch: dispatches every registered task, then collects each
  /// result in registration order, waiting up to `timeout` per task.
  ///
  /// When `progress` is true the collection loop drives the configured
  /// progress observer, one notification per collected task.
  ///
  /// The first task that panics or times out aborts the run with
  /// `BatchError::TaskFailed`; later handles are not collected. Values
  /// gathered before the failure stay readable through [`results`](Self::results).
  ///
  /// # Errors
  /// Returns `BatchError::WorkerNotSet` if no worker is configured.
  /// Returns `BatchError::NoTasksRegistered` if the registry is empty.
  /// Returns `BatchError::PoolClosed` if this processor already ran.
  /// Returns `BatchError::TaskFailed` for the first task that fails.
  pub async fn run(&mut self, progress: bool, timeout: Duration) -> Result<(), BatchError> {
    let run_span = info_span!(
      "batch_run",
      processor_name = %self.name,
      tasks = self.tasks.len(),
      threads = self.pool.slots(),
      progress,
      ?timeout
    );

    async move {
      let worker = self.worker.clone().ok_or(BatchError::WorkerNotSet)?;
      if self.tasks.is_empty() {
        return Err(BatchError::NoTasksRegistered);
      }
      if self.pool.is_closed() {
        return Err(BatchError::PoolClosed);
      }

      info!(tasks = self.tasks.len(), "Dispatching batch.");
      let handles = self.create_submissions(&worker)?;
      self.collect(handles, progress, timeout).await
    }
    .instrument(run_span)
    .await
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The results collected so far, keyed by task identifier.
  ///
  /// Complete after a successful `run`; after a failed one it holds the
  /// values gathered before the failure.
  pub fn results(&self) -> &HashMap<I, R> {
    &self.results
  }

  /// One collected result, if that task resolved.
  pub fn result(&self, id: &I) -> Option<&R> {
    self.results.get(id)
  }

  /// The registered tasks. Registration survives a run, failed or not, so
  /// a batch can be re-inspected or re-registered elsewhere.
  pub fn tasks(&self) -> &TaskSet<I, V> {
    &self.tasks
  }

  pub fn task_count(&self) -> usize {
    self.tasks.len()
  }

  /// The number of execution slots actually granted after clamping.
  pub fn threads(&self) -> usize {
    self.pool.slots()
  }

  /// Submits every registered task in registration order, then closes the
  /// pool so the batch is sealed.
  fn create_submissions(&self, worker: &WorkerFn<V, R>) -> Result<Vec<(I, TaskHandle<R>)>, BatchError> {
    let mut handles = Vec::with_capacity(self.tasks.len());

    for (id, args) in self.tasks.iter() {
      let worker = worker.clone();
      let args = args.clone();
      debug!(task = ?id, shape = args.shape(), "Submitting task to pool.");

      match self.pool.submit(move || worker(args)) {
        Ok(handle) => handles.push((id.clone(), handle)),
        Err(source) => {
          self.pool.close();
          error!(task = ?id, "Submission failed: {}", source);
          return Err(BatchError::TaskFailed {
            id: format!("{:?}", id),
            source,
          });
        }
      }
    }

    self.pool.close();
    debug!(submissions = handles.len(), "All tasks submitted, pool sealed.");
    Ok(handles)
  }

  /// Awaits each handle in submission order, storing values and driving the
  /// progress observer. Fail-fast: the first failure ends the loop.
  async fn collect(
    &mut self,
    handles: Vec<(I, TaskHandle<R>)>,
    progress: bool,
    timeout: Duration,
  ) -> Result<(), BatchError> {
    let total = handles.len();
    let mut completed = 0usize;

    for (id, handle) in handles {
      let submission_id = handle.id();
      trace!(task = ?id, %submission_id, "Awaiting task resolution.");

      match handle.resolve(timeout).await {
        Ok(value) => {
          completed += 1;
          self.results.insert(id, value);
          if progress {
            self.observer.item_consumed(completed, total);
          }
        }
        Err(source) => {
          error!(task = ?id, %submission_id, "Task failed: {}", source);
          return Err(BatchError::TaskFailed {
            id: format!("{:?}", id),
            source,
          });
        }
      }
    }

    info!(collected = completed, "Batch collection complete.");
    Ok(())
  }
}
