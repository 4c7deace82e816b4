use crate::error::PoolError;
use crate::handle::TaskHandle;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::available_parallelism;

use dashmap::DashSet;
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

lazy_static::lazy_static! {
  static ref NEXT_SUBMISSION_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// A pool of execution slots for blocking jobs.
///
/// Every submitted job is accepted immediately and parked until one of the
/// pool's slots frees up, so at most `slots` jobs run at any instant while
/// any number can be waiting. Jobs run on the blocking thread pool of the
/// supplied Tokio runtime; a panicking job is contained and reported through
/// its [`TaskHandle`] instead of taking a runtime thread down.
///
/// `close` ends acceptance of new jobs. Jobs already accepted keep running
/// to completion and their handles stay resolvable. Dropping the pool closes
/// it the same way.
pub struct ExecutionPool {
  pool_name: Arc<String>,
  slots: usize,
  semaphore: Arc<Semaphore>,
  in_flight: Arc<DashSet<u64>>,
  closed_token: CancellationToken,
  tokio_handle: TokioHandle,
}

impl ExecutionPool {
  /// Creates a pool with `slots` execution slots, spawning its supervision
  /// futures onto `tokio_handle`.
  ///
  /// The slot count is clamped to the hardware parallelism reported by the
  /// host, with a floor of one, so a caller asking for zero or for thousands
  /// of slots gets something the machine can actually serve.
  pub fn new(slots: usize, tokio_handle: TokioHandle, pool_name: &str) -> Self {
    let hardware_limit = available_parallelism().map(|n| n.get()).unwrap_or(1);
    let clamped_slots = slots.max(1).min(hardware_limit);
    if clamped_slots != slots {
      debug!(
        pool_name,
        requested = slots,
        granted = clamped_slots,
        "Slot count clamped to hardware parallelism."
      );
    }

    info!(pool_name, slots = clamped_slots, "Execution pool created.");

    Self {
      pool_name: Arc::new(pool_name.to_string()),
      slots: clamped_slots,
      semaphore: Arc::new(Semaphore::new(clamped_slots)),
      in_flight: Arc::new(DashSet::new()),
      closed_token: CancellationToken::new(),
      tokio_handle,
    }
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  /// The number of execution slots granted after clamping.
  pub fn slots(&self) -> usize {
    self.slots
  }

  /// The number of accepted jobs that have not yet delivered an outcome,
  /// running and slot-waiting alike.
  pub fn active_count(&self) -> usize {
    self.in_flight.len()
  }

  pub fn is_closed(&self) -> bool {
    self.closed_token.is_cancelled()
  }

  /// Submits one blocking job.
  ///
  /// Acceptance is unconditional on load: the job may wait for a slot but
  /// `submit` itself never blocks. The returned handle is the only way to
  /// observe the job's outcome.
  ///
  /// # Errors
  /// Returns `PoolError::Closed` if the pool has been closed.
  pub fn submit<R, F>(&self, job: F) -> Result<TaskHandle<R>, PoolError>
  where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
  {
    if self.closed_token.is_cancelled() {
      warn!(pool_name = %self.pool_name, "Submit: pool is closed, rejecting job.");
      return Err(PoolError::Closed);
    }

    let submission_id = NEXT_SUBMISSION_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let (result_tx, result_rx) = oneshot::channel::<Result<R, PoolError>>();

    self.in_flight.insert(submission_id);
    debug!(pool_name = %self.pool_name, %submission_id, "Job accepted, waiting for an execution slot.");

    let semaphore = self.semaphore.clone();
    let in_flight = self.in_flight.clone();
    let pool_name = self.pool_name.clone();
    let supervision_span = info_span!("pooled_job", pool_name = %self.pool_name, %submission_id);

    self.tokio_handle.spawn(
      async move {
        let outcome: Result<R, PoolError> = match semaphore.acquire_owned().await {
          Ok(permit) => {
            let _slot_guard = permit;
            trace!(pool_name = %*pool_name, %submission_id, "Execution slot acquired, running job.");

            match tokio::task::spawn_blocking(move || std::panic::catch_unwind(AssertUnwindSafe(job))).await {
              Ok(Ok(value)) => {
                trace!(pool_name = %*pool_name, %submission_id, "Job completed.");
                Ok(value)
              }
              Ok(Err(panic_payload)) => {
                error!(pool_name = %*pool_name, %submission_id, "Job panicked during execution.");
                Err(PoolError::JobPanicked(panic_message(&*panic_payload)))
              }
              Err(join_error) => {
                error!(pool_name = %*pool_name, %submission_id, "Blocking job failed to join: {:?}", join_error);
                if join_error.is_panic() {
                  Err(PoolError::JobPanicked(panic_message(&*join_error.into_panic())))
                } else {
                  Err(PoolError::SlotsClosed)
                }
              }
            }
          }
          Err(_acquire_error) => {
            error!(pool_name = %*pool_name, %submission_id, "Execution slots closed while job was waiting.");
            Err(PoolError::SlotsClosed)
          }
        };

        if result_tx.send(outcome).is_err() {
          warn!(
            pool_name = %*pool_name,
            %submission_id,
            "Result receiver for job was dropped. Job outcome may have been lost."
          );
        }
        in_flight.remove(&submission_id);
        debug!(pool_name = %*pool_name, %submission_id, "Job finished processing, removed from in-flight set.");
      }
      .instrument(supervision_span),
    );

    Ok(TaskHandle {
      submission_id,
      result_receiver: result_rx,
    })
  }

  /// Closes the pool to new submissions. Idempotent.
  ///
  /// Jobs already accepted are unaffected: waiting jobs still get slots and
  /// running jobs run to completion.
  pub fn close(&self) {
    if self.closed_token.is_cancelled() {
      trace!(pool_name = %self.pool_name, "Close: pool already closed.");
      return;
    }
    info!(
      pool_name = %self.pool_name,
      in_flight = self.in_flight.len(),
      "Closing pool to new submissions; accepted jobs continue."
    );
    self.closed_token.cancel();
  }
}

impl Drop for ExecutionPool {
  fn drop(&mut self) {
    if !self.closed_token.is_cancelled() {
      debug!(
        pool_name = %*self.pool_name,
        "ExecutionPool instance dropped. Closing pool to new submissions."
      );
      self.closed_token.cancel();
    }
  }
}

/// Renders a panic payload into the human-readable message carried by
/// [`PoolError::JobPanicked`]. `panic!` with a string literal or a formatted
/// message covers nearly every payload in practice.
fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&'static str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "opaque panic payload".to_string()
  }
}
