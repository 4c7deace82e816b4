use crate::error::PoolError;

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::warn;

/// A handle to a job accepted by an [`ExecutionPool`](crate::ExecutionPool).
///
/// Resolving the handle awaits the job's completion and yields its value.
#[derive(Debug)]
pub struct TaskHandle<R: Send + 'static> {
  pub(crate) submission_id: u64,
  pub(crate) result_receiver: oneshot::Receiver<Result<R, PoolError>>,
}

impl<R: Send + 'static> TaskHandle<R> {
  /// Returns the pool-wide unique id of this submission.
  pub fn id(&self) -> u64 {
    self.submission_id
  }

  /// Awaits the job's completion, giving it at most `timeout` from this call.
  ///
  /// The handle is consumed either way. Time spent waiting for an execution
  /// slot counts against the timeout, matching a caller that starts the clock
  /// when it begins waiting rather than when the job starts running.
  ///
  /// # Errors
  /// Returns `PoolError::ResolveTimedOut` if the job did not deliver a result
  /// within `timeout`.
  /// Returns `PoolError::JobPanicked` if the job panicked while running.
  /// Returns `PoolError::SlotsClosed` if the pool's execution slots went away
  /// before the job could run.
  /// Returns `PoolError::ResultChannelClosed` if the delivery channel broke
  /// without an outcome.
  pub async fn resolve(self, timeout: Duration) -> Result<R, PoolError> {
    match tokio::time::timeout(timeout, self.result_receiver).await {
      Ok(Ok(outcome)) => outcome,
      Ok(Err(recv_error)) => {
        warn!(submission_id = %self.submission_id, "Result channel receive error: {}", recv_error);
        Err(PoolError::ResultChannelClosed)
      }
      Err(_elapsed) => {
        warn!(submission_id = %self.submission_id, ?timeout, "Job did not resolve in time.");
        Err(PoolError::ResolveTimedOut(timeout))
      }
    }
  }
}
