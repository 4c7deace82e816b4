use std::io::{self, Write};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

/// Receives one notification per collected task during a batch run.
///
/// Observers are called from the collection loop, once per task, in
/// collection order, after that task's value has been stored. `completed`
/// counts from `1` to `total`. A run that fails part-way emits one
/// notification per task collected before the failure and then stops.
pub trait ProgressObserver: Send + Sync {
  fn item_consumed(&self, completed: usize, total: usize);
}

/// The built-in console reporter: an in-place single-line progress display.
///
/// Every notification rewrites one terminal line, carriage-return-prefixed,
/// showing the completed count, the total, and the wall-clock time elapsed
/// since the first notification, broken into hours, minutes and fractional
/// seconds. The line for the final task is additionally terminated with a
/// newline so the shell prompt lands below the finished display.
pub struct ConsoleProgress {
  state: Mutex<ProgressState>,
}

struct ProgressState {
  sink: Box<dyn Write + Send>,
  started_at: Option<Instant>,
}

impl ConsoleProgress {
  /// Reporter writing to standard output.
  pub fn new() -> Self {
    Self::with_sink(Box::new(io::stdout()))
  }

  /// Reporter writing to an arbitrary sink. Used by tests to capture the
  /// byte stream, and useful for redirecting progress to stderr or a log.
  pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
    ConsoleProgress {
      state: Mutex::new(ProgressState {
        sink,
        started_at: None,
      }),
    }
  }
}

impl Default for ConsoleProgress {
  fn default() -> Self {
    Self::new()
  }
}

impl ProgressObserver for ConsoleProgress {
  fn item_consumed(&self, completed: usize, total: usize) {
    let mut state = self.state.lock();

    // The clock starts on the first notification, not at construction.
    let started_at = *state.started_at.get_or_insert_with(Instant::now);
    let (hours, minutes, seconds) = split_elapsed(started_at.elapsed());

    let write_result = if completed >= total {
      writeln!(
        state.sink,
        "\rCompleted {}/{} tasks. {} hours {} minutes {:.2} seconds elapsed.",
        completed, total, hours, minutes, seconds
      )
    } else {
      write!(
        state.sink,
        "\rCompleted {}/{} tasks. {} hours {} minutes {:.2} seconds elapsed.",
        completed, total, hours, minutes, seconds
      )
    };

    if let Err(error) = write_result.and_then(|_| state.sink.flush()) {
      warn!(%completed, %total, "Progress sink write failed: {}", error);
    }
  }
}

/// Breaks an elapsed duration into whole hours, whole minutes and leftover
/// fractional seconds.
fn split_elapsed(elapsed: Duration) -> (u64, u64, f64) {
  let total_seconds = elapsed.as_secs_f64();
  let hours = (total_seconds / 3600.0) as u64;
  let minutes = ((total_seconds % 3600.0) / 60.0) as u64;
  let seconds = total_seconds % 60.0;
  (hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_split_elapsed_boundaries() {
    assert_eq!(split_elapsed(Duration::ZERO), (0, 0, 0.0));

    let (h, m, s) = split_elapsed(Duration::from_secs_f64(59.25));
    assert_eq!((h, m), (0, 0));
    assert!((s - 59.25).abs() < 1e-9);

    let (h, m, s) = split_elapsed(Duration::from_secs(60));
    assert_eq!((h, m), (0, 1));
    assert!(s.abs() < 1e-9);

    // 1 hour, 1 minute, 1.5 seconds.
    let (h, m, s) = split_elapsed(Duration::from_secs_f64(3661.5));
    assert_eq!((h, m), (1, 1));
    assert!((s - 1.5).abs() < 1e-6);
  }
}
