use task_fanout::{BatchProcessor, ConsoleProgress, ProgressObserver, TaskArgs, DEFAULT_TASK_TIMEOUT};
use regex::Regex;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::sleep;

// Helper to initialize tracing for tests (call once per test run, not per test function)
fn setup_tracing_for_test() {
  use std::sync::Once;
  use tracing_subscriber::{fmt, EnvFilter};
  static TRACING_INIT: Once = Once::new();

  TRACING_INIT.call_once(|| {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,task_fanout=trace"));

    fmt::Subscriber::builder()
      .with_env_filter(filter)
      .with_test_writer()
      .try_init()
      .ok();
  });
}

// An in-memory sink the reporter writes into, kept readable from the test.
#[derive(Clone, Default)]
struct SharedBuf(Arc<parking_lot::Mutex<Vec<u8>>>);

impl SharedBuf {
  fn contents(&self) -> String {
    String::from_utf8(self.0.lock().clone()).unwrap()
  }
}

impl io::Write for SharedBuf {
  fn write(&mut self, data: &[u8]) -> io::Result<usize> {
    self.0.lock().extend_from_slice(data);
    Ok(data.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

fn progress_line_pattern() -> Regex {
  Regex::new(r"^Completed (\d+)/(\d+) tasks\. (\d+) hours (\d+) minutes (\d+\.\d{2}) seconds elapsed\.$").unwrap()
}

// Asserts the exact emission contract: one chunk per item, every chunk
// carriage-return-prefixed, only the final one newline-terminated, counts
// ascending from 1 to `total`.
fn assert_progress_stream(captured: &str, total: usize) {
  assert!(captured.starts_with('\r'), "stream must begin with a carriage return");

  let chunks: Vec<&str> = captured.split('\r').skip(1).collect();
  assert_eq!(chunks.len(), total, "expected one chunk per collected task");

  let pattern = progress_line_pattern();
  for (index, chunk) in chunks.iter().enumerate() {
    if index + 1 == total {
      assert!(chunk.ends_with('\n'), "final progress line must be newline-terminated");
    } else {
      assert!(!chunk.contains('\n'), "only the final progress line may carry a newline");
    }

    let line = chunk.trim_end_matches('\n');
    let caps = pattern
      .captures(line)
      .unwrap_or_else(|| panic!("progress line {:?} does not match the expected format", line));
    assert_eq!(caps[1].parse::<usize>().unwrap(), index + 1);
    assert_eq!(caps[2].parse::<usize>().unwrap(), total);
  }
}

#[tokio::test]
async fn test_console_progress_emits_exact_line_stream() {
  setup_tracing_for_test();
  let test_name = "test_progress_line_stream";
  tracing::info!("Starting test: {}", test_name);

  let sink = SharedBuf::default();
  let reporter = ConsoleProgress::with_sink(Box::new(sink.clone()));

  for completed in 1..=10 {
    reporter.item_consumed(completed, 10);
  }

  assert_progress_stream(&sink.contents(), 10);
  tracing::info!("Finished test: {}", test_name);
}

#[tokio::test]
async fn test_console_progress_through_processor_run() {
  setup_tracing_for_test();
  let test_name = "test_progress_through_run";
  tracing::info!("Starting test: {}", test_name);

  let sink = SharedBuf::default();
  let mut processor = BatchProcessor::<u64, u64, u64>::with_worker(4, Handle::current(), test_name, |args: TaskArgs<u64>| {
    args.positional_args()[0] + 1
  });
  processor.set_progress_observer(Arc::new(ConsoleProgress::with_sink(Box::new(sink.clone()))));
  for id in 1..=10u64 {
    processor.add_task(id, TaskArgs::single(id)).unwrap();
  }

  processor.run(true, DEFAULT_TASK_TIMEOUT).await.unwrap();

  assert_progress_stream(&sink.contents(), 10);
  assert_eq!(processor.results().len(), 10);
  tracing::info!("Finished test: {}", test_name);
}

#[tokio::test]
async fn test_elapsed_clock_starts_on_first_item() {
  setup_tracing_for_test();
  let test_name = "test_progress_clock_start";
  tracing::info!("Starting test: {}", test_name);

  let sink = SharedBuf::default();
  let reporter = ConsoleProgress::with_sink(Box::new(sink.clone()));

  // Idle time before the first item must not count as elapsed time.
  sleep(Duration::from_millis(300)).await;
  reporter.item_consumed(1, 2);
  reporter.item_consumed(2, 2);

  let captured = sink.contents();
  let first_line = captured.split('\r').nth(1).unwrap().trim_end_matches('\n');
  let caps = progress_line_pattern().captures(first_line).unwrap();
  let seconds: f64 = caps[5].parse().unwrap();
  assert_eq!(caps[3].parse::<u64>().unwrap(), 0);
  assert_eq!(caps[4].parse::<u64>().unwrap(), 0);
  assert!(
    seconds < 0.25,
    "clock should start at the first item, not at construction (saw {} seconds)",
    seconds
  );
  tracing::info!("Finished test: {}", test_name);
}
