use rand::Rng;
use task_fanout::{BatchProcessor, TaskArgs, DEFAULT_TASK_TIMEOUT};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

// Sleeps for the requested number of milliseconds plus a little jitter, so
// the progress display advances at an uneven, realistic pace.
fn jittered_sleep_worker(args: TaskArgs<u64>) -> u64 {
  let base_ms = args.positional_args()[0];
  let jitter_ms = rand::rng().random_range(0..80);
  std::thread::sleep(Duration::from_millis(base_ms + jitter_ms));
  base_ms + jitter_ms
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .with_target(false)
    .init();

  info!("--- Progress And Timeout Example ---");

  info!("Running 10 jittered tasks with the console progress display:");
  let mut with_progress = BatchProcessor::<u64, u64, u64>::with_worker(4, Handle::current(), "progress_batch", jittered_sleep_worker);
  for id in 1..=10u64 {
    if let Err(e) = with_progress.add_task(id, TaskArgs::single(100)) {
      tracing::error!("Failed to register task {}: {:?}", id, e);
    }
  }
  match with_progress.run(true, DEFAULT_TASK_TIMEOUT).await {
    Ok(()) => info!(
      "Batch '{}' finished, {} results collected.",
      with_progress.name(),
      with_progress.results().len()
    ),
    Err(e) => tracing::error!("Batch failed: {:?}", e),
  }

  info!("Now a batch whose second task overruns a 200ms per-task timeout:");
  let mut with_timeout = BatchProcessor::<u64, u64, u64>::with_worker(1, Handle::current(), "timeout_batch", jittered_sleep_worker);
  for (id, base_ms) in [(1u64, 50u64), (2, 1_000), (3, 50)] {
    if let Err(e) = with_timeout.add_task(id, TaskArgs::single(base_ms)) {
      tracing::error!("Failed to register task {}: {:?}", id, e);
    }
  }
  match with_timeout.run(false, Duration::from_millis(200)).await {
    Ok(()) => info!("Unexpected: batch finished without a timeout."),
    Err(e) => info!("Batch stopped as expected: {}", e),
  }
  info!(
    "Results gathered before the failure remain readable: {:?}",
    with_timeout.results()
  );

  info!("--- Progress And Timeout Example End ---");
}
