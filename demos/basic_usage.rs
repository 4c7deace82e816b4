use task_fanout::{BatchProcessor, TaskArgs, DEFAULT_TASK_TIMEOUT};
use tokio::runtime::Handle;
use tracing::info;

fn square(args: TaskArgs<i64>) -> i64 {
  let x = args.positional_args()[0];
  info!("Squaring {}", x);
  x * x
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false) // Disable module paths for cleaner example output
    .init();

  info!("--- Basic Usage Example ---");

  let mut processor = BatchProcessor::<i64, i64, i64>::with_worker(
    2, // Requested execution slots
    Handle::current(),
    "basic_example",
    square,
  );

  for i in 1..=5 {
    match processor.add_task(i, TaskArgs::single(i)) {
      Ok(()) => info!("Registered task {}", i),
      Err(e) => tracing::error!("Failed to register task {}: {:?}", i, e),
    }
  }

  info!("All tasks registered. Running batch...");
  match processor.run(false, DEFAULT_TASK_TIMEOUT).await {
    Ok(()) => {
      for (id, value) in processor.results() {
        info!("Result for task {}: {}", id, value);
      }
    }
    Err(e) => tracing::error!("Batch failed: {:?}", e),
  }

  info!("--- Basic Usage Example End ---");
}
