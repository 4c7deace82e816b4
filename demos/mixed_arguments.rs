use task_fanout::{BatchProcessor, TaskArgs, DEFAULT_TASK_TIMEOUT};
use tokio::runtime::Handle;
use tracing::info;

// One worker serving all three argument shapes: a sum for positional
// arguments, base * mult for named ones, and a scaled sum when both
// halves are present.
fn shaped_worker(args: TaskArgs<i64>) -> i64 {
  match &args {
    TaskArgs::Positional(values) => values.iter().sum(),
    TaskArgs::Named(_) => {
      let base = args.get_named("base").copied().unwrap_or(0);
      let mult = args.get_named("mult").copied().unwrap_or(1);
      base * mult
    }
    TaskArgs::Mixed { positional, .. } => {
      let scale = args.get_named("scale").copied().unwrap_or(1);
      positional.iter().sum::<i64>() * scale
    }
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Mixed Arguments Example ---");

  let mut processor = BatchProcessor::<&str, i64, i64>::with_worker(3, Handle::current(), "shapes_example", shaped_worker);

  let registrations = [
    ("sum", TaskArgs::positional([2, 3, 4])),
    ("product", TaskArgs::named([("base", 6), ("mult", 7)])),
    ("scaled", TaskArgs::mixed([1, 2, 3], [("scale", 10)])),
  ];
  for (id, args) in registrations {
    info!("Registering task '{}' with {:?}", id, args);
    if let Err(e) = processor.add_task(id, args) {
      tracing::error!("Failed to register task '{}': {:?}", id, e);
    }
  }

  match processor.run(false, DEFAULT_TASK_TIMEOUT).await {
    Ok(()) => {
      for id in ["sum", "product", "scaled"] {
        info!("Result for '{}': {:?}", id, processor.result(&id));
      }
    }
    Err(e) => tracing::error!("Batch failed: {:?}", e),
  }

  info!("--- Mixed Arguments Example End ---");
}
