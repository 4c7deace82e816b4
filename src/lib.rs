//! A Tokio-based batch dispatcher that fans registered tasks out over a
//! bounded pool of execution slots and collects their results keyed by
//! identifier, fail-fast, with per-task timeouts and progress reporting.

mod error;
mod handle;
mod pool;
mod processor;
mod progress;
mod registry;
mod task;

pub use error::{BatchError, PoolError};
pub use handle::TaskHandle;
pub use pool::ExecutionPool;
pub use processor::{BatchProcessor, DEFAULT_TASK_TIMEOUT};
pub use progress::{ConsoleProgress, ProgressObserver};
pub use registry::TaskSet;
pub use task::{TaskArgs, WorkerFn};
