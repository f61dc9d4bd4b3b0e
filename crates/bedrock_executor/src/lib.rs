//! A work-stealing task executor with composable futures.
//!
//! [`Executor`] runs a fixed pool of worker threads, each with its own
//! [`TaskQueue`]; submissions are balanced round-robin and idle workers
//! steal from their siblings. Every submission returns a [`Future`] that can
//! be waited on, queried, or chained with [`Future::then`]; the
//! [`when_all`]/[`when_any`] combinators aggregate several futures.
//!
//! A worker that waits on a future produced by its own pool drives queued
//! tasks on its own thread instead of blocking, so even a single-worker
//! executor cannot deadlock on nested `get` calls.
//!
//! ```
//! use bedrock_executor::Executor;
//!
//! let executor = Executor::new(2);
//! let future = executor.push(|| 21 * 2).unwrap();
//! let doubled = future.then(|| "done");
//! assert_eq!(future.get(), 42);
//! assert_eq!(doubled.get(), "done");
//! executor.join();
//! ```

mod combinators;
mod executor;
mod state;
mod task_queue;

pub use combinators::{
    wait_all, wait_and_get, wait_and_get_all_errors, wait_any, when_all, when_any, FutureSet,
};
pub use executor::{default_executor, Executor, ExecutorStopping, WaitPolicy};
pub use state::{Future, PackagedTask, TaskError};
pub use task_queue::{Task, TaskQueue};
