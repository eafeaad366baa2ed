//! Verdant task scheduler.
//!
//! A small dependency-graph scheduler: work is submitted as closures to a
//! shared [`TaskQueue`], optionally waiting on other tasks, and executed by a
//! fixed [`WorkerPool`] of OS threads.
//!
//! ```ignore
//! let queue = Arc::new(TaskQueue::new());
//! let pool = WorkerPool::new(queue.clone(), 4)?;
//!
//! let tiles: Vec<TaskHandle> = (0..16).map(|i| queue.enqueue(move || render(i))).collect();
//! queue.enqueue_after(|| save_image(), &tiles);
//!
//! // Drains every task, then joins the workers
//! pool.shutdown();
//! ```

mod queue;
mod worker;

pub use queue::{RunnableTask, TaskHandle, TaskQueue};
pub use worker::WorkerPool;
