//! Fixed-size pool of worker threads draining a [`TaskQueue`].

use crate::TaskQueue;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Worker threads looping dequeue -> execute -> retire on a shared queue.
///
/// Dropping the pool requests shutdown and joins the threads, so every task
/// reachable in the graph has run once the pool is gone.
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers (at least one) on `queue`.
    ///
    /// If a thread cannot be spawned, the workers started so far are shut
    /// down and joined before the error is returned.
    pub fn new(queue: Arc<TaskQueue>, count: usize) -> io::Result<Self> {
        Self::spawn_with(queue, count, |index, queue| {
            thread::Builder::new()
                .name(format!("verdant-worker-{index}"))
                .spawn(move || worker_loop(index, &queue))
        })
    }

    fn spawn_with<S>(queue: Arc<TaskQueue>, count: usize, mut spawn: S) -> io::Result<Self>
    where
        S: FnMut(usize, Arc<TaskQueue>) -> io::Result<JoinHandle<()>>,
    {
        let count = count.max(1);
        let mut pool = Self {
            queue,
            workers: Vec::with_capacity(count),
        };
        for index in 0..count {
            match spawn(index, pool.queue.clone()) {
                Ok(handle) => pool.workers.push(handle),
                Err(err) => {
                    log::error!("Failed to spawn task worker {}: {}", index, err);
                    // Dropping the pool stops and joins the workers already running
                    return Err(err);
                }
            }
        }

        log::debug!("Started {} task workers", count);
        Ok(pool)
    }

    /// Worker count matching the machine's available parallelism.
    pub fn default_size() -> usize {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Drain the queue and join every worker.
    pub fn shutdown(mut self) {
        self.join_all();
    }

    fn join_all(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.queue.request_shutdown();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Task worker exited with a panic");
            }
        }
        log::debug!("Task workers joined");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.join_all();
    }
}

fn worker_loop(index: usize, queue: &TaskQueue) {
    log::trace!("Worker {} started", index);
    while let Some(task) = queue.dequeue() {
        let handle = task.execute();
        queue.retire(handle);
    }
    log::trace!("Worker {} exiting", index);
}
