//! Shared task graph guarded by one mutex and one condition variable.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

type TaskFn = Box<dyn FnOnce() + Send + 'static>;

/// Opaque handle identifying a task for the lifetime of its queue.
///
/// Handles stay valid after the task retires; waiting on a retired task is
/// treated as already satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// A task still waiting in the queue.
struct PendingTask {
    handle: TaskHandle,
    work: TaskFn,
    /// Unfinished prerequisites. Only ever decreases once enqueued.
    prerequisites: usize,
    successors: Vec<TaskHandle>,
}

/// A task handed to a worker by [`TaskQueue::dequeue`].
///
/// Must be given back to [`TaskQueue::retire`] after running, otherwise its
/// successors never become ready.
pub struct RunnableTask {
    handle: TaskHandle,
    work: TaskFn,
}

impl RunnableTask {
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    /// Run the task body and return its handle for retiring.
    ///
    /// A panicking body is logged and treated as finished, so the graph
    /// keeps draining.
    pub fn execute(self) -> TaskHandle {
        let handle = self.handle;
        if panic::catch_unwind(AssertUnwindSafe(self.work)).is_err() {
            log::error!("Task {:?} panicked; retiring it anyway", handle);
        }
        handle
    }
}

impl std::fmt::Debug for RunnableTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnableTask")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    pending: Vec<PendingTask>,
    /// Running tasks and the successors registered on them so far.
    running: HashMap<TaskHandle, Vec<TaskHandle>>,
    shutdown: bool,
}

impl QueueState {
    fn pending_mut(&mut self, handle: TaskHandle) -> Option<&mut PendingTask> {
        self.pending.iter_mut().find(|t| t.handle == handle)
    }
}

/// Thread-safe set of pending and running tasks with their dependencies.
#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    has_work: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task with no prerequisites. It is ready immediately.
    pub fn enqueue<F>(&self, work: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_after(work, &[])
    }

    /// Add a task that runs only after every task in `prerequisites` has
    /// retired.
    ///
    /// Prerequisites that already retired (or were never part of this
    /// queue) count as satisfied.
    pub fn enqueue_after<F>(&self, work: F, prerequisites: &[TaskHandle]) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        let handle = TaskHandle(state.next_id);
        state.next_id += 1;

        let mut unfinished = 0;
        for &prereq in prerequisites {
            if let Some(task) = state.pending_mut(prereq) {
                task.successors.push(handle);
                unfinished += 1;
            } else if let Some(successors) = state.running.get_mut(&prereq) {
                successors.push(handle);
                unfinished += 1;
            }
        }

        state.pending.push(PendingTask {
            handle,
            work: Box::new(work),
            prerequisites: unfinished,
            successors: Vec::new(),
        });

        if unfinished == 0 {
            log::trace!("+Task {:?} ready", handle);
            self.has_work.notify_one();
        } else {
            log::trace!("+Task {:?} waiting on {} tasks", handle, unfinished);
        }

        handle
    }

    /// Take the first ready task, sleeping until one becomes ready.
    ///
    /// Returns `None` once shutdown has been requested and no task is ready.
    pub fn dequeue(&self) -> Option<RunnableTask> {
        let mut state = self.state.lock();
        loop {
            if let Some(index) = state.pending.iter().position(|t| t.prerequisites == 0) {
                let task = state.pending.remove(index);
                state.running.insert(task.handle, task.successors);
                log::trace!("*Task {:?}", task.handle);
                return Some(RunnableTask {
                    handle: task.handle,
                    work: task.work,
                });
            }
            if state.shutdown {
                return None;
            }
            self.has_work.wait(&mut state);
        }
    }

    /// Mark a dequeued task finished and release its successors.
    pub fn retire(&self, handle: TaskHandle) {
        let mut state = self.state.lock();
        let Some(successors) = state.running.remove(&handle) else {
            log::warn!("Retiring task {:?} that is not running", handle);
            return;
        };

        let mut released = 0;
        for successor in successors {
            if let Some(task) = state.pending_mut(successor) {
                task.prerequisites = task.prerequisites.saturating_sub(1);
                if task.prerequisites == 0 {
                    released += 1;
                }
            }
        }

        match released {
            0 => log::trace!("-Task {:?}", handle),
            1 => {
                log::trace!("-Task {:?} released 1 task", handle);
                self.has_work.notify_one();
            }
            n => {
                log::trace!("-Task {:?} released {} tasks", handle, n);
                self.has_work.notify_all();
            }
        }
    }

    /// Ask workers to exit once no ready work remains.
    ///
    /// Tasks that are still pending keep running as their prerequisites
    /// finish; shutdown only stops workers from waiting for new work.
    pub fn request_shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.has_work.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Number of tasks not yet dequeued (ready or blocked).
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Number of pending tasks whose prerequisites have all retired.
    pub fn ready_count(&self) -> usize {
        self.state
            .lock()
            .pending
            .iter()
            .filter(|t| t.prerequisites == 0)
            .count()
    }

    pub fn running_count(&self) -> usize {
        self.state.lock().running.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Run every ready task on the calling thread.
    fn drain(queue: &TaskQueue) {
        queue.request_shutdown();
        while let Some(task) = queue.dequeue() {
            let handle = task.execute();
            queue.retire(handle);
        }
    }

    #[test]
    fn test_enqueue_is_ready() {
        let queue = TaskQueue::new();
        queue.enqueue(|| {});
        queue.enqueue(|| {});

        assert_eq!(queue.pending_count(), 2);
        assert_eq!(queue.ready_count(), 2);
    }

    #[test]
    fn test_blocked_until_prerequisite_retires() {
        let queue = TaskQueue::new();
        let first = queue.enqueue(|| {});
        let second = queue.enqueue_after(|| {}, &[first]);

        assert_eq!(queue.ready_count(), 1);

        let task = queue.dequeue().unwrap();
        assert_eq!(task.handle(), first);
        assert_eq!(queue.running_count(), 1);
        // Still blocked while the prerequisite runs
        assert_eq!(queue.ready_count(), 0);

        queue.retire(task.execute());
        assert_eq!(queue.running_count(), 0);
        assert_eq!(queue.ready_count(), 1);

        let task = queue.dequeue().unwrap();
        assert_eq!(task.handle(), second);
        queue.retire(task.execute());
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_successor_registered_while_running() {
        let queue = TaskQueue::new();
        let first = queue.enqueue(|| {});
        let running = queue.dequeue().unwrap();

        let second = queue.enqueue_after(|| {}, &[first]);
        assert_eq!(queue.ready_count(), 0);

        queue.retire(running.execute());
        assert_eq!(queue.dequeue().unwrap().handle(), second);
    }

    #[test]
    fn test_retired_prerequisites_count_as_satisfied() {
        let queue = TaskQueue::new();
        let first = queue.enqueue(|| {});
        let task = queue.dequeue().unwrap();
        queue.retire(task.execute());

        queue.enqueue_after(|| {}, &[first, first]);
        assert_eq!(queue.ready_count(), 1);
    }

    #[test]
    fn test_dependency_chain_order() {
        let queue = TaskQueue::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let o = order.clone();
        let c = queue.enqueue_after(move || o.lock().push('c'), &[]);
        let o = order.clone();
        let b = queue.enqueue_after(move || o.lock().push('b'), &[]);
        let o = order.clone();
        queue.enqueue_after(move || o.lock().push('a'), &[b, c]);

        drain(&queue);
        let order = order.lock();
        assert_eq!(order.len(), 3);
        assert_eq!(order[2], 'a');
    }

    #[test]
    fn test_dequeue_after_shutdown_returns_none() {
        let queue = TaskQueue::new();
        queue.request_shutdown();
        assert!(queue.is_shutdown());
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_panicking_task_still_releases_successors() {
        let queue = TaskQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let bad = queue.enqueue(|| panic!("tile failed"));
        let r = ran.clone();
        queue.enqueue_after(move || { r.fetch_add(1, Ordering::SeqCst); }, &[bad]);

        drain(&queue);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retire_unknown_handle_is_ignored() {
        let queue = TaskQueue::new();
        let handle = queue.enqueue(|| {});
        queue.retire(handle);
        assert_eq!(queue.ready_count(), 1);
    }
}
