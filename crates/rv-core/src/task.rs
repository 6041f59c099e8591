//! Cooperative task queue
//!
//! Asynchronous work (mesh loads) is deferred onto a [`TaskQueue`] and run
//! by the host's event loop. A spawned task never runs before `spawn`
//! returns.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// Deferred unit of work
pub type Task = Box<dyn FnOnce() + Send>;

/// Single-threaded FIFO of deferred tasks
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Arc<Mutex<VecDeque<Task>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer a task until the next [`TaskQueue::run_pending`]
    pub fn spawn(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.lock().push_back(Box::new(task));
    }

    /// Run queued tasks until the queue is empty, including tasks spawned by
    /// running tasks. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        // Pop under the lock, run outside it so tasks can spawn
        while let Some(task) = self.pop() {
            task();
            count += 1;
        }
        count
    }

    fn pop(&self) -> Option<Task> {
        self.tasks.lock().pop_front()
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .finish()
    }
}
