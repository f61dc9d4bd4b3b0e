//! The per-worker FIFO task queue with a one-way `done` latch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

/// A unit of work. Raw tasks must not panic across this boundary; tasks
/// built through [`crate::PackagedTask`] capture panics themselves.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct QueueInner {
    tasks: VecDeque<Task>,
    done: bool,
}

/// A FIFO of [`Task`]s shared between a worker and its submitters.
///
/// The `done` flag is monotonic: once set, pushes are dropped, pops drain
/// nothing and every blocked waiter wakes up. Shutdown is cooperative, so a
/// late `push` is not an error.
pub struct TaskQueue {
    inner: Mutex<QueueInner>,
    cvar: Condvar,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                tasks: VecDeque::new(),
                done: false,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Attempts to enqueue without blocking. The task is handed back when
    /// the lock is contended or the queue is done.
    pub fn try_push(&self, task: Task) -> Result<(), Task> {
        {
            let Some(mut inner) = self.inner.try_lock() else {
                return Err(task);
            };
            if inner.done {
                return Err(task);
            }
            inner.tasks.push_back(task);
        }
        self.cvar.notify_one();
        Ok(())
    }

    /// Enqueues a task, blocking on the queue lock. Once the queue is done
    /// the task is silently dropped.
    pub fn push(&self, task: Task) {
        {
            let mut inner = self.inner.lock();
            if inner.done {
                return;
            }
            inner.tasks.push_back(task);
        }
        self.cvar.notify_one();
    }

    /// Attempts to dequeue without blocking; `None` on contention, empty or
    /// done.
    pub fn try_pop(&self) -> Option<Task> {
        self.try_pop_claim_impl(None)
    }

    /// Like [`TaskQueue::try_pop`], but additionally raises `claim` while
    /// the queue lock is still held. The executor marks its workers busy
    /// this way, so a wait can never observe the gap between "popped" and
    /// "running".
    pub(crate) fn try_pop_claim(&self, claim: &AtomicBool) -> Option<Task> {
        self.try_pop_claim_impl(Some(claim))
    }

    fn try_pop_claim_impl(&self, claim: Option<&AtomicBool>) -> Option<Task> {
        let mut inner = self.inner.try_lock()?;
        if inner.done {
            return None;
        }
        let task = inner.tasks.pop_front()?;
        if let Some(claim) = claim {
            claim.store(true, Ordering::Release);
        }
        Some(task)
    }

    /// Blocks until a task is available or the queue is done; `None` means
    /// done-with-empty.
    pub fn pop(&self) -> Option<Task> {
        self.pop_claim_impl(None)
    }

    /// Blocking variant of [`TaskQueue::try_pop_claim`].
    pub(crate) fn pop_claim(&self, claim: &AtomicBool) -> Option<Task> {
        self.pop_claim_impl(Some(claim))
    }

    fn pop_claim_impl(&self, claim: Option<&AtomicBool>) -> Option<Task> {
        let mut inner = self.inner.lock();
        while inner.tasks.is_empty() && !inner.done {
            self.cvar.wait(&mut inner);
        }
        if inner.done {
            return None;
        }
        let task = inner.tasks.pop_front()?;
        if let Some(claim) = claim {
            claim.store(true, Ordering::Release);
        }
        Some(task)
    }

    /// Flips the queue into its terminal state and wakes every waiter.
    pub fn done(&self) {
        {
            let mut inner = self.inner.lock();
            inner.done = true;
        }
        self.cvar.notify_all();
    }

    /// Returns true when no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().tasks.is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::TaskQueue;

    #[test]
    fn fifo_order() {
        let queue = TaskQueue::new();
        let sink = Arc::new(AtomicUsize::new(0));
        for i in 1..=3usize {
            let sink = sink.clone();
            queue.push(Box::new(move || {
                sink.store(sink.load(Ordering::SeqCst) * 10 + i, Ordering::SeqCst);
            }));
        }
        while let Some(task) = queue.try_pop() {
            task();
        }
        assert_eq!(sink.load(Ordering::SeqCst), 123);
    }

    #[test]
    fn try_pop_on_empty() {
        let queue = TaskQueue::new();
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn done_rejects_pushes_and_drains_nothing() {
        let queue = TaskQueue::new();
        queue.push(Box::new(|| {}));
        queue.done();

        // A queued task is not handed out after done.
        assert!(queue.pop().is_none());
        assert!(queue.try_pop().is_none());

        // Late pushes are dropped, late try-pushes handed back.
        queue.push(Box::new(|| unreachable!()));
        assert!(queue.try_push(Box::new(|| unreachable!())).is_err());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn done_unblocks_waiters() {
        let queue = Arc::new(TaskQueue::new());
        let waiter = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.pop().is_none())
        };
        std::thread::sleep(Duration::from_millis(50));
        queue.done();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn pop_claim_marks_busy_before_unlock() {
        let queue = TaskQueue::new();
        let busy = AtomicBool::new(false);
        queue.push(Box::new(|| {}));
        let task = queue.try_pop_claim(&busy).unwrap();
        assert!(busy.load(Ordering::Acquire));
        task();
    }
}
