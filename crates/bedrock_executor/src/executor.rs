//! The fixed-size worker pool: dispatch, work stealing, the wait gate and
//! cooperative shutdown.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex, RwLock};
use thiserror::Error;

use crate::state::{Future, PackagedTask};
use crate::task_queue::{Task, TaskQueue};

/// How long external waiters sleep between queue polls.
const WAIT_POLL: Duration = Duration::from_millis(100);

/// Raised by [`Executor::push`] when the pool is stopped or an outer wait
/// rejects new submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the executor is shutting down and rejects new tasks")]
pub struct ExecutorStopping;

/// What an outer [`Executor::wait_with`] does with concurrent submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Submissions keep flowing while the wait drains the queues.
    AllowIncoming,
    /// Submitters block until the wait finishes.
    #[default]
    BlockIncoming,
    /// Submissions fail with [`ExecutorStopping`] until the wait finishes.
    RejectIncoming,
}

const GATE_RUNNING: u8 = 0;
const GATE_ALLOW: u8 = 1;
const GATE_BLOCK: u8 = 2;
const GATE_REJECT: u8 = 3;

impl WaitPolicy {
    fn gate_value(self) -> u8 {
        match self {
            WaitPolicy::AllowIncoming => GATE_ALLOW,
            WaitPolicy::BlockIncoming => GATE_BLOCK,
            WaitPolicy::RejectIncoming => GATE_REJECT,
        }
    }
}

struct WorkerSlot {
    queue: TaskQueue,
    busy: AtomicBool,
}

impl WorkerSlot {
    fn new() -> Self {
        Self {
            queue: TaskQueue::new(),
            busy: AtomicBool::new(false),
        }
    }
}

/// The state shared between the [`Executor`] handle, its workers and every
/// [`crate::Future`] minted from it.
pub(crate) struct ExecutorCore {
    slots: Vec<WorkerSlot>,
    thread_ids: RwLock<HashMap<ThreadId, usize>>,
    round_robin: AtomicUsize,
    stopped: AtomicBool,
    gate: AtomicU8,
    gate_mutex: Mutex<()>,
    gate_cvar: Condvar,
    wait_mutex: Mutex<()>,
    name: String,
}

impl ExecutorCore {
    pub(crate) fn stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub(crate) fn is_in_executor(&self) -> bool {
        self.thread_ids
            .read()
            .contains_key(&thread::current().id())
    }

    fn worker_index(&self) -> Option<usize> {
        self.thread_ids.read().get(&thread::current().id()).copied()
    }

    /// Submits a task, honoring the stop flag and the wait gate, then
    /// balances it over the worker queues starting at a round-robin index.
    pub(crate) fn submit(&self, task: Task) -> Result<(), ExecutorStopping> {
        if self.stopped() {
            return Err(ExecutorStopping);
        }
        match self.gate.load(Ordering::Acquire) {
            GATE_REJECT => return Err(ExecutorStopping),
            GATE_BLOCK => {
                let mut guard = self.gate_mutex.lock();
                while self.gate.load(Ordering::Acquire) == GATE_BLOCK && !self.stopped() {
                    self.gate_cvar.wait(&mut guard);
                }
                if self.stopped() {
                    return Err(ExecutorStopping);
                }
            }
            _ => {}
        }

        let n = self.slots.len();
        let start = self.round_robin.fetch_add(1, Ordering::Relaxed);
        let mut task = task;
        for k in 0..n {
            match self.slots[(start + k) % n].queue.try_push(task) {
                Ok(()) => return Ok(()),
                Err(handed_back) => task = handed_back,
            }
        }
        self.slots[start % n].queue.push(task);
        Ok(())
    }

    /// Steal scan: `try_pop` over the queues starting at `me`, for a spin
    /// budget proportional to the pool size.
    fn steal(&self, me: usize) -> Option<Task> {
        let n = self.slots.len();
        for k in 0..n * 4 {
            if let Some(task) = self.slots[(k + me) % n]
                .queue
                .try_pop_claim(&self.slots[me].busy)
            {
                return Some(task);
            }
        }
        None
    }

    /// Pops and runs one task from the calling worker's perspective.
    /// Returns whether any work was done. The caller's busy flag is left
    /// untouched; a reentrant waiter is still busy with its outer task.
    pub(crate) fn try_run_one(&self) -> bool {
        let me = self.worker_index().unwrap_or(0);
        let n = self.slots.len();
        for k in 0..n * 4 {
            if let Some(task) = self.slots[(k + me) % n].queue.try_pop() {
                run_task_guarded(task);
                return true;
            }
        }
        false
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            tracing::debug!(name = %self.name, "stopping executor");
        }
        for slot in &self.slots {
            slot.queue.done();
        }
        // Submitters blocked on the gate must observe the stop.
        self.gate_cvar.notify_all();
    }

    fn set_gate(&self, value: u8) {
        self.gate.store(value, Ordering::Release);
    }
}

/// Runs a task, catching panics at the worker boundary. Packaged tasks
/// capture their own panics; this guard covers raw tasks.
fn run_task_guarded(task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        tracing::warn!("a raw task panicked on an executor thread");
    }
}

fn worker_main(core: Arc<ExecutorCore>, index: usize) {
    while !core.stopped() {
        let task = match core.steal(index) {
            Some(task) => Some(task),
            None => core.slots[index].queue.pop_claim(&core.slots[index].busy),
        };
        let Some(task) = task else {
            // The queue is done; shutdown is in progress.
            break;
        };
        if core.stopped() {
            core.slots[index].busy.store(false, Ordering::Release);
            break;
        }
        run_task_guarded(task);
        core.slots[index].busy.store(false, Ordering::Release);
    }
    tracing::trace!(index, "worker exiting");
}

/// A fixed pool of worker threads with one task queue each.
///
/// Submissions are spread round-robin; idle workers steal from sibling
/// queues before blocking on their own. Dropping the executor joins it.
pub struct Executor {
    core: Arc<ExecutorCore>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Executor {
    /// A pool sized to the machine's logical CPU count.
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl Executor {
    /// Creates a pool with `n_threads` workers (at least one).
    pub fn new(n_threads: usize) -> Self {
        Self::with_name("", n_threads)
    }

    /// Creates a named pool; the name shows up in worker thread names and
    /// diagnostics.
    ///
    /// A two-phase barrier holds every worker back until all worker thread
    /// ids are registered, so a task can never observe itself as external
    /// to the pool.
    ///
    /// # Panics
    ///
    /// Panics when the operating system refuses to spawn a worker thread.
    pub fn with_name(name: impl Into<String>, n_threads: usize) -> Self {
        let name = name.into();
        let n_threads = n_threads.max(1);

        let core = Arc::new(ExecutorCore {
            slots: (0..n_threads).map(|_| WorkerSlot::new()).collect(),
            thread_ids: RwLock::new(HashMap::with_capacity(n_threads)),
            round_robin: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            gate: AtomicU8::new(GATE_RUNNING),
            gate_mutex: Mutex::new(()),
            gate_cvar: Condvar::new(),
            wait_mutex: Mutex::new(()),
            name: name.clone(),
        });

        let registered = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));

        let handles = (0..n_threads)
            .map(|index| {
                let core = core.clone();
                let registered = registered.clone();
                let released = released.clone();
                let thread_name = if name.is_empty() {
                    format!("worker {index}")
                } else {
                    format!("{name} {index}")
                };
                thread::Builder::new()
                    .name(thread_name)
                    .spawn(move || {
                        // Register the thread id early, then hold at the
                        // barrier until every sibling has done the same.
                        core.thread_ids
                            .write()
                            .insert(thread::current().id(), index);
                        registered.fetch_add(1, Ordering::SeqCst);
                        while registered.load(Ordering::SeqCst) != n_threads {
                            thread::sleep(Duration::from_micros(1));
                        }
                        released.fetch_add(1, Ordering::SeqCst);
                        worker_main(core, index);
                    })
                    .expect("failed to spawn an executor worker thread")
            })
            .collect();

        while released.load(Ordering::SeqCst) != n_threads {
            thread::sleep(Duration::from_micros(1));
        }

        tracing::debug!(name = %name, n_threads, "executor started");
        Executor {
            core,
            handles: Mutex::new(handles),
        }
    }

    pub(crate) fn core(&self) -> &Arc<ExecutorCore> {
        &self.core
    }

    /// Submits a callable and returns the future observing its outcome.
    pub fn push<F, R>(&self, task: F) -> Result<Future<R>, ExecutorStopping>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.push_packaged(PackagedTask::with_core(self.core.clone(), task))
    }

    /// Submits a pre-built packaged task.
    pub fn push_packaged<F, R>(
        &self,
        packaged: PackagedTask<F, R>,
    ) -> Result<Future<R>, ExecutorStopping>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let future = packaged.future();
        self.core.submit(packaged.into_task())?;
        Ok(future)
    }

    /// [`Executor::wait_with`] under the default [`WaitPolicy`].
    pub fn wait(&self) {
        self.wait_with(WaitPolicy::default());
    }

    /// Drains every queue and waits for all workers to fall idle.
    ///
    /// Only one wait runs at a time; a concurrent caller blocks until the
    /// winning wait finishes and then returns. A pool thread waiting on its
    /// own pool drains the queues inline. Once the pool is stopped the wait
    /// returns promptly.
    pub fn wait_with(&self, policy: WaitPolicy) {
        let core = &self.core;
        let Some(_guard) = core.wait_mutex.try_lock() else {
            drop(core.wait_mutex.lock());
            return;
        };

        tracing::trace!(name = %core.name, ?policy, "waiting for queues to drain");
        core.set_gate(policy.gate_value());
        let reentrant_slot = core.worker_index();

        for slot in &core.slots {
            while !slot.queue.is_empty() && !core.stopped() {
                match reentrant_slot {
                    Some(me) => {
                        for other in &core.slots {
                            if let Some(task) =
                                other.queue.try_pop_claim(&core.slots[me].busy)
                            {
                                run_task_guarded(task);
                                core.slots[me].busy.store(false, Ordering::Release);
                            }
                        }
                    }
                    None => thread::sleep(WAIT_POLL),
                }
            }
        }

        if let Some(me) = reentrant_slot {
            core.slots[me].busy.store(false, Ordering::Release);
        }

        for slot in &core.slots {
            while slot.busy.load(Ordering::Acquire) && !core.stopped() {
                thread::sleep(WAIT_POLL);
            }
        }

        core.set_gate(GATE_RUNNING);
        core.gate_cvar.notify_all();
    }

    /// Stops the pool: no further tasks are dequeued, every queue waiter
    /// unblocks and pending submissions fail.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Waits for outstanding work, stops the pool and joins every worker.
    pub fn join(&self) {
        self.wait();
        self.stop();
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Returns true once [`Executor::stop`] has been called.
    pub fn stopped(&self) -> bool {
        self.core.stopped()
    }

    /// Returns true when the calling thread is one of this pool's workers.
    pub fn is_in_executor(&self) -> bool {
        self.core.is_in_executor()
    }

    /// Runs at most one queued task on the calling thread; returns whether
    /// any work was done.
    pub fn try_run_one(&self) -> bool {
        self.core.try_run_one()
    }

    /// Returns true when every worker queue is empty.
    pub fn empty(&self) -> bool {
        self.core.slots.iter().all(|slot| slot.queue.is_empty())
    }

    /// The number of worker threads.
    pub fn number_of_threads(&self) -> usize {
        self.core.slots.len()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.join();
    }
}

/// The process-wide executor used by combinators handed an empty input
/// set. Created on first use with one worker per logical CPU; it lives
/// until the process exits and is never joined.
pub fn default_executor() -> &'static Executor {
    static DEFAULT_EXECUTOR: Lazy<Executor> =
        Lazy::new(|| Executor::with_name("default", num_cpus::get()));
    &DEFAULT_EXECUTOR
}
