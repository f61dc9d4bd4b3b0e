//! The shared result cell behind every [`Future`], plus the packaged task
//! wrapper that feeds it.

use std::any::Any;
use std::fmt::{self, Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::executor::{Executor, ExecutorCore};
use crate::task_queue::Task;

/// The initial timed-wait delay of the lost-wakeup safety net.
const WAIT_STEP: Duration = Duration::from_millis(100);

/// The cap of the timed-wait backoff.
const WAIT_MAX_DELAY: Duration = Duration::from_secs(1);

/// A panic captured at the packaged-task boundary.
///
/// The payload is flattened into a message so the error stays cloneable and
/// can resurface at every [`Future::get`] call.
#[derive(Debug, Clone)]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if let Some(error) = payload.downcast_ref::<TaskError>() {
            return error.clone();
        }
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked".to_string()
        };
        Self { message }
    }

    /// The captured panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for TaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "task failed: {}", self.message)
    }
}

impl std::error::Error for TaskError {}

pub(crate) struct StateInner<T> {
    pub(crate) result: Option<Result<T, TaskError>>,
    pub(crate) continuations: Vec<Task>,
}

/// Synchronization and value transport between a task and its observers.
///
/// The cell transitions `unset → set` exactly once. The transition happens
/// under the state lock with the result written before the `set` flag is
/// released, so any observer that sees the flag also sees the value. The
/// continuation list is flushed in registration order while the lock is
/// still held; continuations only ever push work back onto the executor.
pub(crate) struct SharedState<T> {
    executor: Arc<ExecutorCore>,
    set: AtomicBool,
    cvar: Condvar,
    inner: Mutex<StateInner<T>>,
}

impl<T: Send + 'static> SharedState<T> {
    pub(crate) fn new(executor: Arc<ExecutorCore>) -> Arc<Self> {
        Arc::new(Self {
            executor,
            set: AtomicBool::new(false),
            cvar: Condvar::new(),
            inner: Mutex::new(StateInner {
                result: None,
                continuations: Vec::new(),
            }),
        })
    }

    pub(crate) fn executor(&self) -> &Arc<ExecutorCore> {
        &self.executor
    }

    pub(crate) fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    pub(crate) fn lock_inner(&self) -> MutexGuard<'_, StateInner<T>> {
        self.inner.lock()
    }

    /// Performs the one-shot transition. Returns false for every caller
    /// after the first; losers leave the stored result untouched.
    pub(crate) fn complete(&self, result: Result<T, TaskError>) -> bool {
        let mut inner = self.inner.lock();
        if self.set.load(Ordering::Relaxed) {
            return false;
        }
        inner.result = Some(result);
        self.set.store(true, Ordering::Release);

        // Wake direct waiters, then run the continuations in registration
        // order while the state lock is held.
        self.cvar.notify_all();
        let continuations = std::mem::take(&mut inner.continuations);
        for continuation in continuations {
            continuation();
        }
        true
    }

    /// Registers a continuation; hands it back when the state is already
    /// set so the caller can dispatch it directly.
    pub(crate) fn push_continuation(&self, continuation: Task) -> Result<(), Task> {
        let mut inner = self.inner.lock();
        if self.is_set() {
            return Err(continuation);
        }
        inner.continuations.push(continuation);
        Ok(())
    }

    /// Blocks until the state is set or the executor stopped.
    ///
    /// Callers outside the pool park on the condition variable with a
    /// bounded backoff as a lost-wakeup safety net. A pool thread instead
    /// drives queued tasks on its own thread and only parks briefly when no
    /// work is available: the reentrant wait that keeps a worker awaiting
    /// another task of the same pool from deadlocking it.
    pub(crate) fn wait(&self) {
        if self.is_set() {
            return;
        }

        let reentrant = self.executor.is_in_executor();
        let mut delay = WAIT_STEP;
        while !self.is_set() && !self.executor.stopped() {
            if reentrant && self.executor.try_run_one() {
                delay = WAIT_STEP;
                continue;
            }
            let mut inner = self.inner.lock();
            if self.is_set() {
                break;
            }
            let _ = self.cvar.wait_for(&mut inner, delay);
            delay = (delay + WAIT_STEP).min(WAIT_MAX_DELAY);
        }
    }

    fn cloned_result(&self) -> Option<Result<T, TaskError>>
    where
        T: Clone,
    {
        if !self.is_set() {
            return None;
        }
        self.inner.lock().result.clone()
    }

    fn error(&self) -> Option<TaskError> {
        if !self.is_set() {
            return None;
        }
        match &self.inner.lock().result {
            Some(Err(error)) => Some(error.clone()),
            _ => None,
        }
    }
}

/// A handle to a task's eventual result. Cloning is cheap; every clone
/// observes the same outcome.
pub struct Future<T> {
    state: Arc<SharedState<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Send + 'static> Future<T> {
    pub(crate) fn new(state: Arc<SharedState<T>>) -> Self {
        Self { state }
    }

    pub(crate) fn state(&self) -> &Arc<SharedState<T>> {
        &self.state
    }

    /// Returns true when the result (value or error) is available.
    pub fn is_set(&self) -> bool {
        self.state.is_set()
    }

    /// Blocks until the result is available or the executor stopped.
    /// Never panics, even when the task failed.
    pub fn wait(&self) {
        self.state.wait();
    }

    /// Waits and returns the task's value.
    ///
    /// # Panics
    ///
    /// Re-raises the captured [`TaskError`] when the task panicked, and
    /// panics with a descriptive message when the executor stopped before
    /// the task ran.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.state.wait();
        match self.state.cloned_result() {
            Some(Ok(value)) => value,
            Some(Err(error)) => std::panic::panic_any(error),
            None => panic!("the executor stopped before the task produced a value"),
        }
    }

    /// The captured error, when the task failed. Does not block.
    pub fn error(&self) -> Option<TaskError> {
        self.state.error()
    }

    /// Schedules `continuation` on the same executor once this future
    /// completes and returns the continuation's future.
    ///
    /// The continuation never runs inline on the completing thread; it
    /// always re-enters through the executor. When the executor is already
    /// shutting down the returned future stays unset.
    pub fn then<F, R>(&self, continuation: F) -> Future<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let executor = self.state.executor.clone();
        let packaged = PackagedTask::with_core(executor.clone(), continuation);
        let future = packaged.future();
        let task = packaged.into_task();

        if self.state.is_set() {
            let _ = executor.submit(task);
            return future;
        }

        let submitter: Task = Box::new(move || {
            let _ = executor.submit(task);
        });
        if let Err(submitter) = self.state.push_continuation(submitter) {
            // Lost the race against the transition: dispatch now. This runs
            // the submission wrapper, not the continuation itself.
            submitter();
        }
        future
    }
}

/// A callable bundled with the [`SharedState`] its outcome is written to.
///
/// The invoker catches panics, stores the value or the captured error and
/// performs the one-shot transition; it cannot itself panic.
pub struct PackagedTask<F, R> {
    task: F,
    state: Arc<SharedState<R>>,
}

impl<F, R> PackagedTask<F, R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    /// Packages `task` for submission to `executor`.
    pub fn new(executor: &Executor, task: F) -> Self {
        Self::with_core(executor.core().clone(), task)
    }

    pub(crate) fn with_core(core: Arc<ExecutorCore>, task: F) -> Self {
        Self {
            task,
            state: SharedState::new(core),
        }
    }

    /// The future observing this task's outcome.
    pub fn future(&self) -> Future<R> {
        Future::new(self.state.clone())
    }

    pub(crate) fn into_task(self) -> Task {
        let Self { task, state } = self;
        Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(task)).map_err(TaskError::from_panic);
            state.complete(result);
        })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{SharedState, TaskError};
    use crate::executor::Executor;

    #[test]
    fn complete_is_one_shot() {
        let executor = Executor::new(1);
        let state = SharedState::<i32>::new(executor.core().clone());
        assert!(!state.is_set());
        assert!(state.complete(Ok(1)));
        assert!(!state.complete(Ok(2)));
        assert!(state.is_set());
        assert_eq!(state.cloned_result().unwrap().unwrap(), 1);
    }

    #[test]
    fn continuations_flush_in_registration_order() {
        let executor = Executor::new(1);
        let state = SharedState::<()>::new(executor.core().clone());
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = order.clone();
            state
                .push_continuation(Box::new(move || order.lock().push(i)))
                .ok()
                .unwrap();
        }
        state.complete(Ok(()));
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);

        // Registration after the transition hands the continuation back.
        assert!(state.push_continuation(Box::new(|| {})).is_err());
    }

    #[test]
    fn task_error_from_panic_payloads() {
        let str_payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(TaskError::from_panic(str_payload).message(), "boom");

        let string_payload: Box<dyn std::any::Any + Send> = Box::new("kaboom".to_string());
        assert_eq!(TaskError::from_panic(string_payload).message(), "kaboom");

        let opaque_payload: Box<dyn std::any::Any + Send> = Box::new(17u32);
        assert_eq!(TaskError::from_panic(opaque_payload).message(), "task panicked");

        let nested: Box<dyn std::any::Any + Send> = Box::new(TaskError::new("original"));
        assert_eq!(TaskError::from_panic(nested).message(), "original");
    }
}
