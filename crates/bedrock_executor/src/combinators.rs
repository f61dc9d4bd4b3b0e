//! Future aggregation: `when_all` / `when_any` over slices and over
//! heterogeneous tuples, plus the blocking convenience wrappers.
//!
//! Every combinator follows the same pattern: a cheap snapshot check, then
//! locking every input state in input order, re-checking each one under its
//! lock, attaching continuations only to states that are still unset, and
//! unlocking before the aggregate future is returned.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::executor::default_executor;
use crate::state::{Future, SharedState, TaskError};

/// Returns a future that completes once every input future is set.
/// An empty slice yields an already-set future.
pub fn when_all<T: Send + 'static>(futures: &[Future<T>]) -> Future<()> {
    let core = match futures.first() {
        Some(first) => first.state().executor().clone(),
        None => default_executor().core().clone(),
    };
    let aggregate = SharedState::<()>::new(core);

    if futures.iter().all(Future::is_set) {
        aggregate.complete(Ok(()));
        return Future::new(aggregate);
    }

    let mut guards: Vec<_> = futures.iter().map(|f| f.state().lock_inner()).collect();

    // Under the locks the set flags cannot flip anymore; count what is
    // still outstanding and subscribe only to those.
    let remaining = futures.iter().filter(|f| !f.is_set()).count();
    if remaining == 0 {
        drop(guards);
        aggregate.complete(Ok(()));
        return Future::new(aggregate);
    }

    let arrived = Arc::new(AtomicUsize::new(0));
    for (i, future) in futures.iter().enumerate() {
        if future.is_set() {
            continue;
        }
        let aggregate = aggregate.clone();
        let arrived = arrived.clone();
        guards[i].continuations.push(Box::new(move || {
            if arrived.fetch_add(1, Ordering::SeqCst) + 1 == remaining {
                aggregate.complete(Ok(()));
            }
        }));
    }

    drop(guards);
    Future::new(aggregate)
}

/// Returns a future carrying the index of the first input future to
/// complete. An empty slice yields a future that carries an error, since
/// there is no index to report.
pub fn when_any<T: Send + 'static>(futures: &[Future<T>]) -> Future<usize> {
    let core = match futures.first() {
        Some(first) => first.state().executor().clone(),
        None => default_executor().core().clone(),
    };
    let aggregate = SharedState::<usize>::new(core);

    if futures.is_empty() {
        aggregate.complete(Err(TaskError::new("when_any called without futures")));
        return Future::new(aggregate);
    }

    if let Some(index) = futures.iter().position(Future::is_set) {
        aggregate.complete(Ok(index));
        return Future::new(aggregate);
    }

    let mut guards: Vec<_> = futures.iter().map(|f| f.state().lock_inner()).collect();

    if let Some(index) = futures.iter().position(Future::is_set) {
        drop(guards);
        aggregate.complete(Ok(index));
        return Future::new(aggregate);
    }

    // The continuations race; the one-shot transition picks the winner and
    // the index write happens before the set flag becomes visible.
    for (index, guard) in guards.iter_mut().enumerate() {
        let aggregate = aggregate.clone();
        guard.continuations.push(Box::new(move || {
            aggregate.complete(Ok(index));
        }));
    }

    drop(guards);
    Future::new(aggregate)
}

/// Blocks until every future in the slice is set.
pub fn wait_all<T: Send + 'static>(futures: &[Future<T>]) {
    when_all(futures).get();
}

/// Blocks until any future in the slice is set and returns its index.
pub fn wait_any<T: Send + 'static>(futures: &[Future<T>]) -> usize {
    when_any(futures).get()
}

/// Waits on every future, then collects all values.
///
/// # Panics
///
/// Re-raises the first captured task error, like [`Future::get`].
pub fn wait_and_get<T: Clone + Send + 'static>(futures: &[Future<T>]) -> Vec<T> {
    for future in futures {
        future.wait();
    }
    futures.iter().map(Future::get).collect()
}

/// Waits on every future and collects the captured errors without
/// re-raising any of them.
pub fn wait_and_get_all_errors<T: Send + 'static>(futures: &[Future<T>]) -> Vec<TaskError> {
    for future in futures {
        future.wait();
    }
    futures.iter().filter_map(Future::error).collect()
}

/// `when_all`/`when_any` over tuples of differently-typed futures.
pub trait FutureSet {
    /// Returns a future that completes once every tuple element is set.
    fn when_all(&self) -> Future<()>;

    /// Returns a future carrying the position of the first element to
    /// complete.
    fn when_any(&self) -> Future<usize>;

    /// Blocks until every tuple element is set.
    fn wait_all(&self) {
        self.when_all().get();
    }

    /// Blocks until any tuple element is set and returns its position.
    fn wait_any(&self) -> usize {
        self.when_any().get()
    }
}

macro_rules! impl_future_set {
    ($(($T:ident, $future:ident, $guard:ident, $idx:tt)),+) => {
        impl<$($T: Send + 'static),+> FutureSet for ($(Future<$T>,)+) {
            fn when_all(&self) -> Future<()> {
                let ($($future,)+) = self;
                let aggregate = SharedState::<()>::new(self.0.state().executor().clone());

                if true $(&& $future.is_set())+ {
                    aggregate.complete(Ok(()));
                    return Future::new(aggregate);
                }

                let ($(mut $guard,)+) = ($($future.state().lock_inner(),)+);

                let remaining = 0usize $(+ usize::from(!$future.is_set()))+;
                if remaining == 0 {
                    $(drop($guard);)+
                    aggregate.complete(Ok(()));
                    return Future::new(aggregate);
                }

                let arrived = Arc::new(AtomicUsize::new(0));
                $(
                    if !$future.is_set() {
                        let aggregate = aggregate.clone();
                        let arrived = arrived.clone();
                        $guard.continuations.push(Box::new(move || {
                            if arrived.fetch_add(1, Ordering::SeqCst) + 1 == remaining {
                                aggregate.complete(Ok(()));
                            }
                        }));
                    }
                )+

                $(drop($guard);)+
                Future::new(aggregate)
            }

            fn when_any(&self) -> Future<usize> {
                let ($($future,)+) = self;
                let aggregate = SharedState::<usize>::new(self.0.state().executor().clone());

                $(
                    if $future.is_set() {
                        aggregate.complete(Ok($idx));
                        return Future::new(aggregate);
                    }
                )+

                let ($(mut $guard,)+) = ($($future.state().lock_inner(),)+);

                let mut winner = None;
                $(
                    if winner.is_none() && $future.is_set() {
                        winner = Some($idx);
                    }
                )+
                if let Some(index) = winner {
                    $(drop($guard);)+
                    aggregate.complete(Ok(index));
                    return Future::new(aggregate);
                }

                $(
                    {
                        let aggregate = aggregate.clone();
                        $guard.continuations.push(Box::new(move || {
                            aggregate.complete(Ok($idx));
                        }));
                    }
                )+

                $(drop($guard);)+
                Future::new(aggregate)
            }
        }
    };
}

impl_future_set!((A, fa, ga, 0));
impl_future_set!((A, fa, ga, 0), (B, fb, gb, 1));
impl_future_set!((A, fa, ga, 0), (B, fb, gb, 1), (C, fc, gc, 2));
impl_future_set!((A, fa, ga, 0), (B, fb, gb, 1), (C, fc, gc, 2), (D, fd, gd, 3));
