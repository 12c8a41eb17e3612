//! # StateCell: the shared, observable aggregate.
//!
//! Backed by two [`tokio::sync::watch`] channels: one for the value and one for
//! the observer count. The value channel's internal lock is what serializes
//! merges; the merge closure runs under it and the new value is only stored
//! once the closure has returned successfully.

use std::fmt;
use std::sync::Arc;

use futures::{Stream, StreamExt, stream};
use tokio::sync::watch;

use super::{CellValue, Subscription};

/// Observable mutable cell with a live observer count.
///
/// Cloning is cheap and yields another handle to the same cell.
///
/// # Example
/// ```
/// use statevisor::StateCell;
///
/// let cell = StateCell::new(1u32);
/// assert!(cell.merge(|v| v + 1));
/// assert_eq!(cell.get(), 2);
///
/// // Equal results are not published.
/// assert!(!cell.merge(|v| *v));
/// ```
pub struct StateCell<T> {
    value: Arc<watch::Sender<T>>,
    observers: Arc<watch::Sender<usize>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            observers: Arc::clone(&self.observers),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("value", &*self.value.borrow())
            .field("observers", &*self.observers.borrow())
            .finish()
    }
}

impl<T: CellValue> StateCell<T> {
    /// Creates a cell holding `initial` with no observers.
    pub fn new(initial: T) -> Self {
        let (value, _) = watch::channel(initial);
        let (observers, _) = watch::channel(0usize);
        Self {
            value: Arc::new(value),
            observers: Arc::new(observers),
        }
    }

    /// Returns a clone of the current value without waiting.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Runs `f` against the current value without cloning it.
    ///
    /// Merges are blocked while `f` runs; keep it short.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Atomically replaces the value with `f(&value)` and publishes it.
    ///
    /// Returns `true` if the new value differs from the old one and was published.
    /// If `f` panics the value is left unchanged and the panic propagates.
    ///
    /// `f` runs under the cell's lock. It must derive the new value from its
    /// argument only: calling `get`, `with`, `merge` or `set` on the same cell
    /// from inside `f` deadlocks.
    pub fn merge(&self, f: impl FnOnce(&T) -> T) -> bool {
        match self.try_merge(|current| Ok::<T, std::convert::Infallible>(f(current))) {
            Ok(changed) => changed,
            Err(never) => match never {},
        }
    }

    /// Fallible [`merge`](Self::merge): on `Err` the value is left unchanged.
    ///
    /// Same locking rule as `merge`: `f` must not touch this cell.
    pub fn try_merge<E>(&self, f: impl FnOnce(&T) -> Result<T, E>) -> Result<bool, E> {
        let mut outcome = Ok(false);
        self.value.send_if_modified(|current| match f(current) {
            Ok(next) if next == *current => false,
            Ok(next) => {
                *current = next;
                outcome = Ok(true);
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    /// Replaces the value. Returns `true` if it changed.
    pub fn set(&self, value: T) -> bool {
        self.merge(move |_| value)
    }

    /// Starts observing the cell. The observer count is incremented now and
    /// decremented when the returned [`Subscription`] is dropped.
    pub fn subscribe(&self) -> Subscription<T> {
        let mut rx = self.value.subscribe();
        rx.mark_changed();
        Subscription::new(rx, Arc::clone(&self.observers))
    }

    /// Stream of values: the current one first, then every published change.
    ///
    /// The observer is acquired when the stream is first polled and released
    /// when it is dropped. A stream that is never polled does not count.
    pub fn observe(&self) -> impl Stream<Item = T> + Send + 'static {
        let mut rx = self.value.subscribe();
        rx.mark_changed();
        let observers = Arc::clone(&self.observers);
        stream::once(async move { Subscription::new(rx, observers) })
            .flat_map(Subscription::into_stream)
    }

    /// Number of live [`Subscription`]s.
    pub fn observer_count(&self) -> usize {
        *self.observers.borrow()
    }

    /// Change notifications for the observer count.
    pub fn watch_observers(&self) -> watch::Receiver<usize> {
        self.observers.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[derive(Clone, Debug, PartialEq)]
    struct Pair {
        a: u32,
        b: u32,
    }

    #[test]
    fn test_merge_publishes_only_changes() {
        let cell = StateCell::new(Pair { a: 0, b: 0 });
        assert!(cell.merge(|p| Pair { a: 1, ..p.clone() }));
        assert!(!cell.merge(|p| p.clone()));
        assert!(cell.set(Pair { a: 1, b: 7 }));
        assert_eq!(cell.get(), Pair { a: 1, b: 7 });
        assert_eq!(cell.with(|p| p.a + p.b), 8);
    }

    #[test]
    fn test_try_merge_error_leaves_value() {
        let cell = StateCell::new(10i64);
        let res: Result<bool, &str> = cell.try_merge(|_| Err("rejected"));
        assert_eq!(res, Err("rejected"));
        assert_eq!(cell.get(), 10);
        assert_eq!(cell.try_merge(|v| Ok::<_, &str>(v * 2)), Ok(true));
        assert_eq!(cell.get(), 20);
    }

    #[test]
    fn test_panicking_merge_leaves_value() {
        let cell = StateCell::new(3u8);
        let res = catch_unwind(AssertUnwindSafe(|| {
            cell.merge(|_| panic!("reducer blew up"));
        }));
        assert!(res.is_err());
        assert_eq!(cell.get(), 3);
        // The cell stays usable afterwards.
        assert!(cell.merge(|v| v + 1));
        assert_eq!(cell.get(), 4);
    }

    #[test]
    fn test_observer_count_follows_subscriptions() {
        let cell = StateCell::new(0u8);
        let rx = cell.watch_observers();
        assert_eq!(cell.observer_count(), 0);

        let first = cell.subscribe();
        let second = first.clone();
        assert_eq!(cell.observer_count(), 2);
        assert_eq!(*rx.borrow(), 2);

        drop(first);
        assert_eq!(cell.observer_count(), 1);
        drop(second);
        assert_eq!(cell.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_yields_current_then_changes() {
        let cell = StateCell::new(1u32);
        let mut sub = cell.subscribe();
        assert_eq!(sub.next().await, Some(1));

        cell.set(2);
        cell.set(3);
        // Intermediate values are conflated.
        assert_eq!(sub.next().await, Some(3));
        assert_eq!(sub.get(), 3);
    }

    #[tokio::test]
    async fn test_observe_counts_from_first_poll() {
        let cell = StateCell::new(5u32);
        let idle = cell.observe();
        assert_eq!(cell.observer_count(), 0);
        drop(idle);

        let mut stream = Box::pin(cell.observe());
        cell.set(6);
        assert_eq!(cell.observer_count(), 0);
        assert_eq!(stream.next().await, Some(6));
        assert_eq!(cell.observer_count(), 1);
        drop(stream);
        assert_eq!(cell.observer_count(), 0);
    }

    #[test]
    fn test_merge_reads_only_its_argument() {
        let cell = StateCell::new(Pair { a: 2, b: 3 });
        let other = StateCell::new(10u32);
        // Reading a different cell inside the reducer is fine.
        assert!(cell.merge(|p| Pair {
            a: p.a * p.b + other.get(),
            ..p.clone()
        }));
        assert_eq!(cell.get(), Pair { a: 16, b: 3 });
        assert_eq!(other.get(), 10);
    }

    #[tokio::test]
    async fn test_stream_ends_when_cell_is_gone() {
        let cell = StateCell::new(0u8);
        let mut sub = cell.subscribe();
        assert_eq!(sub.next().await, Some(0));
        drop(cell);
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_merges_do_not_lose_updates() {
        let cell = StateCell::new(Pair { a: 0, b: 0 });
        let mut joins = Vec::new();
        for i in 0..8u32 {
            let cell = cell.clone();
            joins.push(tokio::spawn(async move {
                for _ in 0..250 {
                    if i % 2 == 0 {
                        cell.merge(|p| Pair { a: p.a + 1, ..p.clone() });
                    } else {
                        cell.merge(|p| Pair { b: p.b + 1, ..p.clone() });
                    }
                }
            }));
        }
        for j in joins {
            j.await.unwrap();
        }
        assert_eq!(cell.get(), Pair { a: 1000, b: 1000 });
    }
}
