//! # Subscription: a scoped observer of a [`StateCell`](super::StateCell).
//!
//! The observer count is tied to the subscription's lifetime: acquired in
//! [`Subscription::new`], released in `Drop`. Because release lives in `Drop`
//! it happens exactly once on every exit path, including task cancellation
//! and unwinding.

use std::fmt;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;

use super::CellValue;

/// Live view over a cell's value.
///
/// The first call to [`next`](Self::next) yields the value current at
/// subscription time; later calls wait for the next published change.
/// Changes published between two polls are conflated into the latest.
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    observers: Arc<watch::Sender<usize>>,
}

impl<T> Subscription<T> {
    pub(super) fn new(rx: watch::Receiver<T>, observers: Arc<watch::Sender<usize>>) -> Self {
        observers.send_modify(|n| *n += 1);
        Self { rx, observers }
    }
}

impl<T: CellValue> Subscription<T> {
    /// Waits for the next value. Returns `None` once every handle to the cell is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Latest value, without waiting and without marking it seen.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Converts into a [`Stream`] that keeps this observer alive until dropped.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            let value = sub.next().await?;
            Some((value, sub))
        })
    }
}

impl<T> Clone for Subscription<T> {
    /// A clone is a separate observer: it bumps the count again.
    fn clone(&self) -> Self {
        Self::new(self.rx.clone(), Arc::clone(&self.observers))
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.observers.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("observers", &*self.observers.borrow())
            .finish_non_exhaustive()
    }
}
