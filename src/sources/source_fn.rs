//! # Function-backed sources.
//!
//! [`SourceFn`] pairs a **producer factory** with a **reducer**:
//! - the factory is called on every start and returns a fresh [`Stream`];
//! - the reducer folds each emitted item into the current aggregate.
//!
//! [`TrySourceFn`] is the fallible variant: the stream yields `Result`s and the
//! reducer may reject an item. Stream errors become [`SourceError::Fail`],
//! reducer errors become [`SourceError::Reduce`]; either ends the run.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use futures::stream;
//! use statevisor::{SourceFn, SourceRef, StateCell};
//!
//! #[derive(Clone, Debug, PartialEq, Default)]
//! struct Totals { orders: u32 }
//!
//! let orders = SourceFn::new(
//!     "orders",
//!     |_cell: StateCell<Totals>| stream::iter([1u32, 2, 3]),
//!     |t: &Totals, n: u32| Totals { orders: t.orders + n },
//! );
//! let orders: SourceRef<Totals> = Arc::new(orders);
//! assert_eq!(orders.name(), "orders");
//! ```

use std::borrow::Cow;
use std::fmt::{self, Display};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::apply::apply;
use super::source::{BoxSourceFuture, Source};
use crate::cell::{CellValue, StateCell};
use crate::error::SourceError;

/// Producer factory plus infallible reducer.
pub struct SourceFn<P, F> {
    name: Cow<'static, str>,
    producer: P,
    reducer: Arc<F>,
}

impl<P, F> SourceFn<P, F> {
    /// Creates a new function-backed source.
    ///
    /// `producer` receives a handle to the cell on every start.
    pub fn new<T, R, S>(name: impl Into<Cow<'static, str>>, producer: P, reducer: F) -> Self
    where
        P: Fn(StateCell<T>) -> S,
        S: Stream<Item = R>,
        F: Fn(&T, R) -> T,
    {
        Self {
            name: name.into(),
            producer,
            reducer: Arc::new(reducer),
        }
    }
}

impl<T, R, P, S, F> Source<T> for SourceFn<P, F>
where
    T: CellValue,
    R: Send + 'static,
    P: Fn(StateCell<T>) -> S + Send + Sync + 'static,
    S: Stream<Item = R> + Send + 'static,
    F: Fn(&T, R) -> T + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, cell: StateCell<T>, ctx: CancellationToken) -> BoxSourceFuture {
        let stream = (self.producer)(cell.clone()).map(Ok::<R, SourceError>);
        let reducer = Arc::clone(&self.reducer);
        Box::pin(async move {
            let fold = |current: &T, value: R| Ok(reducer(current, value));
            apply(&cell, stream, &fold, &ctx).await
        })
    }
}

impl<P, F> fmt::Debug for SourceFn<P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFn").field("name", &self.name).finish()
    }
}

/// Producer factory plus fallible stream and reducer.
///
/// ## Example
/// ```rust
/// use futures::{StreamExt, stream};
/// use std::sync::Arc;
/// use statevisor::{SourceRef, StateCell, TrySourceFn};
///
/// let parsed = TrySourceFn::new(
///     "parsed",
///     |_cell: StateCell<i64>| stream::iter(["1", "2", "x"]).map(|s| s.parse::<i64>()),
///     |sum: &i64, n: i64| sum.checked_add(n).ok_or("overflow"),
/// );
/// let parsed: SourceRef<i64> = Arc::new(parsed);
/// assert_eq!(parsed.name(), "parsed");
/// ```
pub struct TrySourceFn<P, F> {
    name: Cow<'static, str>,
    producer: P,
    reducer: Arc<F>,
}

impl<P, F> TrySourceFn<P, F> {
    /// Creates a new fallible function-backed source.
    pub fn new<T, R, S, E1, E2>(
        name: impl Into<Cow<'static, str>>,
        producer: P,
        reducer: F,
    ) -> Self
    where
        P: Fn(StateCell<T>) -> S,
        S: Stream<Item = Result<R, E1>>,
        F: Fn(&T, R) -> Result<T, E2>,
    {
        Self {
            name: name.into(),
            producer,
            reducer: Arc::new(reducer),
        }
    }
}

impl<T, R, E1, E2, P, S, F> Source<T> for TrySourceFn<P, F>
where
    T: CellValue,
    R: Send + 'static,
    E1: Display + Send + 'static,
    E2: Display + 'static,
    P: Fn(StateCell<T>) -> S + Send + Sync + 'static,
    S: Stream<Item = Result<R, E1>> + Send + 'static,
    F: Fn(&T, R) -> Result<T, E2> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, cell: StateCell<T>, ctx: CancellationToken) -> BoxSourceFuture {
        let stream = (self.producer)(cell.clone()).map(|item| item.map_err(SourceError::fail));
        let reducer = Arc::clone(&self.reducer);
        Box::pin(async move {
            let fold = |current: &T, value: R| reducer(current, value).map_err(SourceError::reduce);
            apply(&cell, stream, &fold, &ctx).await
        })
    }
}

impl<P, F> fmt::Debug for TrySourceFn<P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrySourceFn").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[derive(Clone, Debug, PartialEq, Default)]
    struct Totals {
        orders: u32,
        refunds: u32,
    }

    #[tokio::test]
    async fn test_source_fn_merges_into_its_field() {
        let cell = StateCell::new(Totals::default());
        let src = SourceFn::new(
            "orders",
            |_cell: StateCell<Totals>| stream::iter([1u32, 2, 3]),
            |t: &Totals, n: u32| Totals {
                orders: t.orders + n,
                ..t.clone()
            },
        );
        let res = src.spawn(cell.clone(), CancellationToken::new()).await;
        assert_eq!(res, Ok(()));
        assert_eq!(
            cell.get(),
            Totals {
                orders: 6,
                refunds: 0
            }
        );
    }

    #[tokio::test]
    async fn test_each_spawn_is_a_fresh_run() {
        let cell = StateCell::new(0u32);
        let src = SourceFn::new(
            "ones",
            |_cell: StateCell<u32>| stream::iter([1u32, 1]),
            |sum: &u32, n: u32| sum + n,
        );
        src.spawn(cell.clone(), CancellationToken::new()).await.unwrap();
        src.spawn(cell.clone(), CancellationToken::new()).await.unwrap();
        assert_eq!(cell.get(), 4);
    }

    #[tokio::test]
    async fn test_producer_sees_current_state() {
        let cell = StateCell::new(10u32);
        let src = SourceFn::new(
            "double",
            |cell: StateCell<u32>| stream::iter([cell.get()]),
            |sum: &u32, seen: u32| sum + seen,
        );
        src.spawn(cell.clone(), CancellationToken::new()).await.unwrap();
        assert_eq!(cell.get(), 20);
    }

    #[tokio::test]
    async fn test_try_source_fn_maps_errors() {
        let cell = StateCell::new(0i64);
        let parse = TrySourceFn::new(
            "parse",
            |_cell: StateCell<i64>| stream::iter(["1", "2", "x"]).map(|s| s.parse::<i64>()),
            |sum: &i64, n: i64| Ok::<i64, String>(sum + n),
        );
        let res = parse.spawn(cell.clone(), CancellationToken::new()).await;
        assert!(matches!(res, Err(SourceError::Fail { .. })));
        assert_eq!(cell.get(), 3);

        let reject = TrySourceFn::new(
            "reject",
            |_cell: StateCell<i64>| stream::iter([Ok::<i64, String>(5)]),
            |_sum: &i64, _n: i64| Err::<i64, &str>("negative balance"),
        );
        let res = reject.spawn(cell.clone(), CancellationToken::new()).await;
        assert_eq!(res, Err(SourceError::reduce("negative balance")));
        assert_eq!(cell.get(), 3);
    }
}
