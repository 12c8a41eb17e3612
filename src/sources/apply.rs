//! # Applier loop: fold a producer sequence into a cell.
//!
//! ```text
//! loop {
//!   ├─► ctx cancelled         → Err(Canceled)   (stream dropped, producer torn down)
//!   ├─► stream.next() = None  → Ok(())          (natural completion)
//!   ├─► Some(Err(e))          → Err(e)          (producer failure)
//!   └─► Some(Ok(v))           → cell.try_merge(reducer(current, v))
//!                                 └─ Err(e) → Err(e), value unchanged
//! }
//! ```
//!
//! Cancellation is checked before every poll of the stream (`biased`), so a
//! cancelled run never merges another emission.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::cell::{CellValue, StateCell};
use crate::error::SourceError;

/// Drives `stream` to completion, merging each emission into `cell` via `reducer`.
pub(crate) async fn apply<T, R, S, F>(
    cell: &StateCell<T>,
    stream: S,
    reducer: &F,
    ctx: &CancellationToken,
) -> Result<(), SourceError>
where
    T: CellValue,
    S: Stream<Item = Result<R, SourceError>>,
    F: Fn(&T, R) -> Result<T, SourceError>,
{
    let mut stream = std::pin::pin!(stream);
    loop {
        let item = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(SourceError::Canceled),
            item = stream.next() => item,
        };
        match item {
            None => return Ok(()),
            Some(Ok(value)) => {
                cell.try_merge(|current| reducer(current, value))?;
            }
            Some(Err(e)) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn add(current: &u32, v: u32) -> Result<u32, SourceError> {
        Ok(current + v)
    }

    #[tokio::test]
    async fn test_folds_every_emission() {
        let cell = StateCell::new(0u32);
        let items = stream::iter([1u32, 2, 3]).map(Ok);
        let res = apply(&cell, items, &add, &CancellationToken::new()).await;
        assert_eq!(res, Ok(()));
        assert_eq!(cell.get(), 6);
    }

    #[tokio::test]
    async fn test_reducer_error_stops_run_and_keeps_value() {
        let cell = StateCell::new(0u32);
        let items = stream::iter([1u32, 99, 3]).map(Ok);
        let picky = |current: &u32, v: u32| {
            if v > 10 {
                Err(SourceError::reduce("too big"))
            } else {
                Ok(current + v)
            }
        };
        let res = apply(&cell, items, &picky, &CancellationToken::new()).await;
        assert_eq!(res, Err(SourceError::reduce("too big")));
        assert_eq!(cell.get(), 1);
    }

    #[tokio::test]
    async fn test_producer_error_ends_run() {
        let cell = StateCell::new(0u32);
        let items = stream::iter([Ok(4u32), Err(SourceError::fail("eof")), Ok(1)]);
        let res = apply(&cell, items, &add, &CancellationToken::new()).await;
        assert_eq!(res, Err(SourceError::fail("eof")));
        assert_eq!(cell.get(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_item() {
        let cell = StateCell::new(0u32);
        let ctx = CancellationToken::new();
        ctx.cancel();
        let res = apply(&cell, stream::iter([5u32]).map(Ok), &add, &ctx).await;
        assert_eq!(res, Err(SourceError::Canceled));
        assert_eq!(cell.get(), 0);
    }
}
