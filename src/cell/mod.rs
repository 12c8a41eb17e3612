//! # Observable state cell.
//!
//! [`StateCell`] holds the current aggregate value and a live count of
//! observers. All mutation funnels through [`StateCell::merge`] (or its
//! fallible twin), which is linearizable: concurrent merges are serialized and
//! never interleave.
//!
//! ```text
//!   merge(f) ──► watch<T> ──► Subscription #1 ──► next().await
//!                         └─► Subscription #2 ──► next().await
//!
//!   subscribe() ─► observers += 1 ─┐
//!   drop(sub)   ─► observers -= 1 ─┴─► watch<usize> ──► Coordinator
//! ```
//!
//! ## Rules
//! - A merge whose result equals the current value is **not** published.
//! - Each [`Subscription`] increments the observer count once on creation and
//!   decrements it once on drop, including when its task is cancelled.

mod state;
mod subscription;

pub use state::StateCell;
pub use subscription::Subscription;

/// Bounds required from a value stored in a [`StateCell`].
pub trait CellValue: Clone + PartialEq + Send + Sync + 'static {}

impl<T> CellValue for T where T: Clone + PartialEq + Send + Sync + 'static {}
