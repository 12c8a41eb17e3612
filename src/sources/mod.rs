//! # Update sources.
//!
//! This module provides the source-related types:
//! - [`Source`] - trait for a restartable producer bound to a cell
//! - [`SourceFn`] - producer factory + infallible reducer
//! - [`TrySourceFn`] - producer factory + fallible stream and reducer
//! - [`SourceRef`] - shared reference to a source (`Arc<dyn Source<T>>`)
//!
//! Both function-backed sources run through the same applier loop
//! ([`apply`]), which folds each emission into the cell with one atomic merge.

mod apply;
mod source;
mod source_fn;

pub use source::{BoxSourceFuture, Source, SourceRef};
pub use source_fn::{SourceFn, TrySourceFn};
