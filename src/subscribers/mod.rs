//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and, behind the `logging` feature, a `tracing`-backed [`LogWriter`].
//!
//! ## Architecture
//! ```text
//!   Bus ──► subscriber listener ──► SubscriberSet::emit(&Event)
//!                                        ├──► [queue] ─► worker ─► LogWriter::on_event
//!                                        └──► [queue] ─► worker ─► Custom::on_event
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use statevisor::{Event, EventKind, Subscribe};
//!
//! struct Restarts;
//!
//! #[async_trait]
//! impl Subscribe for Restarts {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::SourceStarting && event.run > Some(1) {
//!             // count restarts
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "restarts" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
