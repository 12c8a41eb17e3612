//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Coordinator` (observer edges, grace timer), `Registry`
//!   (source start/terminal, stop timeouts), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by `MergedStateBuilder::build`,
//!   and any receiver obtained from `MergedState::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
