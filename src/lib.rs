//! # statevisor
//!
//! **Statevisor** keeps an observable state cell up to date from a set of
//! restartable background sources, and starts or stops those sources based on
//! whether anyone is observing the cell.
//!
//! Each source is a producer factory (a fresh [`Stream`](futures::Stream) per
//! start) plus a reducer that folds every emission into the current aggregate.
//! A [`LaunchPolicy`] decides when the sources run.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Source A   │   │   Source B   │   │   Source C   │
//!     │(stream + fold│   │(stream + fold│   │(stream + fold│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  MergedState                                                      │
//! │  - StateCell (value + observer count, watch channels)             │
//! │  - Registry  (one slot per source, at most one run per slot)      │
//! │  - Coordinator (observer edges ─► start / schedule stop / stop)   │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────────────────┬─────────────────────────────┘
//!        │ merge(f) per emission        │ publish(Event)
//!        ▼                              ▼
//!  ┌───────────────┐          ┌────────────────────────┐
//!  │ Subscriptions │          │  subscriber listener   │
//!  │ (observers)   │          └───┬────────────────┬───┘
//!  └───────────────┘              ▼                ▼
//!                            worker S1   ...   worker SN
//!                                 ▼                ▼
//!                          s1.on_event()    sN.on_event()
//! ```
//!
//! ### Lifecycle under `WhileSubscribed`
//! ```text
//! observers 0→1 ──► FirstObserver ──► cancel pending stops, start Stopped slots
//! observers 1→0 ──► NoObservers   ──► StopScheduled{ stop_timeout }
//!                                       ├─ observer returns ─► StopCancelled, keep runs
//!                                       └─ timeout elapses  ─► StopElapsed, stop all
//! shutdown / last handle dropped ──► stop all, no further starts
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **State**         | Observable cell with atomic merges and an observer count.     | [`StateCell`], [`Subscription`]             |
//! | **Sources**       | Restartable producers folded into the cell.                   | [`Source`], [`SourceFn`], [`TrySourceFn`]   |
//! | **Policies**      | When sources run.                                             | [`LaunchPolicy`]                            |
//! | **Coordination**  | Build, observe and shut down a merged state.                  | [`MergedState`], [`MergedStateBuilder`]     |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, tests).         | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for wiring and source runs.                      | [`BuildError`], [`SourceError`]             |
//! | **Configuration** | Bus capacity, stop grace, default policy.                     | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a `tracing`-backed [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use futures::StreamExt;
//! use statevisor::{LaunchPolicy, MergedState, StateCell};
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Dashboard { ticks: u64 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = MergedState::builder(Dashboard::default())
//!         .with_policy(LaunchPolicy::while_subscribed(Duration::from_secs(5)))
//!         .source_fn(
//!             "ticker",
//!             |_cell: StateCell<Dashboard>| {
//!                 futures::stream::iter(0..3u64).then(|n| async move {
//!                     tokio::time::sleep(Duration::from_millis(10)).await;
//!                     n
//!                 })
//!             },
//!             |d: &Dashboard, _n: u64| Dashboard { ticks: d.ticks + 1 },
//!         )
//!         .build()?;
//!
//!     // Subscribing starts the ticker; dropping the subscription schedules its stop.
//!     let mut sub = state.subscribe();
//!     while let Some(d) = sub.next().await {
//!         if d.ticks == 3 {
//!             break;
//!         }
//!     }
//!     drop(sub);
//!
//!     state.shutdown().await;
//!     assert_eq!(state.get().ticks, 3);
//!     Ok(())
//! }
//! ```
mod cell;
mod core;
mod error;
mod events;
mod policies;
mod sources;
mod subscribers;

// ---- Public re-exports ----

pub use cell::{CellValue, StateCell, Subscription};
pub use core::{Config, MergedState, MergedStateBuilder, merged_state};
pub use error::{BuildError, SourceError};
pub use events::{Bus, Event, EventKind};
pub use policies::LaunchPolicy;
pub use sources::{BoxSourceFuture, Source, SourceFn, SourceRef, TrySourceFn};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a tracing-backed logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
