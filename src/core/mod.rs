//! Runtime core: source lifecycle coordination.
//!
//! The public API from this module is [`MergedState`], its builder and
//! [`Config`].
//!
//! Internal modules:
//! - [`registry`]: slot arena; starts, stops and reaps source runs;
//! - [`coordinator`]: maps observer-count edges to registry calls per policy;
//! - [`runner`]: awaits one run, catches panics, publishes its terminal event;
//! - [`slot`]: per-source status and run handle.

mod builder;
mod config;
mod coordinator;
mod merged;
mod registry;
mod runner;
mod slot;

pub use builder::{MergedStateBuilder, merged_state};
pub use config::Config;
pub use merged::MergedState;
