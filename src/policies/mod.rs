//! Launch policies.
//!
//! [`LaunchPolicy`] decides **when** the sources behind a merged state run,
//! based on whether anyone is observing it.
//!
//! ## Quick wiring
//! ```text
//! MergedStateBuilder { policy: LaunchPolicy, sources: Vec<SourceRef<T>> }
//!      └─► core::coordinator::Coordinator matches on the policy:
//!           - Eager           → start all at build, never stop
//!           - Lazy            → start all on the first observer, never stop
//!           - WhileSubscribed → start on 0→1, stop after `stop_timeout` of 0 observers
//! ```
//!
//! ## Defaults
//! - `Config::default().launch` is `WhileSubscribed { stop_timeout: 0s }`.

mod launch;

pub use launch::LaunchPolicy;
