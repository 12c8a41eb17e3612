//! # Runtime configuration.
//!
//! Provides [`Config`], the settings shared by the registry, the coordinator
//! and the event bus of one merged state.
//!
//! ## Sentinel values
//! - `stop_grace = 0s` → wait indefinitely for a cancelled source to exit
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::LaunchPolicy;

/// Configuration for a merged state.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `stop_grace`: how long `stop` waits for a cancelled source before aborting it
/// - `launch`: policy used when the builder is not given one explicitly
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over checking sentinels inline.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Maximum time to wait for a cancelled source run to exit.
    ///
    /// When exceeded, the run's task is aborted and `StopTimedOut` is published.
    /// `Duration::ZERO` waits without a limit.
    pub stop_grace: Duration,

    /// Default launch policy.
    pub launch: LaunchPolicy,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the stop grace as an `Option`.
    ///
    /// - `None` → wait indefinitely
    /// - `Some(d)` → abort after `d`
    #[inline]
    pub fn stop_deadline(&self) -> Option<Duration> {
        if self.stop_grace == Duration::ZERO {
            None
        } else {
            Some(self.stop_grace)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `stop_grace = 5s`
    /// - `launch = LaunchPolicy::WhileSubscribed { stop_timeout: 0s }`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            stop_grace: Duration::from_secs(5),
            launch: LaunchPolicy::default(),
        }
    }
}
