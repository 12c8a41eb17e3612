//! # Launch policies for merged-state sources.
//!
//! - [`LaunchPolicy::Eager`] sources start when the state is built and run for its lifetime.
//! - [`LaunchPolicy::Lazy`] sources start on the first observer and then stay up.
//! - [`LaunchPolicy::WhileSubscribed`] sources run while observed, with a grace period.
//!
//! ## Choosing the right policy
//!
//! **Always-fresh aggregate** (cost paid up front):
//! ```text
//! LaunchPolicy::Eager
//! ```
//!
//! **Deferred, then warm** (pay on first use, keep it):
//! ```text
//! LaunchPolicy::Lazy
//! ```
//!
//! **Only while someone looks** (survive short gaps such as a screen rotation):
//! ```text
//! LaunchPolicy::WhileSubscribed {
//!     stop_timeout: Duration::from_secs(5)  → stop 5s after the last observer left
//! }
//! ```

use std::time::Duration;

/// Policy controlling when sources are started and stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchPolicy {
    /// Start every source at build time; never stop them.
    Eager,
    /// Start every source once, on the first 0→1 observer transition; never stop them.
    Lazy,
    /// Start on every 0→1 transition; stop once the count has stayed at 0 for `stop_timeout`.
    WhileSubscribed {
        /// Grace period between losing the last observer and stopping sources.
        stop_timeout: Duration,
    },
}

impl LaunchPolicy {
    /// Shorthand for [`LaunchPolicy::WhileSubscribed`].
    pub const fn while_subscribed(stop_timeout: Duration) -> Self {
        LaunchPolicy::WhileSubscribed { stop_timeout }
    }

    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchPolicy::Eager => "eager",
            LaunchPolicy::Lazy => "lazy",
            LaunchPolicy::WhileSubscribed { .. } => "while_subscribed",
        }
    }

    /// True if observer-count transitions can stop sources under this policy.
    pub fn stops_sources(&self) -> bool {
        matches!(self, LaunchPolicy::WhileSubscribed { .. })
    }
}

impl Default for LaunchPolicy {
    /// Returns `WhileSubscribed { stop_timeout: 0s }`.
    fn default() -> Self {
        LaunchPolicy::while_subscribed(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stops_immediately() {
        assert_eq!(
            LaunchPolicy::default(),
            LaunchPolicy::WhileSubscribed {
                stop_timeout: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_only_while_subscribed_stops() {
        assert!(!LaunchPolicy::Eager.stops_sources());
        assert!(!LaunchPolicy::Lazy.stops_sources());
        assert!(LaunchPolicy::while_subscribed(Duration::from_secs(5)).stops_sources());
        assert_eq!(LaunchPolicy::Lazy.as_label(), "lazy");
    }
}
