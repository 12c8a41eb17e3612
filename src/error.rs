//! Error types used by the statevisor runtime and its sources.
//!
//! This module defines two enums:
//!
//! - [`BuildError`]: errors raised while wiring a [`MergedState`](crate::MergedState).
//! - [`SourceError`]: errors raised by a single run of an update source.
//!
//! Both provide `as_label` / `as_message` helpers for logs and events.

use thiserror::Error;

/// # Errors produced while building a merged state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `build` was called outside of a tokio runtime context.
    #[error("no tokio runtime in context; build must be called from within a runtime")]
    NoRuntime,

    /// Two sources were registered under the same name.
    #[error("duplicate source name: {name}")]
    DuplicateSource {
        /// The offending source name.
        name: String,
    },
}

impl BuildError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use statevisor::BuildError;
    ///
    /// let err = BuildError::DuplicateSource { name: "prices".into() };
    /// assert_eq!(err.as_label(), "build_duplicate_source");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::NoRuntime => "build_no_runtime",
            BuildError::DuplicateSource { .. } => "build_duplicate_source",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BuildError::NoRuntime => "no tokio runtime".to_string(),
            BuildError::DuplicateSource { name } => format!("duplicate source: {name}"),
        }
    }
}

/// # Errors produced by a single source run.
///
/// A run ends in exactly one of: natural completion (`Ok(())`), cooperative
/// cancellation ([`SourceError::Canceled`]), or a failure. Failures are local
/// to the slot; the aggregate keeps its last merged value.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The producer sequence failed.
    #[error("producer failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The reducer rejected an emitted value; the cell value is unchanged.
    #[error("reducer failed: {error}")]
    Reduce {
        /// The underlying error message.
        error: String,
    },

    /// The run observed its cancellation token and exited.
    #[error("context cancelled")]
    Canceled,
}

impl SourceError {
    /// Creates a [`SourceError::Fail`] from any displayable error.
    pub fn fail(error: impl ToString) -> Self {
        SourceError::Fail {
            error: error.to_string(),
        }
    }

    /// Creates a [`SourceError::Reduce`] from any displayable error.
    pub fn reduce(error: impl ToString) -> Self {
        SourceError::Reduce {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use statevisor::SourceError;
    ///
    /// assert_eq!(SourceError::reduce("overflow").as_label(), "source_reduce_failed");
    /// assert_eq!(SourceError::Canceled.as_label(), "source_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::Fail { .. } => "source_failed",
            SourceError::Reduce { .. } => "source_reduce_failed",
            SourceError::Canceled => "source_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SourceError::Fail { error } => format!("error: {error}"),
            SourceError::Reduce { error } => format!("reduce: {error}"),
            SourceError::Canceled => "context cancelled".to_string(),
        }
    }

    /// True for cooperative cancellation, which is a graceful exit rather than a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, SourceError::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceled_is_not_a_failure_label() {
        let err = SourceError::Canceled;
        assert!(err.is_canceled());
        assert_eq!(err.to_string(), "context cancelled");
    }

    #[test]
    fn test_constructors_keep_message() {
        assert_eq!(
            SourceError::fail("socket closed"),
            SourceError::Fail {
                error: "socket closed".into()
            }
        );
        assert_eq!(
            SourceError::reduce(42).as_message(),
            "reduce: 42".to_string()
        );
        assert!(!SourceError::fail("x").is_canceled());
    }

    #[test]
    fn test_build_error_display() {
        let err = BuildError::DuplicateSource { name: "a".into() };
        assert_eq!(err.to_string(), "duplicate source name: a");
        assert_eq!(BuildError::NoRuntime.as_label(), "build_no_runtime");
    }
}
