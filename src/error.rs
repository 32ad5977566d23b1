//! Error types used by the search coordinator.
//!
//! [`SearchError`] covers the three failure classes of a segmented search:
//!
//! - [`SearchError::InvalidConfig`]: bad partition parameters, fatal before any worker starts;
//! - [`SearchError::SpawnFailure`]: one engine process could not be launched, its segment is lost;
//! - [`SearchError::TerminationTimeout`]: workers outlived the shutdown grace period.
//!
//! Only `InvalidConfig` is ever returned from [`Supervisor::run`](crate::Supervisor::run).
//! The other variants are constructed for logs and events; they never stop the run.
//! Unrecognized worker output is not an error at all (it is logged verbatim).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the search runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SearchError {
    /// Partition or runtime parameters are unusable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// The engine process for a segment could not be launched.
    #[error("failed to spawn engine for segment {segment}: {source}")]
    SpawnFailure {
        /// Segment whose worker failed to start.
        segment: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Some workers did not exit within the shutdown grace period.
    #[error("workers did not exit within {grace:?}; stuck segments: {stuck:?}")]
    TerminationTimeout {
        /// The configured grace duration.
        grace: Duration,
        /// Segments whose workers were still running.
        stuck: Vec<usize>,
    },
}

impl SearchError {
    /// Creates an [`SearchError::InvalidConfig`] from any displayable reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        SearchError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rangevisor::SearchError;
    ///
    /// let err = SearchError::invalid_config("segments must be at least 1");
    /// assert_eq!(err.as_label(), "search_invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SearchError::InvalidConfig { .. } => "search_invalid_config",
            SearchError::SpawnFailure { .. } => "search_spawn_failure",
            SearchError::TerminationTimeout { .. } => "search_termination_timeout",
        }
    }
}
