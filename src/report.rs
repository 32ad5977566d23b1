//! Final outcome of a search run.
//!
//! The objective is the smallest qualifying value across all segments; several
//! segments may each find one since they run concurrently, so the report keeps
//! every recorded value and [`SearchReport::best`] takes the minimum.

use std::fmt;

use crate::core::WorkerState;

/// Why the coordinator loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A worker reported a qualifying value.
    Success {
        /// Reporting segment.
        segment: usize,
        /// Reported value.
        value: u64,
    },
    /// An external interrupt arrived.
    Interrupted,
    /// Every worker exited without reporting success.
    Exhausted,
}

/// What shutdown did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// Workers that received a termination request.
    pub requested: Vec<usize>,
    /// Workers still running when the grace period ran out.
    pub stuck: Vec<usize>,
    /// Workers that received a forced kill.
    pub killed: Vec<usize>,
}

impl ShutdownSummary {
    /// Returns `true` if every worker was gone within the grace period.
    #[inline]
    pub fn within_grace(&self) -> bool {
        self.stuck.is_empty()
    }
}

/// Result of [`Supervisor::run`](crate::Supervisor::run).
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Why the search stopped.
    pub stop: StopReason,
    /// Recorded value per segment.
    pub results: Vec<Option<u64>>,
    /// Progress lines observed by the coordinator.
    pub progress_events: u64,
    /// Progress lines that were logged (after throttling).
    pub progress_logged: u64,
    /// Final state of every worker, ordered by segment id.
    pub workers: Vec<(usize, WorkerState)>,
    /// Shutdown outcome.
    pub shutdown: ShutdownSummary,
}

impl SearchReport {
    /// Smallest recorded value, if any.
    pub fn best(&self) -> Option<u64> {
        self.results.iter().flatten().min().copied()
    }

    /// Returns `true` if at least one value was recorded.
    pub fn found(&self) -> bool {
        self.best().is_some()
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best() {
            Some(value) => write!(f, "minimum solution found: n = {value}"),
            None => f.write_str("no result found within range"),
        }
    }
}
