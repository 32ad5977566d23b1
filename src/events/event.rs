//! # Runtime events emitted by the supervisor, worker actors and coordinator.
//!
//! The [`EventKind`] enum classifies notices across three categories:
//! - **Worker lifecycle**: planned, spawned, spawn failed, pin failed, exited
//! - **Search progress**: sampled progress, success, verbatim info lines
//! - **Shutdown**: interrupt, termination requests, grace outcome, forced kills
//!
//! The [`Event`] struct carries the optional metadata (segment, value, ranges, exit).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use rangevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::SuccessFound)
//!     .with_segment(1)
//!     .with_value(180);
//!
//! assert_eq!(ev.kind, EventKind::SuccessFound);
//! assert_eq!(ev.segment, Some(1));
//! assert_eq!(ev.value, Some(180));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::WorkerExit;
use crate::partition::Segment;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Startup ===
    /// Segment computed by the partitioner, before its worker is launched.
    ///
    /// Sets:
    /// - `segment`: segment id
    /// - `core_range`, `scan_range`: core and extended ranges
    /// - `reason`: checkpoint path
    SegmentPlanned,

    // === Worker lifecycle ===
    /// Engine process launched.
    ///
    /// Sets:
    /// - `segment`: segment id
    /// - `pid`: OS process id (if known)
    /// - `scan_range`: range handed to the engine
    WorkerSpawned,

    /// Engine process could not be launched; the segment is lost.
    ///
    /// Sets:
    /// - `segment`: segment id
    /// - `reason`: OS error
    SpawnFailed,

    /// CPU pinning failed (the worker keeps running unpinned).
    ///
    /// Sets:
    /// - `segment`: segment id
    /// - `cpu`: requested core
    /// - `reason`: OS error
    PinFailed,

    /// Engine process exited and its output was fully drained.
    ///
    /// Sets:
    /// - `segment`: segment id
    /// - `exit`: exit classification
    WorkerExited,

    // === Search progress ===
    /// Every K-th progress line.
    ///
    /// Sets:
    /// - `segment`: segment that sent the sampled line
    /// - `value`: most recent progress value
    /// - `count`: progress counter at the time of sampling
    ProgressSampled,

    /// First success observed by the coordinator; the search stops.
    ///
    /// Sets:
    /// - `segment`: reporting segment
    /// - `value`: qualifying value
    SuccessFound,

    /// Success drained from the mailbox after shutdown.
    ///
    /// Sets:
    /// - `segment`: reporting segment
    /// - `value`: qualifying value
    LateSuccess,

    /// Untagged worker output, forwarded verbatim.
    ///
    /// Sets:
    /// - `segment`: segment id
    /// - `reason`: the line
    WorkerInfo,

    // === Shutdown ===
    /// External interrupt (OS signal) observed.
    InterruptReceived,

    /// Termination request sent to a still-running worker.
    ///
    /// Sets:
    /// - `segment`: segment id
    TerminationRequested,

    /// All workers exited within the grace period.
    ///
    /// Sets:
    /// - `grace_ms`: configured grace
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not exit in time.
    ///
    /// Sets:
    /// - `grace_ms`: configured grace
    /// - `reason`: stuck segment list
    GraceExceeded,

    /// Forced kill sent to a worker that outlived the grace period.
    ///
    /// Sets:
    /// - `segment`: segment id
    WorkerKilled,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Segment the event is about.
    pub segment: Option<usize>,
    /// Numeric payload (progress or success value).
    pub value: Option<u64>,
    /// Counter payload (progress counter).
    pub count: Option<u64>,
    /// Core range `(start, end)` of a segment.
    pub core_range: Option<(u64, u64)>,
    /// Range actually scanned by the worker `(start, end)`.
    pub scan_range: Option<(u64, u64)>,
    /// OS process id.
    pub pid: Option<u32>,
    /// CPU core.
    pub cpu: Option<usize>,
    /// Worker exit classification.
    pub exit: Option<WorkerExit>,
    /// Grace period in milliseconds (compact).
    pub grace_ms: Option<u32>,
    /// Human-readable text (errors, verbatim worker output, paths).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            segment: None,
            value: None,
            count: None,
            core_range: None,
            scan_range: None,
            pid: None,
            cpu: None,
            exit: None,
            grace_ms: None,
            reason: None,
        }
    }

    /// Attaches a segment id.
    #[inline]
    pub fn with_segment(mut self, id: usize) -> Self {
        self.segment = Some(id);
        self
    }

    /// Attaches a numeric value.
    #[inline]
    pub fn with_value(mut self, value: u64) -> Self {
        self.value = Some(value);
        self
    }

    /// Attaches a counter.
    #[inline]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Attaches the core and extended ranges of a segment.
    #[inline]
    pub fn with_ranges(mut self, seg: &Segment) -> Self {
        self.core_range = Some((seg.core_start, seg.core_end));
        self.scan_range = Some((seg.extended_start, seg.extended_end));
        self
    }

    /// Attaches the scanned range only.
    #[inline]
    pub fn with_scan_range(mut self, start: u64, end: u64) -> Self {
        self.scan_range = Some((start, end));
        self
    }

    /// Attaches an OS process id.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches a CPU core.
    #[inline]
    pub fn with_cpu(mut self, cpu: usize) -> Self {
        self.cpu = Some(cpu);
        self
    }

    /// Attaches a worker exit classification.
    #[inline]
    pub fn with_exit(mut self, exit: WorkerExit) -> Self {
        self.exit = Some(exit);
        self
    }

    /// Attaches a grace duration (stored as milliseconds).
    #[inline]
    pub fn with_grace(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.grace_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerInfo);
        let b = Event::new(EventKind::WorkerInfo);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_grace_is_clamped() {
        let ev = Event::new(EventKind::GraceExceeded).with_grace(Duration::from_secs(u64::MAX));
        assert_eq!(ev.grace_ms, Some(u32::MAX));
    }

    #[test]
    fn test_ranges_from_segment() {
        let seg = Segment {
            id: 0,
            core_start: 100,
            core_end: 149,
            extended_start: 100,
            extended_end: 154,
            checkpoint_path: "checkpoint_0.bin".into(),
        };
        let ev = Event::new(EventKind::SegmentPlanned).with_ranges(&seg);
        assert_eq!(ev.core_range, Some((100, 149)));
        assert_eq!(ev.scan_range, Some((100, 154)));
    }
}
