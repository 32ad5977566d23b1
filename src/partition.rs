//! # Range partitioning with boundary overlap.
//!
//! Splits the total interval `[start, end]` into `count` contiguous core ranges and
//! widens each by `overlap` on both sides, clipped to the total bounds.
//!
//! ```text
//! total:      [start ............................................. end]
//! cores:      [ seg 0       ][ seg 1       ][ seg 2 (absorbs remainder) ]
//! extended:   [ seg 0 +ov ]
//!                       [ov+ seg 1 +ov ]
//!                                     [ov+ seg 2                       ]
//! ```
//!
//! ## Rules
//! - Core ranges cover `[start, end]` exactly, with no gap and no double coverage.
//! - `segment_len = floor((end - start) / count)`; the last core ends at `end`.
//! - `extended_start = max(start, core_start - overlap)`,
//!   `extended_end = min(end, core_end + overlap)`.
//! - Segments are immutable once built.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::SearchError;

/// One contiguous sub-range of the search space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position of the segment (0-based).
    pub id: usize,
    /// First value this segment owns.
    pub core_start: u64,
    /// Last value this segment owns (inclusive).
    pub core_end: u64,
    /// First value the worker scans.
    pub extended_start: u64,
    /// Last value the worker scans (inclusive).
    pub extended_end: u64,
    /// Engine checkpoint file for this segment.
    pub checkpoint_path: PathBuf,
}

impl Segment {
    /// Number of values in the core range.
    #[inline]
    pub fn core_len(&self) -> u64 {
        self.core_end - self.core_start + 1
    }
}

/// Checkpoint file name used for a segment inside the checkpoint directory.
pub fn checkpoint_file(dir: &Path, id: usize) -> PathBuf {
    dir.join(format!("checkpoint_{id}.bin"))
}

/// Splits `[start, end]` into `count` segments extended by `overlap`.
///
/// Fails with [`SearchError::InvalidConfig`] if `count < 1`, `end <= start`,
/// or the range is too short to give every segment at least one value.
///
/// # Example
/// ```
/// use std::path::Path;
/// use rangevisor::partition;
///
/// let segs = partition(100, 200, 2, 5, Path::new("/tmp")).unwrap();
/// assert_eq!((segs[0].core_start, segs[0].core_end), (100, 149));
/// assert_eq!((segs[0].extended_start, segs[0].extended_end), (100, 154));
/// assert_eq!((segs[1].core_start, segs[1].core_end), (150, 200));
/// assert_eq!((segs[1].extended_start, segs[1].extended_end), (145, 200));
/// ```
pub fn partition(
    start: u64,
    end: u64,
    count: usize,
    overlap: u64,
    checkpoint_dir: &Path,
) -> Result<Vec<Segment>, SearchError> {
    let segment_len = core_stride(start, end, count)?;
    let segments = (0..count)
        .map(|id| {
            let core_start = start + id as u64 * segment_len;
            let core_end = if id + 1 < count {
                core_start + segment_len - 1
            } else {
                end
            };
            Segment {
                id,
                core_start,
                core_end,
                extended_start: core_start.saturating_sub(overlap).max(start),
                extended_end: core_end.saturating_add(overlap).min(end),
                checkpoint_path: checkpoint_file(checkpoint_dir, id),
            }
        })
        .collect();

    Ok(segments)
}

/// Length of every core but the last, which also takes the remainder.
///
/// This is the single place the partition parameters are checked.
pub(crate) fn core_stride(start: u64, end: u64, count: usize) -> Result<u64, SearchError> {
    if count < 1 {
        return Err(SearchError::invalid_config("segment count must be at least 1"));
    }
    if end <= start {
        return Err(SearchError::invalid_config(format!(
            "range end {end} must be greater than range start {start}"
        )));
    }
    match (end - start) / count as u64 {
        0 => Err(SearchError::invalid_config(format!(
            "range [{start}, {end}] is too short for {count} segments"
        ))),
        len => Ok(len),
    }
}

/// Partitions the range described by a [`Config`].
pub fn partition_config(cfg: &Config) -> Result<Vec<Segment>, SearchError> {
    partition(
        cfg.range_start,
        cfg.range_end,
        cfg.segments,
        cfg.overlap,
        &cfg.checkpoint_dir,
    )
}
