//! # Search configuration.
//!
//! Provides [`Config`], the settings fixed at startup for one segmented search.
//! There is no runtime reconfiguration: the supervisor reads the config once,
//! partitions the range and launches the workers.
//!
//! ## Sentinel values
//! - `cpu_count = 0` → detect the number of logical CPUs
//! - `progress_throttle = 0` → treated as `1` (log every progress line)
//! - `launch_stagger = 0s` → launch all workers back to back

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SearchError;
use crate::partition;

/// Configuration of a segmented search run.
///
/// ## Field semantics
/// - `range_start..=range_end`: total search interval (inclusive on both ends)
/// - `segments`: number of engine processes, one per segment
/// - `overlap`: margin added on both sides of every core range
/// - `engine` / `engine_args`: program to launch; `engine_args` come before the
///   four positional arguments `(range_start, range_end, checkpoint_path, interval_secs)`
/// - `grace`: how long shutdown waits for workers after requesting termination
///
/// All fields are public. Prefer the helper accessors over checking sentinels inline.
#[derive(Clone, Debug)]
pub struct Config {
    /// First value of the total search interval.
    pub range_start: u64,
    /// Last value of the total search interval (inclusive).
    pub range_end: u64,
    /// Number of segments (and worker processes).
    pub segments: usize,
    /// Overlap margin applied to each core range, clipped to the total bounds.
    pub overlap: u64,

    /// Engine executable.
    pub engine: PathBuf,
    /// Extra arguments placed before the positional engine arguments.
    pub engine_args: Vec<String>,
    /// Directory holding the per-segment checkpoint files.
    pub checkpoint_dir: PathBuf,
    /// How often the engine should persist its checkpoint.
    pub checkpoint_interval: Duration,

    /// Log only every K-th progress line.
    pub progress_throttle: u64,

    /// Maximum wait for workers to exit after a termination request.
    pub grace: Duration,
    /// Send a forced kill to workers still alive after `grace`.
    pub force_kill: bool,
    /// Maximum wait for force-killed workers to be reaped.
    pub kill_wait: Duration,

    /// Pin worker `i` to CPU `i mod cpu_count` (best effort).
    pub pin_cpus: bool,
    /// Number of CPUs used for pinning (`0` = detect).
    pub cpu_count: usize,
    /// Delay between consecutive worker launches.
    pub launch_stagger: Duration,
}

impl Config {
    /// Returns the CPU count used for pinning, detecting it when set to `0`.
    #[inline]
    pub fn effective_cpu_count(&self) -> usize {
        match self.cpu_count {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// Returns the progress throttle clamped to a minimum of 1.
    #[inline]
    pub fn progress_throttle_clamped(&self) -> u64 {
        self.progress_throttle.max(1)
    }

    /// Returns the CPU a segment's worker should be pinned to, or `None` if pinning is disabled.
    #[inline]
    pub fn core_for(&self, segment: usize) -> Option<usize> {
        self.pin_cpus
            .then(|| segment % self.effective_cpu_count())
    }

    /// Checks the partition parameters.
    ///
    /// Fails with [`SearchError::InvalidConfig`] when:
    /// - `segments == 0`
    /// - `range_end <= range_start`
    /// - the range is too short to give every segment at least one value
    ///
    /// [`partition_config`](crate::partition_config) runs the same checks.
    pub fn validate(&self) -> Result<(), SearchError> {
        partition::core_stride(self.range_start, self.range_end, self.segments).map(|_| ())
    }
}

impl Default for Config {
    /// Default configuration of the batch search:
    ///
    /// - range `[1000560284742167, 2·10^15]` split into 8 segments, overlap 2004
    /// - engine `./prime_search`, checkpoints in `.` every hour
    /// - progress logged every 10th line
    /// - `grace = 2s`, forced kill enabled, `kill_wait = 1s`
    /// - pinning enabled with detected CPU count, launches staggered by 200ms
    fn default() -> Self {
        Self {
            range_start: 1_000_560_284_742_167,
            range_end: 2_000_000_000_000_000,
            segments: 8,
            overlap: 2004,
            engine: PathBuf::from("./prime_search"),
            engine_args: Vec::new(),
            checkpoint_dir: PathBuf::from("."),
            checkpoint_interval: Duration::from_secs(3600),
            progress_throttle: 10,
            grace: Duration::from_secs(2),
            force_kill: true,
            kill_wait: Duration::from_secs(1),
            pin_cpus: true,
            cpu_count: 0,
            launch_stagger: Duration::from_millis(200),
        }
    }
}
