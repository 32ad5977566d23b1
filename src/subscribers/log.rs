//! # LogWriter: structured event logger
//!
//! Turns incoming [`Event`]s into `tracing` records. This is the subscriber the
//! `rangevisor` binary installs; library users can replace or complement it.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO segment planned segment=0 core=(100, 149) scan=(100, 154) checkpoint="checkpoint_0.bin"
//! INFO worker spawned segment=0 pid=4242
//! INFO progress segment=3 value=1250000001234567 count=40
//! INFO [segment 1] Checkpoint saved at prime 1250000001234601
//! INFO solution found segment=1 value=180
//! WARN termination requested segment=0
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event logger subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::SegmentPlanned => {
                info!(
                    segment = ?e.segment,
                    core = ?e.core_range,
                    scan = ?e.scan_range,
                    checkpoint = e.reason.as_deref().unwrap_or("-"),
                    "segment planned"
                );
            }
            EventKind::WorkerSpawned => {
                info!(segment = ?e.segment, pid = ?e.pid, scan = ?e.scan_range, "worker spawned");
            }
            EventKind::SpawnFailed => {
                warn!(segment = ?e.segment, err = ?e.reason, "worker failed to spawn");
            }
            EventKind::PinFailed => {
                warn!(segment = ?e.segment, cpu = ?e.cpu, err = ?e.reason, "cpu pinning failed");
            }
            EventKind::WorkerExited => {
                info!(segment = ?e.segment, exit = ?e.exit, "worker exited");
            }
            EventKind::ProgressSampled => {
                info!(segment = ?e.segment, value = ?e.value, count = ?e.count, "progress");
            }
            EventKind::SuccessFound => {
                info!(segment = ?e.segment, value = ?e.value, "solution found");
            }
            EventKind::LateSuccess => {
                info!(segment = ?e.segment, value = ?e.value, "additional solution drained after stop");
            }
            EventKind::WorkerInfo => {
                info!(
                    "[segment {}] {}",
                    e.segment.map_or_else(|| "?".to_string(), |s| s.to_string()),
                    e.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::InterruptReceived => {
                warn!("interrupt received, stopping all workers");
            }
            EventKind::TerminationRequested => {
                warn!(segment = ?e.segment, "termination requested");
            }
            EventKind::AllStoppedWithin => {
                info!(grace_ms = ?e.grace_ms, "all workers stopped within grace");
            }
            EventKind::GraceExceeded => {
                warn!(grace_ms = ?e.grace_ms, stuck = ?e.count, err = ?e.reason, "grace exceeded");
            }
            EventKind::WorkerKilled => {
                warn!(segment = ?e.segment, "worker force-killed");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
