//! # Supervisor: plans the segments, launches the workers, and stops them.
//!
//! The [`Supervisor`] owns the [`Config`] and the subscriber list. Each
//! [`Supervisor::run`] builds a fresh [`SubscriberSet`], [`WorkerRegistry`] and
//! mailbox, so nothing leaks between runs.
//!
//! ## High-level architecture
//! ```text
//! Config ──► partition_config() (InvalidConfig) ──► [Segment 0 .. Segment N-1]
//!                                 │
//!                                 └─► banner + SegmentPlanned per segment
//!
//! Spawn actors:
//!   Segment[i] ──► registry.register(i) ─► WorkerTokens
//!              └─► WorkerActor { launch_delay = i·stagger, cpu = i mod cpus }
//!                    set.spawn(actor.run(tokens))
//!
//! Data flow:
//!   engine stdout+stderr ─► reader task ──┐
//!   WorkerActor (exit notice) ────────────┴─► mailbox ─► Coordinator::run(interrupt)
//!                                                          │
//!                                    Success | Interrupted | Exhausted
//!                                                          ▼
//!                                   ShutdownManager::shutdown(&mut set)
//!                                                          ▼
//!                                   Coordinator::drain() (late successes)
//!                                                          ▼
//!                                                     SearchReport
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use rangevisor::{Config, LogWriter, Subscribe, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         range_start: 1_000,
//!         range_end: 2_000,
//!         segments: 4,
//!         ..Config::default()
//!     };
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let report = Supervisor::new(cfg, subs).run().await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::config::Config;
use crate::core::coordinator::Coordinator;
use crate::core::engine::EngineCommand;
use crate::core::mailbox::{MailSender, mailbox};
use crate::core::registry::WorkerRegistry;
use crate::core::shutdown::ShutdownManager;
use crate::core::signals;
use crate::core::worker::WorkerActor;
use crate::error::SearchError;
use crate::events::{Event, EventKind};
use crate::partition::{Segment, partition_config};
use crate::report::SearchReport;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Runs one segmented search.
pub struct Supervisor {
    /// Search configuration.
    pub cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Supervisor {
    /// Creates a supervisor with the given config and event subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { cfg, subscribers }
    }

    /// Runs the search until a success, an OS interrupt, or every worker exiting.
    ///
    /// Only [`SearchError::InvalidConfig`] is returned as an error; a failed
    /// launch loses its segment but the search continues.
    pub async fn run(&self) -> Result<SearchReport, SearchError> {
        self.run_until(signals::interrupted()).await
    }

    /// Like [`run`](Self::run), with `interrupt` standing in for the OS signal.
    pub async fn run_until<F>(&self, interrupt: F) -> Result<SearchReport, SearchError>
    where
        F: Future<Output = ()>,
    {
        let segments = partition_config(&self.cfg)?;
        self.banner(&segments);

        let subs = Arc::new(SubscriberSet::new(self.subscribers.clone()));
        let registry = WorkerRegistry::new();
        let (tx, rx) = mailbox();

        for seg in &segments {
            subs.publish(
                Event::new(EventKind::SegmentPlanned)
                    .with_ranges(seg)
                    .with_reason(seg.checkpoint_path.display().to_string()),
            )
            .await;
        }

        let workers = segments.len();
        let mut set = JoinSet::new();
        self.spawn_workers(&mut set, segments, &registry, &tx, &subs)
            .await;
        // the coordinator sees a closed mailbox once every actor and reader is gone
        drop(tx);

        let mut coordinator = Coordinator::new(
            workers,
            self.cfg.progress_throttle_clamped(),
            rx,
            subs.clone(),
        );
        let stop = coordinator.run(interrupt).await;
        tracing::debug!(?stop, "search loop stopped");

        let shutdown = ShutdownManager::new(&self.cfg, registry.clone(), subs.clone())
            .shutdown(&mut set)
            .await;
        coordinator.drain().await;

        let state = coordinator.into_state();
        let report = SearchReport {
            stop,
            results: state.results().to_vec(),
            progress_events: state.progress_counter(),
            progress_logged: state.progress_logged(),
            workers: registry.snapshot().await,
            shutdown,
        };
        subs.shutdown().await;
        Ok(report)
    }

    fn banner(&self, segments: &[Segment]) {
        tracing::info!(
            range_start = self.cfg.range_start,
            range_end = self.cfg.range_end,
            segments = segments.len(),
            overlap = self.cfg.overlap,
            checkpoint_interval_secs = self.cfg.checkpoint_interval.as_secs(),
            engine = %self.cfg.engine.display(),
            "starting segmented search"
        );
    }

    /// Registers a slot per segment and spawns its actor into `set`.
    async fn spawn_workers(
        &self,
        set: &mut JoinSet<usize>,
        segments: Vec<Segment>,
        registry: &Arc<WorkerRegistry>,
        tx: &MailSender,
        subs: &Arc<SubscriberSet>,
    ) {
        let engine = Arc::new(EngineCommand::from_config(&self.cfg));

        for (i, segment) in segments.into_iter().enumerate() {
            let tokens = registry.register(segment.id).await;
            let actor = WorkerActor {
                cpu: self.cfg.core_for(segment.id),
                launch_delay: stagger(self.cfg.launch_stagger, i),
                segment,
                engine: engine.clone(),
                registry: registry.clone(),
                mail: tx.clone(),
                subs: subs.clone(),
            };
            set.spawn(actor.run(tokens));
        }
    }
}

fn stagger(step: Duration, index: usize) -> Duration {
    step.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::{WorkerExit, WorkerState};
    use crate::report::StopReason;
    use crate::subscribers::testing::Recorder;
    use std::path::PathBuf;
    use tokio::time;

    /// Segment 0 scans from 100, segment 1 from 145.
    fn config(dir: &std::path::Path, seg0: &str, seg1: &str) -> Config {
        let script = format!(r#"if [ "$1" = 100 ]; then {seg0}; else {seg1}; fi"#);
        Config {
            range_start: 100,
            range_end: 200,
            segments: 2,
            overlap: 5,
            engine: PathBuf::from("sh"),
            engine_args: vec!["-c".into(), script, "engine".into()],
            checkpoint_dir: dir.to_path_buf(),
            progress_throttle: 10,
            grace: Duration::from_secs(2),
            kill_wait: Duration::from_secs(2),
            pin_cpus: false,
            launch_stagger: Duration::ZERO,
            ..Config::default()
        }
    }

    fn supervisor(cfg: Config) -> (Supervisor, Arc<Recorder>) {
        let rec = Arc::new(Recorder::default());
        let sup = Supervisor::new(cfg, vec![rec.clone() as Arc<dyn Subscribe>]);
        (sup, rec)
    }

    fn never() -> impl Future<Output = ()> {
        std::future::pending()
    }

    #[test]
    fn test_stagger_grows_linearly() {
        let step = Duration::from_millis(200);
        assert_eq!(stagger(step, 0), Duration::ZERO);
        assert_eq!(stagger(step, 3), Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), "exit 0", "exit 0");
        cfg.segments = 0;
        let (sup, rec) = supervisor(cfg);

        let err = sup.run_until(never()).await.unwrap_err();
        assert_eq!(err.as_label(), "search_invalid_config");
        assert!(rec.events().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_minimum_over_simultaneous_successes() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(
            dir.path(),
            "trap '' TERM; sleep 0.5; echo SUCCESS:120",
            "sleep 0.1; echo SUCCESS:180",
        );
        let (sup, rec) = supervisor(cfg);

        let report = sup.run_until(never()).await.unwrap();

        assert_eq!(report.stop, StopReason::Success { segment: 1, value: 180 });
        assert_eq!(report.results, vec![Some(120), Some(180)]);
        assert_eq!(report.best(), Some(120));
        assert_eq!(report.to_string(), "minimum solution found: n = 120");
        // segment 1 may still be reaping when the request goes out
        assert!(report.shutdown.requested.contains(&0));
        assert!(report.shutdown.within_grace());
        assert_eq!(rec.count(EventKind::SegmentPlanned), 2);
        assert_eq!(rec.count(EventKind::LateSuccess), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exhausted_without_result() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "echo PROGRESS:100; exit 0", "echo 'no luck'; exit 1");
        let (sup, rec) = supervisor(cfg);

        let report = sup.run_until(never()).await.unwrap();

        assert_eq!(report.stop, StopReason::Exhausted);
        assert!(!report.found());
        assert_eq!(report.to_string(), "no result found within range");
        assert!(report.shutdown.requested.is_empty());
        assert_eq!(
            report.workers,
            vec![
                (0, WorkerState::Exited(WorkerExit::Code(0))),
                (1, WorkerState::Exited(WorkerExit::Code(1))),
            ]
        );
        assert_eq!(rec.count(EventKind::WorkerInfo), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_background_children_do_not_delay_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "sleep 8 & exit 0", "sleep 8 & exit 0");
        let (sup, _rec) = supervisor(cfg);

        let started = time::Instant::now();
        let report = time::timeout(Duration::from_secs(3), sup.run_until(never()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.stop, StopReason::Exhausted);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(
            report
                .workers
                .iter()
                .all(|(_, s)| *s == WorkerState::Exited(WorkerExit::Code(0)))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_receives_segment_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"echo "$1 $2 $3 $4" > "$3""#;
        let cfg = config(dir.path(), script, script);
        let (sup, _rec) = supervisor(cfg);

        sup.run_until(never()).await.unwrap();

        let first = dir.path().join("checkpoint_0.bin");
        let second = dir.path().join("checkpoint_1.bin");
        let read = |p: &PathBuf| std::fs::read_to_string(p).unwrap();
        assert_eq!(read(&first).trim(), format!("100 154 {} 3600", first.display()));
        assert_eq!(read(&second).trim(), format!("145 200 {} 3600", second.display()));
    }

    #[tokio::test]
    async fn test_spawn_failures_do_not_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), "exit 0", "exit 0");
        cfg.engine = PathBuf::from("/nonexistent/engine-binary");
        cfg.engine_args.clear();
        let (sup, rec) = supervisor(cfg);

        let report = sup.run_until(never()).await.unwrap();

        assert_eq!(report.stop, StopReason::Exhausted);
        assert_eq!(rec.count(EventKind::SpawnFailed), 2);
        assert!(
            report
                .workers
                .iter()
                .all(|(_, s)| *s == WorkerState::Exited(WorkerExit::SpawnFailed))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_running_worker_is_terminated_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "exec sleep 30", "sleep 0.1; echo SUCCESS:170");
        let (sup, rec) = supervisor(cfg);

        let report = time::timeout(Duration::from_secs(10), sup.run_until(never()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.best(), Some(170));
        assert!(report.shutdown.requested.contains(&0));
        assert!(report.shutdown.within_grace());
        assert_eq!(report.workers[0].1, WorkerState::Exited(WorkerExit::Signaled));
        assert_eq!(
            rec.count(EventKind::TerminationRequested),
            report.shutdown.requested.len()
        );
        assert_eq!(rec.count(EventKind::AllStoppedWithin), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stubborn_worker_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(
            dir.path(),
            "trap '' TERM; while :; do sleep 0.05; done",
            "sleep 0.2; echo SUCCESS:160",
        );
        cfg.grace = Duration::from_millis(200);
        let (sup, rec) = supervisor(cfg);

        let report = time::timeout(Duration::from_secs(10), sup.run_until(never()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.best(), Some(160));
        assert_eq!(report.shutdown.stuck, vec![0]);
        assert_eq!(report.shutdown.killed, vec![0]);
        assert_eq!(rec.count(EventKind::GraceExceeded), 1);
        assert_eq!(rec.count(EventKind::WorkerKilled), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_stops_all_workers() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "exec sleep 30", "exec sleep 30");
        let (sup, rec) = supervisor(cfg);

        let interrupt = time::sleep(Duration::from_millis(200));
        let report = time::timeout(Duration::from_secs(10), sup.run_until(interrupt))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.stop, StopReason::Interrupted);
        assert!(!report.found());
        assert_eq!(report.shutdown.requested, vec![0, 1]);
        assert!(report.workers.iter().all(|(_, s)| s.is_exited()));
        assert_eq!(rec.count(EventKind::InterruptReceived), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_progress_throttling_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(
            dir.path(),
            "i=0; while [ $i -lt 25 ]; do i=$((i+1)); echo PROGRESS:$i; done",
            "exit 0",
        );
        let (sup, rec) = supervisor(cfg);

        let report = sup.run_until(never()).await.unwrap();

        assert_eq!(report.progress_events, 25);
        assert_eq!(report.progress_logged, 2);
        assert_eq!(rec.count(EventKind::ProgressSampled), 2);
    }
}
