//! # WorkerActor: supervises one engine process.
//!
//! ## Flow
//! ```text
//! [launch delay] ──(terminate)──────────────────────────────► Exited(Cancelled)
//!       │
//!       ▼
//! spawn engine ──(io error)───► SpawnFailed event ──────────► Exited(SpawnFailed)
//!       │
//!       ├─► mark Running, WorkerSpawned event
//!       ├─► pin to cpu (failure ─► PinFailed event, keep running)
//!       ├─► spawn reader (combined stdout+stderr) ─► mailbox
//!       ▼
//! wait ──► process exits on its own ────────────────────────┐
//!   └────► terminate token ─► SIGTERM ─► wait ──────────────┤
//!                                 └─► kill token ─► SIGKILL ┤
//!                                                           ▼
//!                              mark Exited ─► WorkerExited event
//!                                  └─► join reader (bounded, then abort) ─► Mail::Exited
//! ```
//!
//! ## Rules
//! - The actor is the only owner of its process handle.
//! - The registry records the exit as soon as the process is reaped. Output pipes
//!   inherited by background children do not keep the worker alive.
//! - `Mail::Exited` is posted after the reader finished (or was aborted after
//!   [`READER_LINGER`]), so it follows every line read for this worker.
//! - A termination request is sent at most once (the registry hands out the token once).

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::{select, time};

use crate::core::affinity;
use crate::core::engine::{self, EngineCommand};
use crate::core::mailbox::{Mail, MailSender};
use crate::core::reader::spawn_reader;
use crate::core::registry::{WorkerExit, WorkerRegistry, WorkerTokens};
use crate::error::SearchError;
use crate::events::{Event, EventKind};
use crate::partition::Segment;
use crate::subscribers::SubscriberSet;

/// How long output is still read after the engine exited.
///
/// The pipe stays open while any process holding its write end lives; past this
/// the reader is aborted.
pub const READER_LINGER: Duration = Duration::from_millis(250);

/// Supervises the engine process of one segment.
pub struct WorkerActor {
    /// Segment scanned by this worker.
    pub segment: Segment,
    /// Engine launcher shared by all actors.
    pub engine: Arc<EngineCommand>,
    /// CPU to pin the process to (`None` = no pinning).
    pub cpu: Option<usize>,
    /// Delay before launching (staggered startup).
    pub launch_delay: Duration,
    /// Registry slot owner.
    pub registry: Arc<WorkerRegistry>,
    /// Mailbox to the coordinator.
    pub mail: MailSender,
    /// Event fan-out.
    pub subs: Arc<SubscriberSet>,
}

impl WorkerActor {
    /// Runs the worker to completion and returns its segment id.
    pub async fn run(self, tokens: WorkerTokens) -> usize {
        let id = self.segment.id;
        let (exit, readers) = self.supervise(&tokens).await;

        self.registry.mark_exited(id, exit).await;
        self.subs
            .publish(
                Event::new(EventKind::WorkerExited)
                    .with_segment(id)
                    .with_exit(exit),
            )
            .await;

        let deadline = time::Instant::now() + READER_LINGER;
        for mut reader in readers {
            if time::timeout_at(deadline, &mut reader).await.is_err() {
                tracing::debug!(segment = id, "output still open after exit, reader aborted");
                reader.abort();
            }
        }
        let _ = self.mail.send(Mail::Exited { segment: id, exit });
        id
    }

    async fn supervise(&self, tokens: &WorkerTokens) -> (WorkerExit, Vec<JoinHandle<u64>>) {
        let id = self.segment.id;

        if !self.launch_delay.is_zero() {
            select! {
                _ = time::sleep(self.launch_delay) => {}
                _ = tokens.terminate.cancelled() => return (WorkerExit::Cancelled, Vec::new()),
            }
        }
        if tokens.terminate.is_cancelled() {
            return (WorkerExit::Cancelled, Vec::new());
        }

        let engine::EngineProcess { mut child, output } = match self.engine.spawn(&self.segment) {
            Ok(process) => process,
            Err(source) => {
                let err = SearchError::SpawnFailure { segment: id, source };
                tracing::debug!(label = err.as_label(), %err);
                self.subs
                    .publish(
                        Event::new(EventKind::SpawnFailed)
                            .with_segment(id)
                            .with_reason(err.to_string()),
                    )
                    .await;
                return (WorkerExit::SpawnFailed, Vec::new());
            }
        };

        let pid = child.id();
        self.registry.mark_running(id).await;
        self.subs
            .publish(
                Event::new(EventKind::WorkerSpawned)
                    .with_segment(id)
                    .with_pid(pid)
                    .with_scan_range(self.segment.extended_start, self.segment.extended_end),
            )
            .await;
        self.pin(pid).await;

        let readers: Vec<_> = output
            .into_iter()
            .map(|stream| spawn_reader(id, stream, self.mail.clone()))
            .collect();

        (self.wait(&mut child, tokens).await, readers)
    }

    async fn pin(&self, pid: Option<u32>) {
        let (Some(cpu), Some(pid)) = (self.cpu, pid) else {
            return;
        };
        match affinity::pin_process(pid, cpu) {
            Ok(()) => tracing::debug!(segment = self.segment.id, cpu, pid, "worker pinned"),
            Err(err) => {
                self.subs
                    .publish(
                        Event::new(EventKind::PinFailed)
                            .with_segment(self.segment.id)
                            .with_cpu(cpu)
                            .with_reason(err.to_string()),
                    )
                    .await
            }
        }
    }

    /// Waits for the process, honoring termination and kill requests.
    async fn wait(&self, child: &mut Child, tokens: &WorkerTokens) -> WorkerExit {
        let status = select! {
            status = child.wait() => status,
            _ = tokens.terminate.cancelled() => {
                if let Err(err) = engine::request_termination(child) {
                    tracing::debug!(segment = self.segment.id, %err, "termination signal failed");
                }
                select! {
                    status = child.wait() => status,
                    _ = tokens.kill.cancelled() => {
                        if let Err(err) = child.start_kill() {
                            tracing::debug!(segment = self.segment.id, %err, "kill failed");
                        }
                        child.wait().await
                    }
                }
            }
        };

        match status {
            Ok(status) => WorkerExit::from(status),
            Err(err) => {
                tracing::warn!(segment = self.segment.id, %err, "failed to wait on worker");
                WorkerExit::Unknown
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::mailbox::{MailReceiver, mailbox};
    use crate::core::registry::WorkerState;
    use crate::subscribers::{Subscribe, testing::Recorder};
    use std::path::PathBuf;

    fn actor_with(
        script: &str,
        subs: Arc<SubscriberSet>,
    ) -> (WorkerActor, Arc<WorkerRegistry>, MailReceiver) {
        let cfg = Config {
            engine: PathBuf::from("sh"),
            engine_args: vec!["-c".into(), script.into(), "engine".into()],
            ..Config::default()
        };
        let registry = WorkerRegistry::new();
        let (tx, rx) = mailbox();
        let actor = WorkerActor {
            segment: Segment {
                id: 0,
                core_start: 10,
                core_end: 20,
                extended_start: 10,
                extended_end: 25,
                checkpoint_path: PathBuf::from("checkpoint_0.bin"),
            },
            engine: Arc::new(EngineCommand::from_config(&cfg)),
            cpu: None,
            launch_delay: Duration::ZERO,
            registry: registry.clone(),
            mail: tx,
            subs,
        };
        (actor, registry, rx)
    }

    async fn collect(rx: &mut MailReceiver) -> Vec<Mail> {
        let mut all = Vec::new();
        while let Some(m) = rx.recv().await {
            all.push(m);
        }
        all
    }

    #[tokio::test]
    async fn test_lines_precede_exit_notice() {
        let subs = Arc::new(SubscriberSet::empty());
        let script = r#"echo "range $1 $2 $4"; echo PROGRESS:11; echo oops >&2; exit 3"#;
        let (actor, registry, mut rx) = actor_with(script, subs);
        let tokens = registry.register(0).await;

        assert_eq!(actor.run(tokens).await, 0);
        let mail = collect(&mut rx).await;

        assert_eq!(
            mail.last(),
            Some(&Mail::Exited {
                segment: 0,
                exit: WorkerExit::Code(3)
            })
        );
        assert_eq!(lines(&mail), vec!["range 10 25 3600", "PROGRESS:11", "oops"]);
        assert_eq!(
            registry.state(0).await,
            Some(WorkerState::Exited(WorkerExit::Code(3)))
        );
    }

    fn lines(mail: &[Mail]) -> Vec<&str> {
        mail.iter()
            .filter_map(|m| match m {
                Mail::Line { line, .. } => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_stdout_and_stderr_keep_emission_order() {
        let subs = Arc::new(SubscriberSet::empty());
        let script = "for i in 1 2 3 4 5; do echo out$i; echo err$i >&2; done";
        let (actor, registry, mut rx) = actor_with(script, subs);
        let tokens = registry.register(0).await;

        actor.run(tokens).await;
        let mail = collect(&mut rx).await;

        let expected: Vec<String> = (1..=5)
            .flat_map(|i| [format!("out{i}"), format!("err{i}")])
            .collect();
        assert_eq!(lines(&mail), expected);
    }

    #[tokio::test]
    async fn test_background_child_does_not_hold_the_exit() {
        let rec = Arc::new(Recorder::default());
        let subs = Arc::new(SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>]));
        let (actor, registry, mut rx) =
            actor_with("echo started; sleep 8 & exit 0", subs.clone());
        let tokens = registry.register(0).await;

        let started = time::Instant::now();
        time::timeout(Duration::from_secs(3), actor.run(tokens))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(
            registry.state(0).await,
            Some(WorkerState::Exited(WorkerExit::Code(0)))
        );

        let mail = collect(&mut rx).await;
        assert_eq!(lines(&mail), vec!["started"]);
        assert_eq!(
            mail.last(),
            Some(&Mail::Exited {
                segment: 0,
                exit: WorkerExit::Code(0)
            })
        );
        subs.shutdown().await;
        assert_eq!(rec.count(EventKind::WorkerExited), 1);
    }

    #[tokio::test]
    async fn test_terminate_token_stops_long_running_engine() {
        let subs = Arc::new(SubscriberSet::empty());
        let (actor, registry, mut rx) = actor_with("exec sleep 30", subs);
        let tokens = registry.register(0).await;
        let handle = tokio::spawn(actor.run(tokens));

        while registry.state(0).await != Some(WorkerState::Running) {
            time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.request_termination().await, vec![0]);

        time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            collect(&mut rx).await,
            vec![Mail::Exited {
                segment: 0,
                exit: WorkerExit::Signaled
            }]
        );
    }

    #[tokio::test]
    async fn test_kill_token_stops_engine_ignoring_sigterm() {
        let subs = Arc::new(SubscriberSet::empty());
        let (actor, registry, _rx) =
            actor_with("trap '' TERM; echo ready; while :; do sleep 0.05; done", subs);
        let tokens = registry.register(0).await;
        let handle = tokio::spawn(actor.run(tokens));

        while registry.state(0).await != Some(WorkerState::Running) {
            time::sleep(Duration::from_millis(10)).await;
        }
        time::sleep(Duration::from_millis(100)).await;
        registry.request_termination().await;
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(registry.state(0).await, Some(WorkerState::Running));

        assert_eq!(registry.force_kill().await, vec![0]);
        time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            registry.state(0).await,
            Some(WorkerState::Exited(WorkerExit::Signaled))
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let rec = Arc::new(Recorder::default());
        let subs = Arc::new(SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>]));
        let (mut actor, registry, mut rx) = actor_with("exit 0", subs.clone());
        actor.engine = Arc::new(EngineCommand::from_config(&Config {
            engine: PathBuf::from("/nonexistent/engine-binary"),
            ..Config::default()
        }));
        let tokens = registry.register(0).await;

        actor.run(tokens).await;
        subs.shutdown().await;

        assert_eq!(
            collect(&mut rx).await,
            vec![Mail::Exited {
                segment: 0,
                exit: WorkerExit::SpawnFailed
            }]
        );
        assert_eq!(rec.count(EventKind::SpawnFailed), 1);
        assert_eq!(rec.count(EventKind::WorkerExited), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_launch() {
        let subs = Arc::new(SubscriberSet::empty());
        let (mut actor, registry, mut rx) = actor_with("echo should-not-run", subs);
        actor.launch_delay = Duration::from_secs(30);
        let tokens = registry.register(0).await;
        let handle = tokio::spawn(actor.run(tokens));

        registry.request_termination().await;
        time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            collect(&mut rx).await,
            vec![Mail::Exited {
                segment: 0,
                exit: WorkerExit::Cancelled
            }]
        );
    }
}
