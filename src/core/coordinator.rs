//! # Coordinator: the single consumer of worker output.
//!
//! One task owns the mailbox receiver and the [`SearchState`]; nothing else
//! mutates the state, so no lock guards it.
//!
//! ## Loop
//! ```text
//! loop {
//!   all workers exited? ─► Exhausted
//!   select! (biased) {
//!     interrupt ─────────────► stop = true ─► Interrupted
//!     mailbox.recv() ─► Line(seg, raw) ─► WorkerEvent::parse
//!                       │   ├─ Progress(v) ─► counter += 1; every K-th ─► ProgressSampled
//!                       │   ├─ Success(v)  ─► results[seg] = v; stop = true ─► Success
//!                       │   └─ Info(text)  ─► WorkerInfo
//!                       ├─ Exited(seg) ─► exited += seg
//!                       └─ closed ─► Exhausted
//!   }
//! }
//! ```
//!
//! The wait blocks on the mailbox instead of polling, so there is no idle sleep.
//! After shutdown, [`Coordinator::drain`] picks up `SUCCESS:` lines that were
//! still queued; progress is never logged once the loop has stopped.
//!
//! Sampled progress is the only notice that may be dropped when a subscriber
//! falls behind; info lines and successes wait for queue space.

use std::collections::BTreeSet;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::core::mailbox::{Mail, MailReceiver};
use crate::events::{Event, EventKind};
use crate::protocol::WorkerEvent;
use crate::report::StopReason;
use crate::subscribers::SubscriberSet;

/// State of a search, written only by the coordinator.
#[derive(Debug, Clone)]
pub struct SearchState {
    results: Vec<Option<u64>>,
    progress_counter: u64,
    progress_logged: u64,
    last_progress: Option<u64>,
    exited: BTreeSet<usize>,
    stop: bool,
}

impl SearchState {
    /// Creates an empty state for `workers` segments.
    pub fn new(workers: usize) -> Self {
        Self {
            results: vec![None; workers],
            progress_counter: 0,
            progress_logged: 0,
            last_progress: None,
            exited: BTreeSet::new(),
            stop: false,
        }
    }

    /// Recorded value per segment.
    pub fn results(&self) -> &[Option<u64>] {
        &self.results
    }

    /// Smallest recorded value.
    pub fn best(&self) -> Option<u64> {
        self.results.iter().flatten().min().copied()
    }

    /// Number of progress lines seen.
    pub fn progress_counter(&self) -> u64 {
        self.progress_counter
    }

    /// Number of progress lines logged.
    pub fn progress_logged(&self) -> u64 {
        self.progress_logged
    }

    /// Most recent progress value.
    pub fn last_progress(&self) -> Option<u64> {
        self.last_progress
    }

    /// Returns `true` once a success or an interrupt was observed.
    pub fn is_stopped(&self) -> bool {
        self.stop
    }

    /// Number of workers known to have exited.
    pub fn exited(&self) -> usize {
        self.exited.len()
    }

    fn record(&mut self, segment: usize, value: u64) {
        if let Some(slot) = self.results.get_mut(segment) {
            *slot = Some(slot.map_or(value, |prev| prev.min(value)));
        }
    }
}

/// Drives the search until success, interrupt or exhaustion.
pub struct Coordinator {
    state: SearchState,
    workers: usize,
    throttle: u64,
    mailbox: MailReceiver,
    subs: Arc<SubscriberSet>,
}

impl Coordinator {
    /// Creates a coordinator for `workers` segments logging every `throttle`-th progress line.
    pub fn new(
        workers: usize,
        throttle: u64,
        mailbox: MailReceiver,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        Self {
            state: SearchState::new(workers),
            workers,
            throttle: throttle.max(1),
            mailbox,
            subs,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Consumes the coordinator, returning its state.
    pub fn into_state(self) -> SearchState {
        self.state
    }

    /// Runs the loop until the first success, `interrupt` completing, or every worker exiting.
    pub async fn run<F>(&mut self, interrupt: F) -> StopReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        loop {
            if self.state.exited.len() >= self.workers {
                return StopReason::Exhausted;
            }

            tokio::select! {
                biased;
                _ = &mut interrupt => {
                    self.state.stop = true;
                    self.subs.publish(Event::new(EventKind::InterruptReceived)).await;
                    return StopReason::Interrupted;
                }
                mail = self.mailbox.recv() => match mail {
                    Some(Mail::Line { segment, line }) => {
                        if let ControlFlow::Break(reason) = self.on_line(segment, &line).await {
                            return reason;
                        }
                    }
                    Some(Mail::Exited { segment, .. }) => {
                        self.state.exited.insert(segment);
                    }
                    None => return StopReason::Exhausted,
                }
            }
        }
    }

    async fn on_line(&mut self, segment: usize, raw: &str) -> ControlFlow<StopReason> {
        match WorkerEvent::parse(raw) {
            None => {}
            Some(WorkerEvent::Progress(value)) => {
                self.state.progress_counter += 1;
                self.state.last_progress = Some(value);
                if self.state.progress_counter % self.throttle == 0 {
                    self.state.progress_logged += 1;
                    self.subs.emit(
                        Event::new(EventKind::ProgressSampled)
                            .with_segment(segment)
                            .with_value(value)
                            .with_count(self.state.progress_counter),
                    );
                }
            }
            Some(WorkerEvent::Success(value)) => {
                self.state.record(segment, value);
                self.state.stop = true;
                self.subs
                    .publish(
                        Event::new(EventKind::SuccessFound)
                            .with_segment(segment)
                            .with_value(value),
                    )
                    .await;
                return ControlFlow::Break(StopReason::Success { segment, value });
            }
            Some(WorkerEvent::Info(text)) => {
                self.subs
                    .publish(
                        Event::new(EventKind::WorkerInfo)
                            .with_segment(segment)
                            .with_reason(text),
                    )
                    .await;
            }
        }
        ControlFlow::Continue(())
    }

    /// Records successes still queued after the loop stopped, without waiting.
    ///
    /// Progress and info lines are discarded. Returns the number of late successes.
    pub async fn drain(&mut self) -> usize {
        let mut late = 0;
        while let Ok(mail) = self.mailbox.try_recv() {
            match mail {
                Mail::Line { segment, line } => {
                    if let Some(WorkerEvent::Success(value)) = WorkerEvent::parse(&line) {
                        self.state.record(segment, value);
                        self.subs
                            .publish(
                                Event::new(EventKind::LateSuccess)
                                    .with_segment(segment)
                                    .with_value(value),
                            )
                            .await;
                        late += 1;
                    }
                }
                Mail::Exited { segment, .. } => {
                    self.state.exited.insert(segment);
                }
            }
        }
        late
    }
}
