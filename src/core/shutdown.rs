//! # ShutdownManager: stops every still-running worker.
//!
//! ## Sequence
//! ```text
//! registry.request_termination() ─► TerminationRequested (per live worker)
//!   │
//!   ▼
//! join actors, bounded by grace
//!   ├─ all joined ─► AllStoppedWithin
//!   └─ timeout ───► GraceExceeded (stuck = registry.live())
//!                     │
//!                     ├─ force_kill ─► registry.force_kill() ─► WorkerKilled (per id)
//!                     │               join actors, bounded by kill_wait ─► abort the rest
//!                     └─ otherwise ─► detach the rest
//! ```
//!
//! Runs the same way after success, interrupt or exhaustion; with nothing left
//! alive it completes immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time;

use crate::config::Config;
use crate::core::registry::WorkerRegistry;
use crate::error::SearchError;
use crate::events::{Event, EventKind};
use crate::report::ShutdownSummary;
use crate::subscribers::SubscriberSet;

/// Drives the termination of all workers.
pub struct ShutdownManager {
    /// Time granted to workers after the termination request.
    pub grace: Duration,
    /// Kill workers still alive after `grace`.
    pub force_kill: bool,
    /// Time granted to killed workers to be reaped.
    pub kill_wait: Duration,
    /// Worker registry.
    pub registry: Arc<WorkerRegistry>,
    /// Event fan-out.
    pub subs: Arc<SubscriberSet>,
}

impl ShutdownManager {
    /// Creates a manager using the timing knobs of `cfg`.
    pub fn new(cfg: &Config, registry: Arc<WorkerRegistry>, subs: Arc<SubscriberSet>) -> Self {
        Self {
            grace: cfg.grace,
            force_kill: cfg.force_kill,
            kill_wait: cfg.kill_wait,
            registry,
            subs,
        }
    }

    /// Requests termination of every live worker and waits for the actors in `set`.
    pub async fn shutdown(&self, set: &mut JoinSet<usize>) -> ShutdownSummary {
        let requested = self.registry.request_termination().await;
        for &id in &requested {
            self.subs
                .publish(Event::new(EventKind::TerminationRequested).with_segment(id))
                .await;
        }

        if join_within(set, self.grace).await {
            self.subs
                .publish(Event::new(EventKind::AllStoppedWithin).with_grace(self.grace))
                .await;
            return ShutdownSummary {
                requested,
                ..ShutdownSummary::default()
            };
        }

        let stuck = self.registry.live().await;
        let err = SearchError::TerminationTimeout {
            grace: self.grace,
            stuck: stuck.clone(),
        };
        tracing::debug!(label = err.as_label(), %err);
        self.subs
            .publish(
                Event::new(EventKind::GraceExceeded)
                    .with_grace(self.grace)
                    .with_count(stuck.len() as u64)
                    .with_reason(err.to_string()),
            )
            .await;

        if !self.force_kill {
            set.detach_all();
            return ShutdownSummary {
                requested,
                stuck,
                killed: Vec::new(),
            };
        }

        let killed = self.registry.force_kill().await;
        for &id in &killed {
            self.subs
                .publish(Event::new(EventKind::WorkerKilled).with_segment(id))
                .await;
        }
        if !join_within(set, self.kill_wait).await {
            // dropping the process handles kills whatever is left
            set.abort_all();
            while set.join_next().await.is_some() {}
        }

        ShutdownSummary {
            requested,
            stuck,
            killed,
        }
    }
}

/// Joins every task in `set`; returns `false` if `limit` ran out first.
async fn join_within(set: &mut JoinSet<usize>, limit: Duration) -> bool {
    let done = async { while set.join_next().await.is_some() {} };
    time::timeout(limit, done).await.is_ok()
}
