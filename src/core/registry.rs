//! # Worker registry - owned record of every segment's worker.
//!
//! The registry is created per run and shared (`Arc`) between the worker actors,
//! which update their own slot, and the shutdown manager, which reads it to find
//! the workers that still need a termination request.
//!
//! ## Architecture
//! ```text
//! Supervisor ── register(id) ──► Slot { Starting, terminate, kill }
//! WorkerActor ── mark_running(id) / mark_exited(id, exit)
//! ShutdownManager ── request_termination() ─► cancels `terminate` once per live slot
//!                 └─ force_kill()          ─► cancels `kill` once per live slot
//! ```
//!
//! ## Rules
//! - Slots are inserted during startup only; they are never removed.
//! - Only the owning actor changes a slot's [`WorkerState`].
//! - A termination (or kill) request is issued at most once per worker.

use std::collections::BTreeMap;
use std::process::ExitStatus;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Process exited with a status code.
    Code(i32),
    /// Process was terminated by a signal.
    Signaled,
    /// Process could not be launched.
    SpawnFailed,
    /// Termination was requested before the process was launched.
    Cancelled,
    /// Waiting on the process failed; its status is unknown.
    Unknown,
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => WorkerExit::Code(code),
            None => WorkerExit::Signaled,
        }
    }
}

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Registered; the process has not been launched yet.
    Starting,
    /// Process is running.
    Running,
    /// Process is gone (or never started).
    Exited(WorkerExit),
}

impl WorkerState {
    /// Returns `true` once the worker has exited.
    #[inline]
    pub fn is_exited(&self) -> bool {
        matches!(self, WorkerState::Exited(_))
    }
}

/// Cancellation handles given to a worker actor.
#[derive(Clone, Debug)]
pub struct WorkerTokens {
    /// Cancelled when the worker should terminate gracefully.
    pub terminate: CancellationToken,
    /// Cancelled when the worker must be killed.
    pub kill: CancellationToken,
}

struct Slot {
    state: WorkerState,
    tokens: WorkerTokens,
    termination_requested: bool,
    kill_requested: bool,
}

/// Registry of the workers of one run, keyed by segment id.
pub struct WorkerRegistry {
    slots: RwLock<BTreeMap<usize, Slot>>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slots: RwLock::new(BTreeMap::new()),
        })
    }

    /// Adds a slot for `id` in the `Starting` state and returns its tokens.
    ///
    /// Registering an id twice returns the tokens of the existing slot.
    pub async fn register(&self, id: usize) -> WorkerTokens {
        let mut slots = self.slots.write().await;
        slots
            .entry(id)
            .or_insert_with(|| Slot {
                state: WorkerState::Starting,
                tokens: WorkerTokens {
                    terminate: CancellationToken::new(),
                    kill: CancellationToken::new(),
                },
                termination_requested: false,
                kill_requested: false,
            })
            .tokens
            .clone()
    }

    /// Records that the worker's process is running.
    pub async fn mark_running(&self, id: usize) {
        if let Some(slot) = self.slots.write().await.get_mut(&id) {
            slot.state = WorkerState::Running;
        }
    }

    /// Records that the worker has exited.
    pub async fn mark_exited(&self, id: usize, exit: WorkerExit) {
        if let Some(slot) = self.slots.write().await.get_mut(&id) {
            slot.state = WorkerState::Exited(exit);
        }
    }

    /// Returns the state of a worker.
    pub async fn state(&self, id: usize) -> Option<WorkerState> {
        self.slots.read().await.get(&id).map(|s| s.state)
    }

    /// Returns `(id, state)` for every worker, ordered by id.
    pub async fn snapshot(&self) -> Vec<(usize, WorkerState)> {
        self.slots
            .read()
            .await
            .iter()
            .map(|(id, s)| (*id, s.state))
            .collect()
    }

    /// Returns the ids of workers that have not exited.
    pub async fn live(&self) -> Vec<usize> {
        self.slots
            .read()
            .await
            .iter()
            .filter(|(_, s)| !s.state.is_exited())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Requests graceful termination of every live worker not asked before.
    ///
    /// Returns the ids that received a request in this call.
    pub async fn request_termination(&self) -> Vec<usize> {
        let mut slots = self.slots.write().await;
        let mut requested = Vec::new();
        for (id, slot) in slots.iter_mut() {
            if slot.state.is_exited() || slot.termination_requested {
                continue;
            }
            slot.termination_requested = true;
            slot.tokens.terminate.cancel();
            requested.push(*id);
        }
        requested
    }

    /// Requests a forced kill of every live worker not killed before.
    ///
    /// Returns the ids that received a kill request in this call.
    pub async fn force_kill(&self) -> Vec<usize> {
        let mut slots = self.slots.write().await;
        let mut killed = Vec::new();
        for (id, slot) in slots.iter_mut() {
            if slot.state.is_exited() || slot.kill_requested {
                continue;
            }
            slot.kill_requested = true;
            slot.tokens.terminate.cancel();
            slot.tokens.kill.cancel();
            killed.push(*id);
        }
        killed
    }
}
