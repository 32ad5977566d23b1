//! # rangevisor
//!
//! **Rangevisor** runs an exhaustive numeric search in parallel by splitting a
//! range into overlapping segments and supervising one external engine process
//! per segment.
//!
//! Engines report over stdout with a line protocol (`PROGRESS:<n>`,
//! `SUCCESS:<n>`, anything else is informational). The first success stops the
//! search; every other worker is asked to terminate, and the smallest value
//! reported by any worker is the answer.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     Config ──► partition() ──► [Segment 0] [Segment 1] ... [Segment N-1]
//!                                     │           │               │
//! ┌───────────────────────────────────▼───────────▼───────────────▼─────┐
//! │  Supervisor                                                         │
//! │  - WorkerRegistry (state + termination tokens per segment)          │
//! │  - SubscriberSet (fans events out to subscribers)                   │
//! │  - JoinSet<WorkerActor::run>                                        │
//! └──────┬──────────────────┬──────────────────┬────────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ WorkerActor  │   │ WorkerActor  │   │ WorkerActor  │
//!     │ engine proc  │   │ engine proc  │   │ engine proc  │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ stdout+stderr    │                  │
//!      │ reader task      │                  │
//!      ▼                  ▼                  ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                mailbox (unbounded mpsc, single consumer)            │
//! └─────────────────────────────────┬───────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │      Coordinator       │
//!                       │  parse ─► throttle ─►  │
//!                       │  stop on first success │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                 ShutdownManager ─► drain ─► SearchReport
//! ```
//!
//! ### Partitioning
//! ```text
//! total:     [S ─────────────────────────────────────────── E]
//! cores:     [S ──── c0 ────][──── c1 ────][──── c2 (+rest) ─E]
//! extended:  [S ──── c0 ──+m]
//!                       [-m+ ──── c1 ──+m]
//!                                    [-m+ ──── c2 ──────────E]
//! ```
//! Cores tile the range exactly; margins are clipped to the total bounds.
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                 |
//! |-------------------|----------------------------------------------------------|------------------------------------|
//! | **Partitioning**  | Split a range into cores with clipped overlap margins.   | [`partition`], [`Segment`]         |
//! | **Protocol**      | Classify engine output lines.                            | [`WorkerEvent`]                    |
//! | **Supervision**   | Launch, pin, stop and reap engine processes.             | [`Supervisor`], [`WorkerRegistry`] |
//! | **Subscriber API**| Observe the run (logging or custom subscribers).         | [`Subscribe`], [`LogWriter`]       |
//! | **Errors**        | Typed errors with stable labels.                         | [`SearchError`]                    |
//! | **Configuration** | All settings fixed at startup.                           | [`Config`]                         |
//!
//! ## Example
//! ```rust
//! use rangevisor::{WorkerEvent, partition};
//! use std::path::Path;
//!
//! let segs = partition(100, 200, 2, 5, Path::new("/tmp")).unwrap();
//! assert_eq!((segs[0].extended_start, segs[0].extended_end), (100, 154));
//! assert_eq!((segs[1].extended_start, segs[1].extended_end), (145, 200));
//!
//! assert_eq!(WorkerEvent::parse("SUCCESS:180"), Some(WorkerEvent::Success(180)));
//! ```
mod config;
mod core;
mod error;
mod events;
mod partition;
mod protocol;
mod report;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::{
    Coordinator, EngineCommand, EngineProcess, Mail, MailReceiver, MailSender, OutputStream,
    SearchState, ShutdownManager, Supervisor, WorkerExit, WorkerRegistry, WorkerState,
    WorkerTokens, mailbox, wait_for_interrupt,
};
pub use error::SearchError;
pub use events::{Event, EventKind};
pub use partition::{Segment, checkpoint_file, partition, partition_config};
pub use protocol::{PROGRESS_PREFIX, SUCCESS_PREFIX, WorkerEvent};
pub use report::{SearchReport, ShutdownSummary, StopReason};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
