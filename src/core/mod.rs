//! Runtime core: worker processes, the coordinator loop and shutdown.
//!
//! The main entry point is [`Supervisor`], which partitions the range, launches
//! one worker per segment and stops them once the search is decided.
//!
//! Internal modules:
//! - [`supervisor`]: plans segments, spawns actors, assembles the report;
//! - [`worker`]: supervises one engine process;
//! - [`engine`]: builds the engine command line and sends termination signals;
//! - [`reader`]: drains a process output stream into the mailbox;
//! - [`mailbox`]: fan-in channel from readers and actors to the coordinator;
//! - [`coordinator`]: consumes worker output and decides when to stop;
//! - [`shutdown`]: terminates, then kills, the workers still alive;
//! - [`registry`]: per-worker state and termination tokens;
//! - [`affinity`]: CPU pinning;
//! - [`signals`]: OS interrupt handling.

mod affinity;
mod coordinator;
mod engine;
mod mailbox;
mod reader;
mod registry;
mod shutdown;
mod signals;
mod supervisor;
mod worker;

pub use coordinator::{Coordinator, SearchState};
pub use engine::{EngineCommand, EngineProcess, OutputStream};
pub use mailbox::{Mail, MailReceiver, MailSender, mailbox};
pub use registry::{WorkerExit, WorkerRegistry, WorkerState, WorkerTokens};
pub use shutdown::ShutdownManager;
pub use signals::wait_for_interrupt;
pub use supervisor::Supervisor;
