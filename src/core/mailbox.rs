//! Fan-in mailbox between worker readers and the coordinator.
//!
//! Every reader and worker actor holds a clone of one unbounded sender; the
//! coordinator owns the only receiver. Unbounded capacity means a slow coordinator
//! never stalls an engine on a full pipe. Each stream has exactly one producer, so
//! lines of one worker arrive in emission order.

use tokio::sync::mpsc;

use crate::core::registry::WorkerExit;

/// Item delivered to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mail {
    /// One raw output line of a worker (without the trailing newline).
    Line {
        /// Segment that produced the line.
        segment: usize,
        /// Line text.
        line: String,
    },
    /// A worker has exited; all of its lines were delivered before this.
    Exited {
        /// Segment whose worker exited.
        segment: usize,
        /// How it ended.
        exit: WorkerExit,
    },
}

/// Producer side, cloned into every reader and worker actor.
pub type MailSender = mpsc::UnboundedSender<Mail>;
/// Consumer side, owned by the coordinator.
pub type MailReceiver = mpsc::UnboundedReceiver<Mail>;

/// Creates a new mailbox.
pub fn mailbox() -> (MailSender, MailReceiver) {
    mpsc::unbounded_channel()
}
