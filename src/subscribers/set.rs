//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`] to every subscriber **without
//! awaiting** their processing, so neither worker actors nor the coordinator loop
//! ever wait on logging.
//!
//! ## What it guarantees
//! - [`SubscriberSet::emit`] returns immediately; a full queue drops the event.
//! - [`SubscriberSet::publish`] waits for queue space; nothing is dropped.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and logged (isolation).
//! - After [`SubscriberSet::shutdown`] returns, every queued event was handled.
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - `emit` does not retry on per-subscriber queue overflow (the event is dropped
//!   for that subscriber). Only sampled progress goes through `emit`.
//!
//! ## Diagram
//! ```text
//!    emit(Event) / publish(Event).await
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Event;

use super::Subscribe;

/// Per-subscriber channel with metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Mutex<Vec<SubscriberChannel>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime. Minimum queue capacity is 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let name = sub.name();
            let s = Arc::clone(&sub);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = s.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let any = &*panic_err;
                        let info = if let Some(msg) = any.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = any.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        tracing::error!(subscriber = s.name(), %info, "subscriber panicked");
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels: Mutex::new(channels),
            workers: Mutex::new(workers),
        }
    }

    /// Creates a set without subscribers (events are discarded).
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Emits an event to all subscribers.
    ///
    /// Uses `try_send`: a full or closed queue drops the event for that subscriber only.
    pub fn emit(&self, event: Event) {
        let event = Arc::new(event);
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);

        for channel in channels.iter() {
            match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber = channel.name,
                        kind = ?event.kind,
                        "subscriber queue full, event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(
                        subscriber = channel.name,
                        kind = ?event.kind,
                        "subscriber queue closed, event dropped"
                    );
                }
            }
        }
    }

    /// Delivers an event to all subscribers, waiting for queue space.
    ///
    /// Used for every notice that must not be lost. A slow subscriber slows the
    /// caller down instead of losing events.
    pub async fn publish(&self, event: Event) {
        let event = Arc::new(event);
        let senders: Vec<(&'static str, mpsc::Sender<Arc<Event>>)> = {
            let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
            channels
                .iter()
                .map(|c| (c.name, c.sender.clone()))
                .collect()
        };

        for (name, sender) in senders {
            if sender.send(Arc::clone(&event)).await.is_err() {
                tracing::warn!(
                    subscriber = name,
                    kind = ?event.kind,
                    "subscriber queue closed, event dropped"
                );
            }
        }
    }

    /// Closes all queues and waits until every worker has drained its backlog.
    ///
    /// Events emitted afterwards are silently discarded. Calling it twice is a no-op.
    pub async fn shutdown(&self) {
        let channels = {
            let mut guard = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        drop(channels);

        let workers = {
            let mut guard = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        for h in workers {
            let _ = h.await;
        }
    }
}
