//! # Event subscribers for the search runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Supervisor / WorkerActor / Coordinator / ShutdownManager
//!        │ emit(Event)
//!        ▼
//!   SubscriberSet ──► [queue] ──► LogWriter::on_event()  ──► tracing
//!                 └─► [queue] ──► custom::on_event()
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::Subscribe;
    use crate::events::{Event, EventKind};

    /// Keeps every event it receives.
    #[derive(Default)]
    pub(crate) struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        pub(crate) fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, kind: EventKind) -> usize {
            self.events.lock().unwrap().iter().filter(|e| e.kind == kind).count()
        }

        pub(crate) fn of(&self, kind: EventKind) -> Vec<Event> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.kind == kind)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn queue_capacity(&self) -> usize {
            1 << 16
        }
    }
}
