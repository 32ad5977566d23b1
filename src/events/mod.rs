//! Runtime events: the notices the search publishes to subscribers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (planned segments), worker actors (spawn, pin, exit),
//!   `Coordinator` (progress, success, info, interrupt), `ShutdownManager`
//!   (termination, grace outcome, forced kills).
//! - **Consumers**: every [`Subscribe`](crate::Subscribe) registered in the
//!   [`SubscriberSet`](crate::SubscriberSet).

mod event;

pub use event::{Event, EventKind};
