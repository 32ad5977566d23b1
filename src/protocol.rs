//! # Worker output line protocol.
//!
//! Each engine writes one event per line:
//!
//! | Prefix      | Payload               | Meaning                                   |
//! |-------------|-----------------------|-------------------------------------------|
//! | `PROGRESS:` | current scanned value | heartbeat, sampled every K-th occurrence  |
//! | `SUCCESS:`  | qualifying value      | terminal for the worker, stops the search |
//! | (none)      | free text             | informational, logged verbatim            |
//!
//! A tagged line whose payload is not a number is downgraded to [`WorkerEvent::Info`].
//! Blank lines carry no event.

/// Tag of a progress heartbeat line.
pub const PROGRESS_PREFIX: &str = "PROGRESS:";
/// Tag of a success line.
pub const SUCCESS_PREFIX: &str = "SUCCESS:";

/// One classified line of worker output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Heartbeat carrying the value currently being scanned.
    Progress(u64),
    /// A qualifying value was found.
    Success(u64),
    /// Anything else, kept verbatim (without surrounding whitespace).
    Info(String),
}

impl WorkerEvent {
    /// Classifies a raw output line.
    ///
    /// Returns `None` for blank lines.
    ///
    /// # Example
    /// ```
    /// use rangevisor::WorkerEvent;
    ///
    /// assert_eq!(WorkerEvent::parse("SUCCESS:120\n"), Some(WorkerEvent::Success(120)));
    /// assert_eq!(WorkerEvent::parse("PROGRESS: 42"), Some(WorkerEvent::Progress(42)));
    /// assert_eq!(
    ///     WorkerEvent::parse("Checkpoint saved"),
    ///     Some(WorkerEvent::Info("Checkpoint saved".into()))
    /// );
    /// assert_eq!(WorkerEvent::parse("   "), None);
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }
        if let Some(payload) = line.strip_prefix(PROGRESS_PREFIX) {
            if let Ok(value) = payload.trim().parse() {
                return Some(WorkerEvent::Progress(value));
            }
        } else if let Some(payload) = line.strip_prefix(SUCCESS_PREFIX) {
            if let Ok(value) = payload.trim().parse() {
                return Some(WorkerEvent::Success(value));
            }
        }
        Some(WorkerEvent::Info(line.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_lines() {
        assert_eq!(
            WorkerEvent::parse("PROGRESS:1000560284742167"),
            Some(WorkerEvent::Progress(1_000_560_284_742_167))
        );
        assert_eq!(
            WorkerEvent::parse("SUCCESS:180\r\n"),
            Some(WorkerEvent::Success(180))
        );
    }

    #[test]
    fn test_untagged_lines_are_info() {
        assert_eq!(
            WorkerEvent::parse("  Searching from 1 to 2  "),
            Some(WorkerEvent::Info("Searching from 1 to 2".into()))
        );
        // prefix must be at the start of the line
        assert_eq!(
            WorkerEvent::parse("note: SUCCESS:5"),
            Some(WorkerEvent::Info("note: SUCCESS:5".into()))
        );
    }

    #[test]
    fn test_malformed_payload_is_downgraded() {
        assert_eq!(
            WorkerEvent::parse("SUCCESS:abc"),
            Some(WorkerEvent::Info("SUCCESS:abc".into()))
        );
        assert_eq!(
            WorkerEvent::parse("PROGRESS:"),
            Some(WorkerEvent::Info("PROGRESS:".into()))
        );
        assert_eq!(
            WorkerEvent::parse("PROGRESS:-1"),
            Some(WorkerEvent::Info("PROGRESS:-1".into()))
        );
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        assert_eq!(WorkerEvent::parse(""), None);
        assert_eq!(WorkerEvent::parse("\n"), None);
        assert_eq!(WorkerEvent::parse("SUCCESS:1\r"), Some(WorkerEvent::Success(1)));
    }
}
