//! Guest console forwarding.
//!
//! Console calls made while no run is capturing them (prelude code, timers
//! left over by a script, the host console itself) are buffered inside the
//! script context and forwarded here after each evaluation. They end up in
//! `tracing` with `guest_log = true` so they can be filtered separately.

use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// Console method family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One buffered console call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsoleEntry {
    /// Console method that was called (`log`, `warn`, ...).
    pub method: String,
    pub message: String,
}

impl ConsoleEntry {
    pub fn level(&self) -> ConsoleLevel {
        level_from_method(&self.method)
    }
}

/// Emits guest console output through `tracing`.
pub struct LoggingHost;

impl LoggingHost {
    /// Log a message at the specified level.
    pub fn log(origin: &str, level: ConsoleLevel, message: &str) {
        match level {
            ConsoleLevel::Debug => debug!(origin, guest_log = true, "{}", message),
            ConsoleLevel::Info => info!(origin, guest_log = true, "{}", message),
            ConsoleLevel::Warn => warn!(origin, guest_log = true, "{}", message),
            ConsoleLevel::Error => error!(origin, guest_log = true, "{}", message),
        }
    }

    /// Forward buffered entries. Returns how many were forwarded.
    pub fn forward(origin: &str, entries: impl IntoIterator<Item = ConsoleEntry>) -> usize {
        let mut count = 0;
        for entry in entries {
            Self::log(origin, entry.level(), &entry.message);
            count += 1;
        }
        count
    }
}

/// Map a console method name to its level. `log` and unknown names are
/// treated as info.
pub fn level_from_method(method: &str) -> ConsoleLevel {
    match method {
        "debug" | "trace" => ConsoleLevel::Debug,
        "warn" => ConsoleLevel::Warn,
        "error" => ConsoleLevel::Error,
        _ => ConsoleLevel::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_method() {
        assert_eq!(level_from_method("debug"), ConsoleLevel::Debug);
        assert_eq!(level_from_method("log"), ConsoleLevel::Info);
        assert_eq!(level_from_method("info"), ConsoleLevel::Info);
        assert_eq!(level_from_method("warn"), ConsoleLevel::Warn);
        assert_eq!(level_from_method("error"), ConsoleLevel::Error);
        assert_eq!(level_from_method("table"), ConsoleLevel::Info);
    }

    #[test]
    fn test_entries_deserialize() {
        let entries: Vec<ConsoleEntry> =
            serde_json::from_str(r#"[{"method":"warn","message":"late timer"}]"#).unwrap();

        assert_eq!(entries[0].level(), ConsoleLevel::Warn);
        assert_eq!(LoggingHost::forward("test", entries), 1);
    }
}
