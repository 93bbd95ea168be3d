//! Per-session configuration.

use std::time::Duration;

/// Debug logging mode for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugMode {
    /// No command logging.
    #[default]
    Off,
    /// Log outbound frames at DEBUG; frames whose request reports
    /// sensitive are replaced with the request's redaction-safe label.
    Redacted,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Debug logging mode.
    pub debug: DebugMode,
    /// Fail the pending command if no bytes arrive within this limit.
    /// Also bounds the wait for the server greeting during connect.
    pub read_idle_timeout: Duration,
    /// Numeric id carried in the session's tracing span for log
    /// correlation.
    pub session_id: u64,
}

impl SessionConfig {
    /// Creates a configuration with defaults: debug off, five-minute
    /// read-idle limit.
    #[must_use]
    pub const fn new(session_id: u64) -> Self {
        Self {
            debug: DebugMode::Off,
            read_idle_timeout: Duration::from_secs(5 * 60),
            session_id,
        }
    }

    /// Sets the debug mode.
    #[must_use]
    pub const fn debug(mut self, mode: DebugMode) -> Self {
        self.debug = mode;
        self
    }

    /// Sets the read-idle limit.
    #[must_use]
    pub const fn read_idle_timeout(mut self, limit: Duration) -> Self {
        self.read_idle_timeout = limit;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
