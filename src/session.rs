//! Server session state and the application the server keeps warm.
//!
//! The session is built once at start-up and passed by reference into the bootstrap and
//! the listener loop, so both can be driven from tests with a mock application.

use std::time::{Duration, Instant};

/// Bound on servicing a single accepted connection.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Default lifetime of a non-daemon cache.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(60);

/// The expensive, stateful part of the tool. Both calls return `should_exit`.
pub trait Application {
    /// Runs the foreground invocation the server process was started with.
    fn execute_once(&mut self) -> bool;

    /// Runs a forwarded invocation against the warm state.
    fn handle_request(&mut self, args: Vec<String>, autotype_suppressed: bool) -> bool;
}

/// How the bootstrap runs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Execute once and exit; never listen.
    Direct,
    /// Execute once, then listen until the cache times out.
    Cached,
    /// Listen immediately and never time out.
    Daemon,
}

#[derive(Debug, Clone)]
pub struct ServerSession {
    pub daemon: bool,
    pub no_cache: bool,
    pub cache_timeout: Duration,
    pub cache_start: Instant,
    pub request_timeout: Duration,
}

impl ServerSession {
    /// Starts the cache clock now.
    pub fn new(daemon: bool, no_cache: bool, cache_timeout: Duration) -> Self {
        Self {
            daemon,
            no_cache,
            cache_timeout,
            cache_start: Instant::now(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn mode(&self) -> Mode {
        match (self.no_cache, self.daemon) {
            (true, _) => Mode::Direct,
            (false, false) => Mode::Cached,
            (false, true) => Mode::Daemon,
        }
    }

    /// Time left before the cache expires, or `None` for a daemon.
    pub fn remaining_cache_time(&self) -> Option<Duration> {
        if self.daemon {
            return None;
        }
        Some(self.cache_timeout.saturating_sub(self.cache_start.elapsed()))
    }

    /// Whether a dispatch result ends the listener loop. Daemons ignore it.
    pub fn should_stop(&self, should_exit: bool) -> bool {
        should_exit && !self.daemon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_decision_table() {
        let timeout = DEFAULT_CACHE_TIMEOUT;
        assert_eq!(ServerSession::new(false, true, timeout).mode(), Mode::Direct);
        assert_eq!(ServerSession::new(true, true, timeout).mode(), Mode::Direct);
        assert_eq!(ServerSession::new(false, false, timeout).mode(), Mode::Cached);
        assert_eq!(ServerSession::new(true, false, timeout).mode(), Mode::Daemon);
    }

    #[test]
    fn test_daemon_has_no_deadline() {
        let session = ServerSession::new(true, false, Duration::from_secs(1));
        assert_eq!(session.remaining_cache_time(), None);
    }

    #[test]
    fn test_remaining_cache_time_counts_down() {
        let session = ServerSession::new(false, false, Duration::from_secs(60));
        let remaining = session.remaining_cache_time().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(50));
    }

    #[test]
    fn test_remaining_cache_time_saturates_at_zero() {
        let mut session = ServerSession::new(false, false, Duration::from_secs(1));
        session.cache_start = Instant::now() - Duration::from_secs(5);
        assert_eq!(session.remaining_cache_time(), Some(Duration::ZERO));
    }

    #[test]
    fn test_should_stop_only_outside_daemon_mode() {
        let cached = ServerSession::new(false, false, DEFAULT_CACHE_TIMEOUT);
        let daemon = ServerSession::new(true, false, DEFAULT_CACHE_TIMEOUT);

        assert!(cached.should_stop(true));
        assert!(!cached.should_stop(false));
        assert!(!daemon.should_stop(true));
        assert!(!daemon.should_stop(false));
    }

    #[test]
    fn test_request_timeout_defaults_to_three_seconds() {
        let session = ServerSession::new(false, false, DEFAULT_CACHE_TIMEOUT);
        assert_eq!(session.request_timeout, Duration::from_secs(3));

        let session = session.with_request_timeout(Duration::from_millis(50));
        assert_eq!(session.request_timeout, Duration::from_millis(50));
    }
}
