//! Error types for SSH driver operations.
//!
//! Errors are categorized so callers can distinguish failures that happened
//! while establishing a session (connect, authenticate, reach the desired
//! privilege level) from failures on an already-open session. The caller's
//! failure accounting depends on that split.

use std::time::Duration;
use thiserror::Error;

/// Categories of driver errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// TCP connect, name resolution, or SSH handshake failure
    Connect,
    /// Authentication or privilege escalation rejected
    Auth,
    /// A read deadline expired before the expected prompt appeared
    Timeout,
    /// Channel or process I/O failure on an established session
    Session,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this category means the host was never usable at all.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Connect | Self::Auth)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Connect => "Connection failed",
            Self::Auth => "Authentication failed",
            Self::Timeout => "Timed out",
            Self::Session => "Session error",
            Self::Other => "Unexpected error",
        }
    }
}

/// Errors that can occur while driving an SSH session.
#[derive(Debug, Error)]
pub enum Error {
    /// TCP connect, DNS resolution, or SSH handshake failed
    #[error("connection to {host} failed: {message}")]
    ConnectionFailed {
        /// Host we tried to reach
        host: String,
        /// Detail from the transport layer
        message: String,
    },

    /// The server rejected the supplied credentials
    #[error("authentication failed for {host}: {message}")]
    AuthenticationFailed {
        /// Host that rejected us
        host: String,
        /// Detail from the transport layer
        message: String,
    },

    /// Privilege escalation (enable mode) was rejected or never completed
    #[error("privilege escalation failed: {message}")]
    EnableFailed {
        /// What went wrong during the enable exchange
        message: String,
    },

    /// The expected prompt never appeared within the deadline
    #[error("timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        /// What the driver was waiting to see
        waiting_for: String,
        /// The configured per-operation deadline
        after: Duration,
    },

    /// The remote side closed the session mid-conversation
    #[error("session closed by remote host")]
    ConnectionClosed,

    /// Channel or pipe I/O failed on an open session
    #[error("channel error: {message}")]
    ChannelFailed {
        /// Detail from the transport layer
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ConnectionFailed { .. } => ErrorCategory::Connect,
            Error::AuthenticationFailed { .. } | Error::EnableFailed { .. } => ErrorCategory::Auth,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::ConnectionClosed | Error::ChannelFailed { .. } => ErrorCategory::Session,
            Error::Io(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error means the host was never reached or authenticated.
    pub fn is_connect_failure(&self) -> bool {
        self.category().is_connect_failure()
    }
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_failure_categories() {
        let err = Error::ConnectionFailed {
            host: "sw1".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Connect);
        assert!(err.is_connect_failure());

        let err = Error::AuthenticationFailed {
            host: "sw1".to_string(),
            message: "bad password".to_string(),
        };
        assert!(err.is_connect_failure());
    }

    #[test]
    fn test_session_errors_are_not_connect_failures() {
        let err = Error::ChannelFailed {
            message: "broken pipe".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Session);
        assert!(!err.is_connect_failure());

        let err = Error::Timeout {
            waiting_for: "device prompt".to_string(),
            after: Duration::from_secs(10),
        };
        assert!(!err.is_connect_failure());
    }

    #[test]
    fn test_enable_failure_counts_as_auth() {
        let err = Error::EnableFailed {
            message: "enable password rejected".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert!(err.is_connect_failure());
    }
}
