//! Error types for the IMAP session engine.

use std::time::Duration;

use thiserror::Error;

use crate::command::CommandKind;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// The command has no multi-round or mid-stream-terminable protocol.
    #[error("operation not supported for {}", .0.name())]
    Unsupported(CommandKind),

    /// Another command occupies the pending slot.
    #[error("a command is already in progress")]
    CommandInProgress,

    /// The server greeting was not an untagged OK.
    #[error("connection failed, greeting was not OK: {0}")]
    GreetingNotOk(String),

    /// The transport failed before the session was established.
    #[error("connection failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// No greeting arrived within the read-idle limit.
    #[error("connection failed, no greeting within {0:?}")]
    GreetingTimeout(Duration),

    /// The channel closed, or the session is no longer accepting commands.
    #[error("connection inactive")]
    ConnectionInactive,

    /// Server returned NO (operational failure).
    #[error("server returned NO: {0}")]
    No(String),

    /// Server returned BAD (protocol/syntax failure).
    #[error("server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE outside of LOGOUT.
    #[error("unexpected BYE from server: {0}")]
    Bye(String),

    /// Malformed or out-of-sequence server response. Terminal for the
    /// session.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// No bytes arrived within the configured read-idle limit.
    #[error("no server data within {0:?}")]
    ReadIdleExceeded(Duration),

    /// The command future was cancelled before completion.
    #[error("command cancelled")]
    Cancelled,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
