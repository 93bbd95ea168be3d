//! IMAP request model.
//!
//! Every command the session can carry implements [`ImapRequest`]: it
//! serializes its initial line, optionally participates in `+`
//! continuation rounds, optionally supports mid-stream termination (IDLE's
//! DONE), and reports whether its most recent frame carried a secret so
//! the session can redact debug output.

mod auth;
mod idle;
mod serialize;
mod simple;
mod tag_generator;

pub use auth::{AuthOauthBearerCommand, AuthPlainCommand, AuthXoauth2Command};
pub use idle::IdleCommand;
pub use simple::{Command, StatusItem};
pub use tag_generator::TagGenerator;

use tokio::sync::mpsc::UnboundedSender;

use crate::response::UntaggedResponse;
use crate::{Error, Result};

/// Command discriminator, used for dispatch and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,
    /// LOGIN command.
    Login,
    /// AUTHENTICATE PLAIN command.
    AuthPlain,
    /// AUTHENTICATE XOAUTH2 command.
    AuthXoauth2,
    /// AUTHENTICATE OAUTHBEARER command.
    AuthOauthBearer,
    /// SELECT command.
    Select,
    /// EXAMINE command.
    Examine,
    /// CREATE command.
    Create,
    /// DELETE command.
    Delete,
    /// RENAME command.
    Rename,
    /// SUBSCRIBE command.
    Subscribe,
    /// UNSUBSCRIBE command.
    Unsubscribe,
    /// LIST command.
    List,
    /// NAMESPACE command.
    Namespace,
    /// STATUS command.
    Status,
    /// COMPRESS DEFLATE command.
    Compress,
    /// IDLE command.
    Idle,
}

impl CommandKind {
    /// The wire name of the command.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Login => "LOGIN",
            Self::AuthPlain => "AUTHENTICATE PLAIN",
            Self::AuthXoauth2 => "AUTHENTICATE XOAUTH2",
            Self::AuthOauthBearer => "AUTHENTICATE OAUTHBEARER",
            Self::Select => "SELECT",
            Self::Examine => "EXAMINE",
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
            Self::Rename => "RENAME",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::List => "LIST",
            Self::Namespace => "NAMESPACE",
            Self::Status => "STATUS",
            Self::Compress => "COMPRESS",
            Self::Idle => "IDLE",
        }
    }

    /// Whether a successful completion invalidates the capability set
    /// (RFC 3501 section 6.2: capabilities can change after
    /// authentication).
    #[must_use]
    pub const fn refreshes_capabilities(self) -> bool {
        matches!(
            self,
            Self::Login | Self::AuthPlain | Self::AuthXoauth2 | Self::AuthOauthBearer
        )
    }
}

/// A single IMAP command, from serialization through completion.
///
/// The session owns the request for its whole lifetime and drives every
/// method from its I/O task. The ordering contract: [`initial_line`]
/// exactly once, then zero or more [`continuation`] rounds, then
/// [`cleanup`] after the completion future fires, on success and failure
/// alike.
///
/// [`initial_line`]: Self::initial_line
/// [`continuation`]: Self::continuation
/// [`cleanup`]: Self::cleanup
pub trait ImapRequest: Send {
    /// The command discriminator.
    fn kind(&self) -> CommandKind;

    /// Serializes the initial command line, CRLF included. The line must
    /// not contain the tag; tagging is the session's job. Called at most
    /// once per request.
    fn initial_line(&mut self) -> Vec<u8>;

    /// Produces the next client line in response to a `+` continuation.
    ///
    /// `Ok(Some(bytes))` is written to the transport verbatim; `Ok(None)`
    /// means the continuation needs no client data (IDLE's `+ idling`).
    ///
    /// # Errors
    ///
    /// The default fails with [`Error::Unsupported`]: most commands have no
    /// multi-round protocol.
    fn continuation(&mut self, server_text: &[u8]) -> Result<Option<Vec<u8>>> {
        let _ = server_text;
        Err(Error::Unsupported(self.kind()))
    }

    /// The frame that ends a mid-stream command (`DONE` for IDLE).
    ///
    /// # Errors
    ///
    /// The default fails with [`Error::Unsupported`]: most commands cannot
    /// be terminated mid-stream.
    fn terminator(&mut self) -> Result<Vec<u8>> {
        Err(Error::Unsupported(self.kind()))
    }

    /// Queue for untagged responses the caller wants to observe live.
    /// `None` (the default) accumulates them into the command's result.
    fn streaming_queue(&self) -> Option<UnboundedSender<UntaggedResponse>> {
        None
    }

    /// Whether an untagged response with this keyword belongs on the
    /// streaming queue rather than the result buffer.
    fn streams(&self, keyword: &str) -> bool {
        let _ = keyword;
        false
    }

    /// True while the most recently emitted frame carried a secret. The
    /// session re-reads this after every frame and never lets sensitive
    /// bytes reach a debug sink.
    fn is_sensitive(&self) -> bool {
        false
    }

    /// Redaction-safe label logged in place of sensitive frames.
    fn debug_label(&self) -> String {
        self.kind().name().to_string()
    }

    /// Clears owned secret material. Idempotent; the session calls it on
    /// every completion path.
    fn cleanup(&mut self) {}
}
