//! # mailhelm-imap
//!
//! An asynchronous IMAP client session engine implementing RFC 3501
//! (`IMAP4rev1`): request construction and session orchestration for a
//! single authenticated IMAP conversation over a full-duplex byte stream.
//!
//! ## Features
//!
//! - **Request model**: every command implements [`ImapRequest`]:
//!   serialization, `+` continuation rounds, mid-stream termination
//!   (IDLE's DONE), secret redaction, and cleanup
//! - **SASL authentication**: AUTHENTICATE PLAIN, XOAUTH2, and
//!   OAUTHBEARER with SASL-IR (RFC 4959) and failure-challenge abort
//! - **Session state machine**: strict one-command-at-a-time tagging,
//!   response demultiplexing, automatic capability refresh after
//!   authentication, read-idle enforcement
//! - **IDLE support**: real-time push notifications via RFC 2177, with a
//!   live streaming queue
//! - **COMPRESS=DEFLATE**: RFC 4978 transport stages spliced in atomically
//! - **TLS via rustls**: secure connections without OpenSSL
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailhelm_imap::{SessionConfig, connect_tls};
//!
//! #[tokio::main]
//! async fn main() -> mailhelm_imap::Result<()> {
//!     let (session, greeting) =
//!         connect_tls("imap.example.com", 993, SessionConfig::new(1)).await?;
//!     println!("connected: {}", greeting.text);
//!
//!     session.login("user@example.com", "password").await?;
//!
//!     let folders = session.list("", "*").await?;
//!     for response in &folders.untagged {
//!         println!("{}", String::from_utf8_lossy(&response.raw));
//!     }
//!
//!     // Real-time updates until something happens.
//!     let mut idle = session.idle()?;
//!     if let Some(event) = idle.recv().await {
//!         println!("mailbox changed: {}", event.keyword);
//!     }
//!     idle.done().await?;
//!
//!     session.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: the request model and the command families
//! - [`connection`]: transports, framing, compression, establishment
//! - [`response`]: wire-level response records the session consumes
//! - [`session`]: the per-connection state machine
//! - [`types`]: capabilities, mailbox names, modified UTF-7

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod connection;
mod error;
mod future;
pub mod response;
pub mod session;
pub mod types;

pub use command::{
    AuthOauthBearerCommand, AuthPlainCommand, AuthXoauth2Command, Command, CommandKind,
    IdleCommand, ImapRequest, StatusItem, TagGenerator,
};
pub use config::{DebugMode, SessionConfig};
pub use connection::{
    DeflateStream, FramedStream, Greeting, ImapStream, connect_plain, connect_tls, establish,
};
pub use error::{Error, Result};
pub use future::{CommandFuture, Completion};
pub use response::{ServerResponse, TaggedResponse, UntaggedResponse};
pub use session::{CommandResponse, IdleHandle, Session};
pub use types::{Capabilities, Mailbox, Status};

/// IMAP protocol version supported.
pub const IMAP_VERSION: &str = "IMAP4rev1";
