//! # mailhelm-sasl
//!
//! SASL payload construction and server-challenge decoding for IMAP
//! authentication.
//!
//! ## Mechanisms
//!
//! - **PLAIN** (RFC 4616): NUL-joined `authzid`/`authcid`/`password`
//! - **XOAUTH2** (Google/Microsoft proprietary): `user=` / `auth=Bearer` pairs
//! - **OAUTHBEARER** (RFC 7628): GS2 header plus `host=`, `port=`, and
//!   `auth=Bearer` key/value pairs
//!
//! All payloads are returned already base64-encoded (standard alphabet, as
//! required on the IMAP wire) and ready to be placed on an `AUTHENTICATE`
//! line or sent in response to a `+` continuation.
//!
//! ## Quick Start
//!
//! ```
//! use mailhelm_sasl::{oauthbearer_response, xoauth2_response};
//!
//! // OAUTHBEARER (RFC 7628 standard)
//! let line = oauthbearer_response("user@gmail.com", "imap.gmail.com", 993, "ya29.token");
//! // Send: AUTHENTICATE OAUTHBEARER {line}
//!
//! // XOAUTH2 (Google/Microsoft proprietary)
//! let line = xoauth2_response("user@gmail.com", "ya29.token");
//! // Send: AUTHENTICATE XOAUTH2 {line}
//! ```
//!
//! ## Failure challenges
//!
//! When bearer-token authentication fails, the server answers the client
//! response with another `+` continuation carrying a base64-encoded JSON
//! document. [`decode_challenge`] turns it back into a [`ServerChallenge`];
//! the client is then expected to send the SASL abort line
//! ([`ABORT_LINE`]) and await the tagged NO.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod challenge;
mod error;
mod mechanism;

pub use challenge::{ServerChallenge, decode_challenge, decode_challenge_text};
pub use error::{Error, Result};
pub use mechanism::{ABORT_LINE, oauthbearer_response, plain_response, xoauth2_response};
