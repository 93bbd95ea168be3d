//! Wire-level response records.
//!
//! The framer hands the session complete response frames; this module
//! classifies them per RFC 3501: a response is tagged iff its first token
//! is a tag, a continuation iff the line begins with `+`, and untagged
//! otherwise. Untagged responses keep their raw bytes; full payload
//! parsing (FETCH items, LIST attributes, ...) is the response decoder's
//! job, not the session's.

use crate::types::{Capabilities, Status};

/// A classified server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerResponse {
    /// Tagged status response completing a command.
    Tagged(TaggedResponse),
    /// Untagged (`*`) response.
    Untagged(UntaggedResponse),
    /// Continuation request (`+`): the client must send more data.
    Continuation {
        /// Text after the `+`, usually a base64 challenge or a hint.
        text: String,
    },
}

/// A tagged status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedResponse {
    /// The echoed command tag.
    pub tag: String,
    /// Completion status.
    pub status: Status,
    /// Human-readable text, response code included.
    pub text: String,
}

/// An untagged response, classified by keyword but otherwise raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntaggedResponse {
    /// Normalized (upper-cased) keyword: `OK`, `BYE`, `CAPABILITY`,
    /// `EXISTS`, `LIST`, ... For numeric responses (`* 23 EXISTS`) this is
    /// the word after the number.
    pub keyword: String,
    /// The full frame, CRLF and any literals included.
    pub raw: Vec<u8>,
}

impl UntaggedResponse {
    /// The status, if this is a status response (OK/NO/BAD/BYE/PREAUTH).
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        Status::parse(&self.keyword)
    }

    /// Returns true for an untagged BYE.
    #[must_use]
    pub fn is_bye(&self) -> bool {
        self.status() == Some(Status::Bye)
    }

    /// Text of the first line after the keyword (and number, if any).
    #[must_use]
    pub fn text(&self) -> String {
        let line = first_line(&self.raw);
        let line = String::from_utf8_lossy(line);
        let Some(rest) = line.strip_prefix("* ") else {
            return String::new();
        };
        let mut parts = rest.splitn(2, ' ');
        let Some(first) = parts.next() else {
            return String::new();
        };
        let after_first = parts.next().unwrap_or("");
        if first.bytes().all(|b| b.is_ascii_digit()) {
            // Numeric response: skip the number, then the keyword.
            after_first
                .splitn(2, ' ')
                .nth(1)
                .unwrap_or("")
                .to_string()
        } else {
            after_first.to_string()
        }
    }

    /// Extracts a capability set from this response, if it carries one:
    /// either a `* CAPABILITY ...` line or an `OK`/`PREAUTH` with a
    /// `[CAPABILITY ...]` response code.
    #[must_use]
    pub fn capabilities(&self) -> Option<Capabilities> {
        if self.keyword == "CAPABILITY" {
            let line = first_line(&self.raw);
            let line = String::from_utf8_lossy(line);
            let rest = line.strip_prefix("* ")?;
            let tokens: Vec<&str> = rest.split_whitespace().skip(1).collect();
            return Some(Capabilities::from_tokens(tokens));
        }
        if self.status().is_some() {
            return capability_code(&self.text());
        }
        None
    }
}

impl ServerResponse {
    /// Classifies one complete response frame.
    ///
    /// Returns `None` for a frame that fits none of the three shapes,
    /// which the session treats as a protocol violation.
    #[must_use]
    pub fn parse(frame: &[u8]) -> Option<Self> {
        let line = String::from_utf8_lossy(first_line(frame));

        if let Some(rest) = line.strip_prefix('+') {
            return Some(Self::Continuation {
                text: rest.trim_start().trim_end().to_string(),
            });
        }

        if let Some(rest) = line.strip_prefix("* ") {
            let mut parts = rest.split_whitespace();
            let first = parts.next()?;
            let keyword = if first.bytes().all(|b| b.is_ascii_digit()) {
                parts.next()?.to_ascii_uppercase()
            } else {
                first.to_ascii_uppercase()
            };
            return Some(Self::Untagged(UntaggedResponse {
                keyword,
                raw: frame.to_vec(),
            }));
        }

        let mut parts = line.splitn(3, ' ');
        let tag = parts.next()?;
        if tag.is_empty() {
            return None;
        }
        let status = Status::parse(parts.next()?)?;
        let text = parts.next().unwrap_or("").trim_end().to_string();
        Some(Self::Tagged(TaggedResponse {
            tag: tag.to_string(),
            status,
            text,
        }))
    }
}

/// Extracts the tokens of a leading `[CAPABILITY ...]` response code.
#[must_use]
pub fn capability_code(text: &str) -> Option<Capabilities> {
    let inner = text.strip_prefix('[')?;
    let (code, _) = inner.split_once(']')?;
    let mut tokens = code.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("CAPABILITY") {
        return None;
    }
    Some(Capabilities::from_tokens(tokens))
}

fn first_line(frame: &[u8]) -> &[u8] {
    let end = frame
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(frame.len());
    &frame[..end]
}
