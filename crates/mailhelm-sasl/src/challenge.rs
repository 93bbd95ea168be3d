//! Server failure-challenge decoding.
//!
//! Bearer-token mechanisms report failure with a second `+` continuation
//! whose payload is a base64-encoded JSON document:
//! `{"status":"400","schemes":"Bearer","scope":"https://mail.google.com/"}`

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use crate::Result;

/// A decoded failure challenge.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerChallenge {
    /// HTTP status code as a string.
    pub status: String,
    /// Authentication schemes the server accepts.
    pub schemes: Option<String>,
    /// OAuth scope required.
    pub scope: Option<String>,
}

/// Decodes a base64 failure challenge into its JSON text.
///
/// # Errors
///
/// Returns an error if the payload is not valid base64 or not UTF-8.
pub fn decode_challenge_text(payload: &[u8]) -> Result<String> {
    let raw = STANDARD.decode(payload)?;
    Ok(String::from_utf8(raw)?)
}

/// Decodes a base64 failure challenge into a [`ServerChallenge`].
///
/// # Errors
///
/// Returns an error if the payload is not valid base64, not UTF-8, or not
/// the expected JSON document.
pub fn decode_challenge(payload: &[u8]) -> Result<ServerChallenge> {
    let text = decode_challenge_text(payload)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOGLE_CHALLENGE: &[u8] = b"eyJzdGF0dXMiOiI0MDAiLCJzY2hlbWVzIjoiQmVhcmVyIiwic2NvcGUiOiJodHRwczovL21haWwuZ29vZ2xlLmNvbS8ifQ==";

    #[test]
    fn decodes_text() {
        let text = decode_challenge_text(GOOGLE_CHALLENGE).unwrap();
        assert_eq!(
            text,
            r#"{"status":"400","schemes":"Bearer","scope":"https://mail.google.com/"}"#
        );
    }

    #[test]
    fn decodes_fields() {
        let challenge = decode_challenge(GOOGLE_CHALLENGE).unwrap();
        assert_eq!(challenge.status, "400");
        assert_eq!(challenge.schemes.as_deref(), Some("Bearer"));
        assert_eq!(challenge.scope.as_deref(), Some("https://mail.google.com/"));
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(decode_challenge_text(b"not base64!").is_err());
    }

    #[test]
    fn rejects_non_json() {
        let payload = STANDARD.encode("plain text");
        assert!(decode_challenge(payload.as_bytes()).is_err());
    }
}
