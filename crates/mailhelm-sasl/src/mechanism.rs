//! SASL client-response construction.
//!
//! Implements the client-response payloads for PLAIN (RFC 4616), XOAUTH2
//! (Google/Microsoft proprietary), and OAUTHBEARER (RFC 7628).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// The SASL abort line (RFC 3501 section 6.2.2).
///
/// Sent on its own line when the client gives up on an authentication
/// exchange, e.g. after a failure challenge. The server answers with a
/// tagged NO or BAD.
pub const ABORT_LINE: &str = "*";

/// Generates a PLAIN client response (RFC 4616).
///
/// Format: `[authzid] NUL authcid NUL passwd`, UTF-8, base64-encoded.
/// The authorization identity is usually omitted, in which case the server
/// derives it from the authentication identity.
///
/// # Example
///
/// ```
/// use mailhelm_sasl::plain_response;
///
/// let response = plain_response(None, "tim", "tanstaaftanstaaf");
/// assert_eq!(response, "AHRpbQB0YW5zdGFhZnRhbnN0YWFm");
/// ```
#[must_use]
pub fn plain_response(authzid: Option<&str>, authcid: &str, password: &str) -> String {
    let authzid = authzid.unwrap_or("");
    let auth_string = format!("{authzid}\x00{authcid}\x00{password}");
    STANDARD.encode(auth_string.as_bytes())
}

/// Generates an XOAUTH2 client response (Google/Microsoft proprietary).
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01`
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    let auth_string = format!("user={user}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

/// Generates an OAUTHBEARER client response (RFC 7628).
///
/// Format: `n,a=<user>,\x01host=<host>\x01port=<port>\x01auth=Bearer <token>\x01\x01`
///
/// The `host` and `port` fields name the server the client connected to, as
/// required by RFC 7628 section 3.1.
#[must_use]
pub fn oauthbearer_response(user: &str, host: &str, port: u16, token: &str) -> String {
    let auth_string =
        format!("n,a={user},\x01host={host}\x01port={port}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}
