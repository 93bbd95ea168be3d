//! Server capabilities and response status.

use std::collections::HashMap;

/// Well-known capability names.
///
/// Process-wide read-only constants; membership tests against
/// [`Capabilities`] are case-insensitive, so the mixed-case spellings here
/// match however the server advertises them.
pub mod names {
    /// `IMAP4rev1` (RFC 3501).
    pub const IMAP4REV1: &str = "IMAP4rev1";
    /// SASL initial-response support (RFC 4959).
    pub const SASL_IR: &str = "SASL-IR";
    /// IDLE command support (RFC 2177).
    pub const IDLE: &str = "IDLE";
    /// COMPRESS extension (RFC 4978); advertised as `COMPRESS=DEFLATE`.
    pub const COMPRESS: &str = "COMPRESS";
    /// The DEFLATE compression algorithm parameter.
    pub const DEFLATE: &str = "DEFLATE";
    /// NAMESPACE command support (RFC 2342).
    pub const NAMESPACE: &str = "NAMESPACE";
    /// AUTH mechanisms; advertised as `AUTH=<mechanism>`.
    pub const AUTH: &str = "AUTH";
    /// STARTTLS support.
    pub const STARTTLS: &str = "STARTTLS";
    /// LOGIN command disabled.
    pub const LOGINDISABLED: &str = "LOGINDISABLED";
}

/// Response status from a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (operational error).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
    /// Server greeting (pre-authenticated).
    PreAuth,
    /// Server is closing connection.
    Bye,
}

impl Status {
    /// Parses a status token, case-insensitively.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }

    /// Returns true if this is a successful status.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// Parsed server capability set.
///
/// Maps upper-cased capability names to their ordered parameter lists
/// (capabilities with arguments, e.g. `AUTH=PLAIN`, contribute one
/// parameter per token). The set is immutable once built and replaced
/// wholesale when the server re-advertises.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    entries: HashMap<String, Vec<String>>,
}

impl Capabilities {
    /// Builds a capability set from whitespace-split response tokens.
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries: HashMap<String, Vec<String>> = HashMap::new();
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.split_once('=') {
                Some((name, param)) => entries
                    .entry(name.to_ascii_uppercase())
                    .or_default()
                    .push(param.to_string()),
                None => {
                    entries.entry(token.to_ascii_uppercase()).or_default();
                }
            }
        }
        Self { entries }
    }

    /// Case-insensitive membership test.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_uppercase())
    }

    /// Ordered parameters advertised for a capability.
    #[must_use]
    pub fn params(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_uppercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Whether an AUTH mechanism is advertised (e.g. `PLAIN`).
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.params(names::AUTH)
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mechanism))
    }

    /// Whether the server accepts SASL initial responses (RFC 4959).
    #[must_use]
    pub fn sasl_ir(&self) -> bool {
        self.has(names::SASL_IR)
    }

    /// Whether `COMPRESS=DEFLATE` is advertised (RFC 4978).
    #[must_use]
    pub fn supports_deflate(&self) -> bool {
        self.params(names::COMPRESS)
            .iter()
            .any(|alg| alg.eq_ignore_ascii_case(names::DEFLATE))
    }

    /// Returns true if no capabilities are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct capability names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Capabilities {
        Capabilities::from_tokens(
            "IMAP4rev1 SASL-IR AUTH=PLAIN AUTH=XOAUTH2 IDLE COMPRESS=DEFLATE".split_whitespace(),
        )
    }

    mod status_tests {
        use super::*;

        #[test]
        fn parses_case_insensitively() {
            assert_eq!(Status::parse("ok"), Some(Status::Ok));
            assert_eq!(Status::parse("NO"), Some(Status::No));
            assert_eq!(Status::parse("Bad"), Some(Status::Bad));
            assert_eq!(Status::parse("PREAUTH"), Some(Status::PreAuth));
            assert_eq!(Status::parse("BYE"), Some(Status::Bye));
            assert_eq!(Status::parse("MAYBE"), None);
        }

        #[test]
        fn is_ok() {
            assert!(Status::Ok.is_ok());
            assert!(Status::PreAuth.is_ok());
            assert!(!Status::No.is_ok());
            assert!(!Status::Bad.is_ok());
            assert!(!Status::Bye.is_ok());
        }
    }

    #[test]
    fn membership_is_case_insensitive() {
        let caps = sample();
        assert!(caps.has("IDLE"));
        assert!(caps.has("idle"));
        assert!(caps.has("Sasl-Ir"));
        assert!(!caps.has("NAMESPACE"));
    }

    #[test]
    fn params_are_ordered() {
        let caps = sample();
        assert_eq!(caps.params("AUTH"), ["PLAIN", "XOAUTH2"]);
        assert!(caps.params("IDLE").is_empty());
        assert!(caps.params("MISSING").is_empty());
    }

    #[test]
    fn auth_lookup() {
        let caps = sample();
        assert!(caps.supports_auth("plain"));
        assert!(caps.supports_auth("XOAUTH2"));
        assert!(!caps.supports_auth("OAUTHBEARER"));
    }

    #[test]
    fn sasl_ir_and_deflate() {
        let caps = sample();
        assert!(caps.sasl_ir());
        assert!(caps.supports_deflate());

        let without = Capabilities::from_tokens("IMAP4rev1".split_whitespace());
        assert!(!without.sasl_ir());
        assert!(!without.supports_deflate());
    }

    #[test]
    fn empty_set() {
        let caps = Capabilities::default();
        assert!(caps.is_empty());
        assert_eq!(caps.len(), 0);
        assert!(!caps.has("IDLE"));
    }
}
