//! SASL AUTHENTICATE commands (RFC 3501 section 6.2.2).
//!
//! All three mechanisms share one exchange shape: when the server
//! advertises `SASL-IR` (RFC 4959) the client response rides on the
//! `AUTHENTICATE` line itself; otherwise the command line goes out bare and
//! the response is sent after the server's `+` continuation. A second `+`
//! after the response is a failure challenge (base64 JSON); the command
//! logs it at DEBUG and aborts the exchange with a bare `*` line, after
//! which the server answers with a tagged NO or BAD.

use mailhelm_sasl::{
    ABORT_LINE, decode_challenge_text, oauthbearer_response, plain_response, xoauth2_response,
};

use super::{CommandKind, ImapRequest};
use crate::types::Capabilities;
use crate::{Error, Result};

/// Continuation state shared by the AUTHENTICATE family.
#[derive(Debug)]
struct Exchange {
    sasl_ir: bool,
    response_sent: bool,
    sensitive: bool,
    aborted: bool,
}

impl Exchange {
    fn new(capabilities: &Capabilities) -> Self {
        Self {
            sasl_ir: capabilities.sasl_ir(),
            response_sent: false,
            sensitive: false,
            aborted: false,
        }
    }

    fn initial_line(&mut self, mechanism: &str, payload: &str) -> Vec<u8> {
        if self.sasl_ir {
            self.response_sent = true;
            self.sensitive = true;
            format!("AUTHENTICATE {mechanism} {payload}\r\n").into_bytes()
        } else {
            self.sensitive = false;
            format!("AUTHENTICATE {mechanism}\r\n").into_bytes()
        }
    }

    fn continuation(
        &mut self,
        command_name: &'static str,
        server_text: &[u8],
        payload: &str,
    ) -> Result<Option<Vec<u8>>> {
        if self.aborted {
            return Err(Error::Protocol(format!(
                "{command_name}: continuation after SASL abort"
            )));
        }
        if self.response_sent {
            // Failure challenge after the client response: log the decoded
            // form, then abort the exchange.
            if tracing::enabled!(tracing::Level::DEBUG) {
                let trimmed = server_text.trim_ascii();
                let decoded = decode_challenge_text(trimmed)
                    .unwrap_or_else(|_| String::from_utf8_lossy(trimmed).into_owned());
                tracing::debug!("{command_name}:server challenge:{decoded}");
            }
            self.sensitive = false;
            self.aborted = true;
            Ok(Some(format!("{ABORT_LINE}\r\n").into_bytes()))
        } else {
            self.response_sent = true;
            self.sensitive = true;
            Ok(Some(format!("{payload}\r\n").into_bytes()))
        }
    }
}

fn wipe(field: &mut String) {
    field.clear();
    field.shrink_to_fit();
}

/// AUTHENTICATE PLAIN (RFC 4616).
pub struct AuthPlainCommand {
    authzid: Option<String>,
    authcid: String,
    password: String,
    exchange: Exchange,
}

impl AuthPlainCommand {
    /// Creates the command. The capability snapshot is read once, here, to
    /// decide SASL-IR; the command retains no reference to it.
    #[must_use]
    pub fn new(
        authzid: Option<&str>,
        authcid: &str,
        password: &str,
        capabilities: &Capabilities,
    ) -> Self {
        Self {
            authzid: authzid.map(str::to_string),
            authcid: authcid.to_string(),
            password: password.to_string(),
            exchange: Exchange::new(capabilities),
        }
    }

    fn payload(&self) -> String {
        plain_response(self.authzid.as_deref(), &self.authcid, &self.password)
    }
}

impl ImapRequest for AuthPlainCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AuthPlain
    }

    fn initial_line(&mut self) -> Vec<u8> {
        let payload = self.payload();
        self.exchange.initial_line("PLAIN", &payload)
    }

    fn continuation(&mut self, server_text: &[u8]) -> Result<Option<Vec<u8>>> {
        let payload = self.payload();
        self.exchange
            .continuation("AuthPlainCommand", server_text, &payload)
    }

    fn is_sensitive(&self) -> bool {
        self.exchange.sensitive
    }

    fn debug_label(&self) -> String {
        format!("AUTHENTICATE PLAIN DATA FOR USER:{}", self.authcid)
    }

    fn cleanup(&mut self) {
        if let Some(authzid) = &mut self.authzid {
            wipe(authzid);
        }
        wipe(&mut self.authcid);
        wipe(&mut self.password);
    }
}

impl std::fmt::Debug for AuthPlainCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPlainCommand")
            .field("authcid", &self.authcid)
            .field("exchange", &self.exchange)
            .finish_non_exhaustive()
    }
}

/// AUTHENTICATE XOAUTH2 (Google/Microsoft proprietary).
pub struct AuthXoauth2Command {
    user: String,
    token: String,
    exchange: Exchange,
}

impl AuthXoauth2Command {
    /// Creates the command; see [`AuthPlainCommand::new`] for the
    /// capability-snapshot contract.
    #[must_use]
    pub fn new(user: &str, token: &str, capabilities: &Capabilities) -> Self {
        Self {
            user: user.to_string(),
            token: token.to_string(),
            exchange: Exchange::new(capabilities),
        }
    }

    fn payload(&self) -> String {
        xoauth2_response(&self.user, &self.token)
    }
}

impl ImapRequest for AuthXoauth2Command {
    fn kind(&self) -> CommandKind {
        CommandKind::AuthXoauth2
    }

    fn initial_line(&mut self) -> Vec<u8> {
        let payload = self.payload();
        self.exchange.initial_line("XOAUTH2", &payload)
    }

    fn continuation(&mut self, server_text: &[u8]) -> Result<Option<Vec<u8>>> {
        let payload = self.payload();
        self.exchange
            .continuation("AuthXoauth2Command", server_text, &payload)
    }

    fn is_sensitive(&self) -> bool {
        self.exchange.sensitive
    }

    fn debug_label(&self) -> String {
        format!("AUTHENTICATE XOAUTH2 DATA FOR USER:{}", self.user)
    }

    fn cleanup(&mut self) {
        wipe(&mut self.user);
        wipe(&mut self.token);
    }
}

impl std::fmt::Debug for AuthXoauth2Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthXoauth2Command")
            .field("user", &self.user)
            .field("exchange", &self.exchange)
            .finish_non_exhaustive()
    }
}

/// AUTHENTICATE OAUTHBEARER (RFC 7628).
pub struct AuthOauthBearerCommand {
    user: String,
    host: String,
    port: u16,
    token: String,
    exchange: Exchange,
}

impl AuthOauthBearerCommand {
    /// Creates the command; see [`AuthPlainCommand::new`] for the
    /// capability-snapshot contract.
    #[must_use]
    pub fn new(
        user: &str,
        host: &str,
        port: u16,
        token: &str,
        capabilities: &Capabilities,
    ) -> Self {
        Self {
            user: user.to_string(),
            host: host.to_string(),
            port,
            token: token.to_string(),
            exchange: Exchange::new(capabilities),
        }
    }

    fn payload(&self) -> String {
        oauthbearer_response(&self.user, &self.host, self.port, &self.token)
    }
}

impl ImapRequest for AuthOauthBearerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AuthOauthBearer
    }

    fn initial_line(&mut self) -> Vec<u8> {
        let payload = self.payload();
        self.exchange.initial_line("OAUTHBEARER", &payload)
    }

    fn continuation(&mut self, server_text: &[u8]) -> Result<Option<Vec<u8>>> {
        let payload = self.payload();
        self.exchange
            .continuation("AuthOauthBearerCommand", server_text, &payload)
    }

    fn is_sensitive(&self) -> bool {
        self.exchange.sensitive
    }

    fn debug_label(&self) -> String {
        format!("AUTHENTICATE OAUTHBEARER DATA FOR USER:{}", self.user)
    }

    fn cleanup(&mut self) {
        wipe(&mut self.user);
        wipe(&mut self.host);
        wipe(&mut self.token);
    }
}

impl std::fmt::Debug for AuthOauthBearerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOauthBearerCommand")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("exchange", &self.exchange)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const OAUTHBEARER_B64: &str = "bixhPXVzZXJAZXhhbXBsZS5jb20sAWhvc3Q9c2VydmVyLmV4YW1wbGUuY29tAXBvcnQ9OTkzAWF1dGg9QmVhcmVyIHNlbGZkcml2aW5nAQE=";

    fn caps_with_sasl_ir() -> Capabilities {
        Capabilities::from_tokens("IMAP4rev1 SASL-IR AUTH=OAUTHBEARER".split_whitespace())
    }

    fn caps_without_sasl_ir() -> Capabilities {
        Capabilities::from_tokens("IMAP4rev1 AUTH=OAUTHBEARER".split_whitespace())
    }

    fn oauthbearer(caps: &Capabilities) -> AuthOauthBearerCommand {
        AuthOauthBearerCommand::new(
            "user@example.com",
            "server.example.com",
            993,
            "selfdriving",
            caps,
        )
    }

    #[test]
    fn oauthbearer_with_sasl_ir() {
        let mut cmd = oauthbearer(&caps_with_sasl_ir());
        assert!(!cmd.is_sensitive());
        let line = cmd.initial_line();
        assert_eq!(
            line,
            format!("AUTHENTICATE OAUTHBEARER {OAUTHBEARER_B64}\r\n").into_bytes()
        );
        assert!(cmd.is_sensitive());
        assert_eq!(
            cmd.debug_label(),
            "AUTHENTICATE OAUTHBEARER DATA FOR USER:user@example.com"
        );
    }

    #[test]
    fn oauthbearer_without_sasl_ir() {
        let mut cmd = oauthbearer(&caps_without_sasl_ir());
        let line = cmd.initial_line();
        assert_eq!(line, b"AUTHENTICATE OAUTHBEARER\r\n");
        assert!(!cmd.is_sensitive());

        let next = cmd.continuation(b"").unwrap().unwrap();
        assert_eq!(next, format!("{OAUTHBEARER_B64}\r\n").into_bytes());
        assert!(cmd.is_sensitive());
    }

    #[test]
    fn failure_challenge_aborts() {
        let mut cmd = oauthbearer(&caps_with_sasl_ir());
        let _ = cmd.initial_line();

        let challenge = b"eyJzdGF0dXMiOiI0MDAiLCJzY2hlbWVzIjoiQmVhcmVyIiwic2NvcGUiOiJodHRwczovL21haWwuZ29vZ2xlLmNvbS8ifQ==";
        let next = cmd.continuation(challenge).unwrap().unwrap();
        assert_eq!(next, b"*\r\n");
        assert!(!cmd.is_sensitive());
    }

    #[test]
    fn continuation_after_abort_is_protocol_violation() {
        let mut cmd = oauthbearer(&caps_with_sasl_ir());
        let _ = cmd.initial_line();
        let _ = cmd.continuation(b"eyJ9").unwrap();
        assert!(matches!(
            cmd.continuation(b"eyJ9"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn plain_with_sasl_ir() {
        let caps = Capabilities::from_tokens("SASL-IR AUTH=PLAIN".split_whitespace());
        let mut cmd = AuthPlainCommand::new(None, "tim", "tanstaaftanstaaf", &caps);
        assert_eq!(
            cmd.initial_line(),
            b"AUTHENTICATE PLAIN AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n"
        );
        assert!(cmd.is_sensitive());
    }

    #[test]
    fn plain_without_sasl_ir() {
        let caps = Capabilities::from_tokens("AUTH=PLAIN".split_whitespace());
        let mut cmd = AuthPlainCommand::new(None, "tim", "tanstaaftanstaaf", &caps);
        assert_eq!(cmd.initial_line(), b"AUTHENTICATE PLAIN\r\n");
        assert!(!cmd.is_sensitive());
        let next = cmd.continuation(b"").unwrap().unwrap();
        assert_eq!(next, b"AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n");
        assert!(cmd.is_sensitive());
    }

    #[test]
    fn xoauth2_initial_line() {
        let caps = Capabilities::from_tokens("SASL-IR AUTH=XOAUTH2".split_whitespace());
        let mut cmd = AuthXoauth2Command::new("test@test.com", "abc", &caps);
        let line = String::from_utf8(cmd.initial_line()).unwrap();
        assert!(line.starts_with("AUTHENTICATE XOAUTH2 "));
        assert!(!line.contains("abc"));
        assert_eq!(
            cmd.debug_label(),
            "AUTHENTICATE XOAUTH2 DATA FOR USER:test@test.com"
        );
    }

    #[test]
    fn cleanup_clears_secrets() {
        let caps = caps_with_sasl_ir();
        let mut cmd = oauthbearer(&caps);
        let _ = cmd.initial_line();
        cmd.cleanup();
        assert!(cmd.user.is_empty());
        assert!(cmd.host.is_empty());
        assert!(cmd.token.is_empty());
        // Idempotent.
        cmd.cleanup();

        let mut plain = AuthPlainCommand::new(Some("admin"), "user", "secret", &caps);
        plain.cleanup();
        assert!(plain.authcid.is_empty());
        assert!(plain.password.is_empty());
        assert_eq!(plain.authzid.as_deref(), Some(""));
    }

    #[test]
    fn terminate_is_unsupported() {
        let mut cmd = oauthbearer(&caps_with_sasl_ir());
        assert!(matches!(
            cmd.terminator(),
            Err(Error::Unsupported(CommandKind::AuthOauthBearer))
        ));
    }
}
