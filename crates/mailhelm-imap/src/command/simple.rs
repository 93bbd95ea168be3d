//! One-line IMAP commands.

use super::serialize::{write_astring, write_mailbox};
use super::{CommandKind, ImapRequest};
use crate::types::Mailbox;

/// A stateless one-line command: `{NAME}[ {args}]CRLF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// CREATE command.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE command.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// RENAME command.
    Rename {
        /// Current mailbox name.
        from: Mailbox,
        /// New mailbox name.
        to: Mailbox,
    },
    /// SUBSCRIBE command.
    Subscribe {
        /// Mailbox to subscribe.
        mailbox: Mailbox,
    },
    /// UNSUBSCRIBE command.
    Unsubscribe {
        /// Mailbox to unsubscribe.
        mailbox: Mailbox,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// NAMESPACE command (RFC 2342).
    Namespace,
    /// STATUS command.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Status items to request.
        items: Vec<StatusItem>,
    },
    /// COMPRESS DEFLATE command (RFC 4978).
    CompressDeflate,
}

/// STATUS data items (RFC 3501 section 6.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusItem {
    /// Number of messages.
    Messages,
    /// Number of recent messages.
    Recent,
    /// Next UID to be assigned.
    UidNext,
    /// UIDVALIDITY value.
    UidValidity,
    /// Number of unseen messages.
    Unseen,
}

impl StatusItem {
    /// The wire name of the item.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

impl Command {
    /// Serializes the command line, CRLF included, without a tag.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),

            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::Create { mailbox } => {
                buf.extend_from_slice(b"CREATE ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::Delete { mailbox } => {
                buf.extend_from_slice(b"DELETE ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::Rename { from, to } => {
                buf.extend_from_slice(b"RENAME ");
                write_mailbox(&mut buf, from);
                buf.push(b' ');
                write_mailbox(&mut buf, to);
            }

            Self::Subscribe { mailbox } => {
                buf.extend_from_slice(b"SUBSCRIBE ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::Unsubscribe { mailbox } => {
                buf.extend_from_slice(b"UNSUBSCRIBE ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_astring(&mut buf, pattern);
            }

            Self::Namespace => buf.extend_from_slice(b"NAMESPACE"),

            Self::Status { mailbox, items } => {
                buf.extend_from_slice(b"STATUS ");
                write_mailbox(&mut buf, mailbox);
                buf.extend_from_slice(b" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    buf.extend_from_slice(item.as_str().as_bytes());
                }
                buf.push(b')');
            }

            Self::CompressDeflate => buf.extend_from_slice(b"COMPRESS DEFLATE"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

impl ImapRequest for Command {
    fn kind(&self) -> CommandKind {
        match self {
            Self::Capability => CommandKind::Capability,
            Self::Noop => CommandKind::Noop,
            Self::Logout => CommandKind::Logout,
            Self::Login { .. } => CommandKind::Login,
            Self::Select { .. } => CommandKind::Select,
            Self::Examine { .. } => CommandKind::Examine,
            Self::Create { .. } => CommandKind::Create,
            Self::Delete { .. } => CommandKind::Delete,
            Self::Rename { .. } => CommandKind::Rename,
            Self::Subscribe { .. } => CommandKind::Subscribe,
            Self::Unsubscribe { .. } => CommandKind::Unsubscribe,
            Self::List { .. } => CommandKind::List,
            Self::Namespace => CommandKind::Namespace,
            Self::Status { .. } => CommandKind::Status,
            Self::CompressDeflate => CommandKind::Compress,
        }
    }

    fn initial_line(&mut self) -> Vec<u8> {
        self.serialize()
    }

    fn is_sensitive(&self) -> bool {
        // The LOGIN line carries the password in the clear.
        matches!(self, Self::Login { .. })
    }

    fn debug_label(&self) -> String {
        match self {
            Self::Login { username, .. } => format!("LOGIN FOR USER:{username}"),
            _ => self.kind().name().to_string(),
        }
    }

    fn cleanup(&mut self) {
        if let Self::Login { password, .. } = self {
            password.clear();
            password.shrink_to_fit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_command() {
        assert_eq!(Command::Capability.serialize(), b"CAPABILITY\r\n");
    }

    #[test]
    fn login_command() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        assert_eq!(cmd.serialize(), b"LOGIN user pass\r\n");
    }

    #[test]
    fn login_quoted() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "pass word".to_string(),
        };
        assert_eq!(cmd.serialize(), b"LOGIN user@example.com \"pass word\"\r\n");
    }

    #[test]
    fn select_command() {
        let cmd = Command::Select {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(cmd.serialize(), b"SELECT INBOX\r\n");
    }

    #[test]
    fn subscribe_simple_mailbox() {
        let cmd = Command::Subscribe {
            mailbox: Mailbox::new("folderABC"),
        };
        assert_eq!(cmd.serialize(), b"SUBSCRIBE folderABC\r\n");
    }

    #[test]
    fn subscribe_mailbox_with_space() {
        let cmd = Command::Subscribe {
            mailbox: Mailbox::new("folder ABC"),
        };
        assert_eq!(cmd.serialize(), b"SUBSCRIBE \"folder ABC\"\r\n");
    }

    #[test]
    fn subscribe_non_ascii_mailbox() {
        let cmd = Command::Subscribe {
            mailbox: Mailbox::new("测试"),
        };
        assert_eq!(cmd.serialize(), b"SUBSCRIBE &bUuL1Q-\r\n");
    }

    #[test]
    fn list_command() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        // * is a list-wildcard; both quoted and unquoted are valid.
        assert_eq!(cmd.serialize(), b"LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn status_command() {
        let cmd = Command::Status {
            mailbox: Mailbox::inbox(),
            items: vec![StatusItem::Messages, StatusItem::Unseen],
        };
        assert_eq!(cmd.serialize(), b"STATUS INBOX (MESSAGES UNSEEN)\r\n");
    }

    #[test]
    fn compress_command() {
        assert_eq!(Command::CompressDeflate.serialize(), b"COMPRESS DEFLATE\r\n");
    }

    #[test]
    fn login_is_sensitive_and_redacts() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "secret".to_string(),
        };
        assert!(ImapRequest::is_sensitive(&cmd));
        assert_eq!(
            ImapRequest::debug_label(&cmd),
            "LOGIN FOR USER:user@example.com"
        );
    }

    #[test]
    fn login_cleanup_clears_password() {
        let mut cmd = Command::Login {
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        cmd.cleanup();
        let Command::Login { password, .. } = &cmd else {
            unreachable!();
        };
        assert!(password.is_empty());
        // Idempotent.
        cmd.cleanup();
    }

    #[test]
    fn simple_commands_have_no_continuation() {
        let mut cmd = Command::Noop;
        assert!(cmd.continuation(b"").is_err());
        assert!(cmd.terminator().is_err());
        assert!(cmd.streaming_queue().is_none());
    }
}
