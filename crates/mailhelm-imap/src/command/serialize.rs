//! Command serialization helpers.

use crate::types::Mailbox;

/// Writes an astring: atom, quoted string, or literal.
///
/// Tokens with CR, LF, or bytes outside US-ASCII cannot be quoted and fall
/// back to a synchronizing literal.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.bytes().any(|b| b == b'\r' || b == b'\n' || b > 0x7e) {
        write_literal(buf, s.as_bytes());
    } else if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Writes a mailbox name: modified UTF-7 first, then astring rules.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) {
    write_astring(buf, &mailbox.encoded());
}

/// Returns true if the byte forces the quoted form.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}

/// Writes a length-prefixed literal: `{N}CRLF` followed by the bytes.
fn write_literal(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(format!("{{{}}}\r\n", bytes.len()).as_bytes());
    buf.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn astring(s: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        write_astring(&mut buf, s);
        buf
    }

    #[test]
    fn atom_passes_through() {
        assert_eq!(astring("INBOX"), b"INBOX");
        assert_eq!(astring("folderABC"), b"folderABC");
    }

    #[test]
    fn space_forces_quoting() {
        assert_eq!(astring("folder ABC"), b"\"folder ABC\"");
    }

    #[test]
    fn empty_is_quoted() {
        assert_eq!(astring(""), b"\"\"");
    }

    #[test]
    fn quotes_and_backslashes_escape() {
        assert_eq!(astring(r#"a"b"#), b"\"a\\\"b\"");
        assert_eq!(astring(r"a\b"), b"\"a\\\\b\"");
    }

    #[test]
    fn wildcards_are_quoted() {
        assert_eq!(astring("*"), b"\"*\"");
        assert_eq!(astring("%"), b"\"%\"");
    }

    #[test]
    fn crlf_falls_back_to_literal() {
        assert_eq!(astring("a\r\nb"), b"{4}\r\na\r\nb");
    }

    #[test]
    fn mailbox_applies_utf7() {
        let mut buf = Vec::new();
        write_mailbox(&mut buf, &Mailbox::new("测试"));
        assert_eq!(buf, b"&bUuL1Q-");

        let mut buf = Vec::new();
        write_mailbox(&mut buf, &Mailbox::new("folder ABC"));
        assert_eq!(buf, b"\"folder ABC\"");
    }
}
