//! Modified UTF-7 mailbox-name encoding (RFC 3501 section 5.1.3).
//!
//! Printable US-ASCII characters except `&` represent themselves; `&` is
//! encoded as `&-`; everything else is encoded in runs of UTF-16BE code
//! units, base64'd in the IMAP variant alphabet (`,` in place of `/`, no
//! padding) and wrapped in `&...-`.

use base64::Engine;
use base64::alphabet::IMAP_MUTF7;
use base64::engine::GeneralPurpose;
use base64::engine::general_purpose::NO_PAD;

const MUTF7: GeneralPurpose = GeneralPurpose::new(&IMAP_MUTF7, NO_PAD);

/// Encodes a mailbox name into modified UTF-7.
#[must_use]
pub fn encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut run: Vec<u16> = Vec::new();

    for ch in name.chars() {
        if ('\x20'..='\x7e').contains(&ch) {
            flush_run(&mut out, &mut run);
            if ch == '&' {
                out.push_str("&-");
            } else {
                out.push(ch);
            }
        } else {
            let mut units = [0u16; 2];
            run.extend_from_slice(ch.encode_utf16(&mut units));
        }
    }
    flush_run(&mut out, &mut run);
    out
}

fn flush_run(out: &mut String, run: &mut Vec<u16>) {
    if run.is_empty() {
        return;
    }
    let mut bytes = Vec::with_capacity(run.len() * 2);
    for unit in run.drain(..) {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    out.push('&');
    out.push_str(&MUTF7.encode(&bytes));
    out.push('-');
}

/// Decodes a modified UTF-7 mailbox name.
///
/// Returns `None` for malformed input: an unterminated `&` section, invalid
/// base64, a dangling UTF-16 surrogate, or raw bytes outside the printable
/// US-ASCII range.
#[must_use]
pub fn decode(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'&' {
            let end = bytes[i + 1..].iter().position(|&c| c == b'-')? + i + 1;
            let segment = &encoded[i + 1..end];
            if segment.is_empty() {
                out.push('&');
            } else {
                let raw = MUTF7.decode(segment).ok()?;
                if raw.len() % 2 != 0 {
                    return None;
                }
                let units: Vec<u16> = raw
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                out.push_str(&String::from_utf16(&units).ok()?);
            }
            i = end + 1;
        } else if (0x20..=0x7e).contains(&b) {
            out.push(b as char);
            i += 1;
        } else {
            return None;
        }
    }
    Some(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(encode("INBOX"), "INBOX");
        assert_eq!(encode("folderABC"), "folderABC");
        assert_eq!(decode("INBOX").unwrap(), "INBOX");
    }

    #[test]
    fn ampersand_escapes() {
        assert_eq!(encode("A&B"), "A&-B");
        assert_eq!(decode("A&-B").unwrap(), "A&B");
        assert_eq!(decode("&-").unwrap(), "&");
    }

    #[test]
    fn encodes_cjk() {
        assert_eq!(encode("测试"), "&bUuL1Q-");
        assert_eq!(decode("&bUuL1Q-").unwrap(), "测试");
    }

    #[test]
    fn rfc3501_example() {
        // The mixed example from RFC 3501 section 5.1.3.
        assert_eq!(decode("~peter/mail/&U,BTFw-/&ZeVnLIqe-").unwrap(), "~peter/mail/台北/日本語");
        assert_eq!(encode("~peter/mail/台北/日本語"), "~peter/mail/&U,BTFw-/&ZeVnLIqe-");
    }

    #[test]
    fn adjacent_runs_decode() {
        assert_eq!(decode("&U,BTFw-&ZeVnLIqe-").unwrap(), "台北日本語");
        assert_eq!(decode("&U,BTF2XlZyyKng-").unwrap(), "台北日本語");
    }

    #[test]
    fn rejects_malformed() {
        assert!(decode("&Jjo!").is_none());
        assert!(decode("&").is_none());
        assert_eq!(decode("&Jjo-!").unwrap(), "☺!");
    }

    #[test]
    fn encodes_control_characters() {
        let encoded = encode("a\tb");
        assert_eq!(encoded, "a&AAk-b");
        assert_eq!(decode(&encoded).unwrap(), "a\tb");
    }

    #[test]
    fn supplementary_plane_round_trips() {
        let name = "mail-📬";
        assert_eq!(decode(&encode(name)).unwrap(), name);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trips(name in "\\PC{0,64}") {
                let encoded = encode(&name);
                prop_assert!(encoded.bytes().all(|b| (0x20..=0x7e).contains(&b)));
                prop_assert_eq!(decode(&encoded).unwrap(), name);
            }
        }
    }
}
