//! Framed I/O for the IMAP wire protocol.
//!
//! IMAP uses CRLF-terminated lines with embedded literals
//! (`{n}\r\n<n bytes>`). The framer keeps a persistent inbound buffer so
//! `read_response` is cancel-safe: a partially received frame survives the
//! read future being dropped and is completed on the next call.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Initial buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Framed connection for the IMAP protocol.
pub struct FramedStream<S> {
    stream: S,
    read_buf: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one complete response, embedded literals included.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, EOF, oversized lines, and oversized
    /// literals.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        loop {
            if let Some(end) = find_response_end(&self.read_buf)? {
                return Ok(self.read_buf.split_to(end).to_vec());
            }
            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
        }
    }

    /// Writes a frame to the stream and flushes.
    ///
    /// # Errors
    ///
    /// Fails on transport errors.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Shuts down the underlying transport.
    ///
    /// # Errors
    ///
    /// Fails on transport errors.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Gets a mutable reference to the underlying stream.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Takes the inbound bytes that have been received but not yet framed.
    pub(crate) fn take_residual(&mut self) -> BytesMut {
        self.read_buf.split()
    }
}

/// Finds the end of the first complete response in the buffer, literal
/// continuations included.
fn find_response_end(buf: &[u8]) -> Result<Option<usize>> {
    let mut start = 0;
    loop {
        let Some(rel) = find_crlf(&buf[start..]) else {
            if buf.len() - start > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
            return Ok(None);
        };
        let line_end = start + rel + 2;
        match parse_literal_length(&buf[start..line_end]) {
            Some(literal_len) => {
                if literal_len > MAX_LITERAL_SIZE {
                    return Err(Error::Protocol(format!(
                        "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                    )));
                }
                let after_literal = line_end + literal_len;
                if buf.len() < after_literal {
                    return Ok(None);
                }
                // The response continues after the literal, up to the next
                // CRLF (which may itself announce another literal).
                start = after_literal;
            }
            None => return Ok(Some(line_end)),
        }
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses a literal length from the end of a line.
///
/// Matches patterns like `{123}\r\n` or `{123+}\r\n` (non-synchronizing).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    if !line.ends_with(b"\r\n") {
        return None;
    }
    let line = &line[..line.len() - 2];

    let open = line.iter().rposition(|&b| b == b'{')?;
    if !line.ends_with(b"}") {
        return None;
    }

    let num_start = open + 1;
    let num_end = if line.ends_with(b"+}") {
        line.len() - 2
    } else {
        line.len() - 1
    };

    let num_str = std::str::from_utf8(line.get(num_start..num_end)?).ok()?;
    num_str.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn finds_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
        assert_eq!(find_crlf(b"just\r"), None);
    }

    #[test]
    fn parses_literal_length() {
        assert_eq!(parse_literal_length(b"BODY {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"{999999}\r\n"), Some(999_999));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
    }

    #[test]
    fn response_end_spans_literals() {
        assert_eq!(find_response_end(b"* OK ready\r\n").unwrap(), Some(12));
        assert_eq!(find_response_end(b"* OK partial").unwrap(), None);

        let with_literal = b"* 1 FETCH (BODY {5}\r\nhello)\r\n";
        assert_eq!(
            find_response_end(with_literal).unwrap(),
            Some(with_literal.len())
        );

        // Literal announced but not fully buffered yet.
        assert_eq!(find_response_end(b"* 1 FETCH (BODY {5}\r\nhel").unwrap(), None);
    }

    #[tokio::test]
    async fn reads_simple_line() {
        use tokio_test::io::Builder;

        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn reads_response_with_literal() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn reads_two_frames_from_one_burst() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .read(b"* BYE closing\r\nA000001 OK LOGOUT completed\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* BYE closing\r\n");
        assert_eq!(
            framed.read_response().await.unwrap(),
            b"A000001 OK LOGOUT completed\r\n"
        );
    }

    #[tokio::test]
    async fn writes_frames() {
        use tokio_test::io::Builder;

        let mock = Builder::new().write(b"A000001 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.write_all(b"A000001 NOOP\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_oversized_literal() {
        use tokio_test::io::Builder;

        let literal_size = MAX_LITERAL_SIZE + 1;
        let header = format!("* 1 FETCH (BODY {{{literal_size}}}\r\n");

        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(result.unwrap_err().to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn eof_is_an_error() {
        use tokio_test::io::Builder;

        let mock = Builder::new().build();
        let mut framed = FramedStream::new(mock);
        assert!(framed.read_response().await.is_err());
    }

    #[tokio::test]
    async fn residual_is_taken_after_frame() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .read(b"A000001 OK done\r\ncompressed-tail")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"A000001 OK done\r\n");
        assert_eq!(&framed.take_residual()[..], b"compressed-tail");
        assert!(framed.take_residual().is_empty());
    }
}
