//! DEFLATE transport stages (RFC 4978).
//!
//! After `COMPRESS DEFLATE` completes OK, both directions of the
//! connection switch to raw DEFLATE (no zlib header). [`DeflateStream`]
//! wraps the transport with a compressor on the write side and a
//! decompressor on the read side; [`Transport`] lets the session splice it
//! in at runtime without changing the framer's type.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Buf, BytesMut};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::{Error, Result};

const CHUNK: usize = 8192;

/// A full-duplex raw-DEFLATE adapter over an async byte stream.
pub struct DeflateStream<S> {
    inner: S,
    enc: Compress,
    dec: Decompress,
    /// Compressed bytes received but not yet decompressed.
    in_buf: BytesMut,
    /// Decompressed bytes ready for the reader.
    out_buf: BytesMut,
    /// Compressed bytes staged for the transport.
    write_buf: BytesMut,
    /// Compressor input total as of the last completed sync flush.
    synced_in: u64,
    read_eof: bool,
}

impl<S> DeflateStream<S> {
    /// Wraps `inner`. `residual` holds compressed bytes that arrived
    /// before the decompressor was inserted; they are decompressed first,
    /// so no byte received after the server's OK is framed uncompressed.
    pub fn new(inner: S, residual: BytesMut) -> Self {
        Self {
            inner,
            enc: Compress::new(Compression::default(), false),
            dec: Decompress::new(false),
            in_buf: residual,
            out_buf: BytesMut::new(),
            write_buf: BytesMut::new(),
            synced_in: 0,
            read_eof: false,
        }
    }
}

fn delta(after: u64, before: u64) -> usize {
    usize::try_from(after - before).unwrap_or(usize::MAX)
}

impl<S> DeflateStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn flush_staged(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.write_buf.is_empty() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.write_buf))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.write_buf.advance(n);
        }
        Poll::Ready(Ok(()))
    }
}

impl<S> AsyncRead for DeflateStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.out_buf.is_empty() {
                let n = this.out_buf.len().min(buf.remaining());
                buf.put_slice(&this.out_buf.split_to(n));
                return Poll::Ready(Ok(()));
            }

            if !this.in_buf.is_empty() {
                let mut out = [0u8; CHUNK];
                let before_in = this.dec.total_in();
                let before_out = this.dec.total_out();
                let status = this
                    .dec
                    .decompress(&this.in_buf, &mut out, FlushDecompress::None)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                let consumed = delta(this.dec.total_in(), before_in);
                let produced = delta(this.dec.total_out(), before_out);
                this.in_buf.advance(consumed);
                this.out_buf.extend_from_slice(&out[..produced]);
                if produced > 0 {
                    continue;
                }
                if matches!(status, Status::StreamEnd) {
                    return Poll::Ready(Ok(()));
                }
                // No progress: the decompressor needs more input.
            }

            if this.read_eof {
                return Poll::Ready(Ok(()));
            }

            let mut tmp = [0u8; CHUNK];
            let mut tmp_buf = ReadBuf::new(&mut tmp);
            ready!(Pin::new(&mut this.inner).poll_read(cx, &mut tmp_buf))?;
            let filled = tmp_buf.filled();
            if filled.is_empty() {
                this.read_eof = true;
                return Poll::Ready(Ok(()));
            }
            this.in_buf.extend_from_slice(filled);
        }
    }
}

impl<S> AsyncWrite for DeflateStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.flush_staged(cx))?;
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let mut out_size = buf.len() + 64;
        loop {
            let mut out = vec![0u8; out_size];
            let before_in = this.enc.total_in();
            let before_out = this.enc.total_out();
            this.enc
                .compress(buf, &mut out, FlushCompress::None)
                .map_err(io::Error::other)?;
            let consumed = delta(this.enc.total_in(), before_in);
            let produced = delta(this.enc.total_out(), before_out);
            this.write_buf.extend_from_slice(&out[..produced]);
            if consumed > 0 {
                return Poll::Ready(Ok(consumed));
            }
            out_size *= 2;
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.flush_staged(cx))?;

        // Sync-flush so the peer's decompressor can hand the frame up now.
        while this.enc.total_in() != this.synced_in {
            let mut out = [0u8; CHUNK];
            let before_out = this.enc.total_out();
            this.enc
                .compress(&[], &mut out, FlushCompress::Sync)
                .map_err(io::Error::other)?;
            let produced = delta(this.enc.total_out(), before_out);
            this.write_buf.extend_from_slice(&out[..produced]);
            if produced < out.len() {
                this.synced_in = this.enc.total_in();
            }
            ready!(this.flush_staged(cx))?;
        }

        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        ready!(self.as_mut().poll_flush(cx))?;
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Transport slot that can have DEFLATE stages spliced in mid-session.
pub(crate) enum Transport<S> {
    /// Uncompressed transport.
    Plain(S),
    /// DEFLATE stages active.
    Deflate(Box<DeflateStream<S>>),
    /// Transient state while splicing; never observed outside a failed
    /// splice.
    Poisoned,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Splices the DEFLATE stages in, handing `residual` (inbound bytes
    /// that were received after the server's OK) to the decompressor.
    pub(crate) fn enable_deflate(&mut self, residual: BytesMut) -> Result<()> {
        match std::mem::replace(self, Self::Poisoned) {
            Self::Plain(inner) => {
                *self = Self::Deflate(Box::new(DeflateStream::new(inner, residual)));
                Ok(())
            }
            other => {
                *self = other;
                Err(Error::Protocol("compression already active".to_string()))
            }
        }
    }
}

macro_rules! poll_transport {
    ($self:ident, $method:ident, $($arg:expr),*) => {
        match $self.get_mut() {
            Transport::Plain(stream) => Pin::new(stream).$method($($arg),*),
            Transport::Deflate(stream) => Pin::new(stream.as_mut()).$method($($arg),*),
            Transport::Poisoned => Poll::Ready(Err(io::ErrorKind::BrokenPipe.into())),
        }
    };
}

impl<S> AsyncRead for Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        poll_transport!(self, poll_read, cx, buf)
    }
}

impl<S> AsyncWrite for Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        poll_transport!(self, poll_write, cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        poll_transport!(self, poll_flush, cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        poll_transport!(self, poll_shutdown, cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn round_trips_through_paired_streams() {
        let (a, b) = tokio::io::duplex(16 * 1024);
        let mut alice = DeflateStream::new(a, BytesMut::new());
        let mut bob = DeflateStream::new(b, BytesMut::new());

        alice.write_all(b"A000001 NOOP\r\n").await.unwrap();
        alice.flush().await.unwrap();

        let mut buf = [0u8; 14];
        bob.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"A000001 NOOP\r\n");

        bob.write_all(b"A000001 OK NOOP completed\r\n").await.unwrap();
        bob.flush().await.unwrap();

        let mut buf = [0u8; 27];
        alice.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"A000001 OK NOOP completed\r\n");
    }

    #[tokio::test]
    async fn residual_bytes_reach_the_decompressor() {
        // Compress a frame out-of-band and hand it over as residual data.
        let (a, b) = tokio::io::duplex(4096);
        let mut sender = DeflateStream::new(a, BytesMut::new());
        sender.write_all(b"* 3 EXISTS\r\n").await.unwrap();
        sender.flush().await.unwrap();

        let mut raw = vec![0u8; 256];
        let mut plain_side = b;
        let n = plain_side.read(&mut raw).await.unwrap();

        let (c, _d) = tokio::io::duplex(16);
        let mut receiver = DeflateStream::new(c, BytesMut::from(&raw[..n]));
        let mut buf = [0u8; 12];
        receiver.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"* 3 EXISTS\r\n");
    }

    #[tokio::test]
    async fn repeated_flushes_are_harmless() {
        let (a, b) = tokio::io::duplex(4096);
        let mut alice = DeflateStream::new(a, BytesMut::new());
        let mut bob = DeflateStream::new(b, BytesMut::new());

        alice.write_all(b"one\r\n").await.unwrap();
        alice.flush().await.unwrap();
        alice.flush().await.unwrap();
        alice.write_all(b"two\r\n").await.unwrap();
        alice.flush().await.unwrap();

        let mut buf = [0u8; 10];
        bob.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"one\r\ntwo\r\n");
    }

    #[tokio::test]
    async fn transport_splices_in_deflate() {
        let (a, b) = tokio::io::duplex(4096);
        let mut transport = Transport::Plain(a);
        transport.enable_deflate(BytesMut::new()).unwrap();
        assert!(transport.enable_deflate(BytesMut::new()).is_err());

        transport.write_all(b"hello\r\n").await.unwrap();
        transport.flush().await.unwrap();

        let mut peer = DeflateStream::new(b, BytesMut::new());
        let mut buf = [0u8; 7];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\r\n");
    }
}
