//! Connection establishment: transport dialing, greeting negotiation, and
//! session promotion.
//!
//! A one-shot negotiator sits in front of the session until the server's
//! greeting is observed. The dialers here produce the transport
//! ([`ImapStream`], cleartext or TLS via rustls) and feed it straight into
//! [`establish`]: an untagged OK (or PREAUTH) greeting promotes the
//! channel into a running [`Session`]; anything else fails the connect
//! with a specific error, and nothing is retained.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::config::SessionConfig;
use crate::connection::deflate::Transport;
use crate::connection::framed::FramedStream;
use crate::response::ServerResponse;
use crate::session::Session;
use crate::types::{Capabilities, Status};
use crate::{Error, Result};

/// The server's greeting.
#[derive(Debug, Clone)]
pub struct Greeting {
    /// Greeting status: OK or PREAUTH.
    pub status: Status,
    /// Greeting text.
    pub text: String,
    /// Capabilities advertised in a `[CAPABILITY ...]` greeting code.
    pub capabilities: Option<Capabilities>,
}

/// A dialed transport awaiting promotion, cleartext or TLS.
pub enum ImapStream {
    /// Plaintext TCP connection.
    Plain(TcpStream),
    /// TLS connection (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Returns true if the transport is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

macro_rules! poll_stream {
    ($self:ident, $method:ident, $($arg:expr),*) => {
        match $self.get_mut() {
            ImapStream::Plain(stream) => Pin::new(stream).$method($($arg),*),
            ImapStream::Tls(stream) => Pin::new(stream.as_mut()).$method($($arg),*),
        }
    };
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        poll_stream!(self, poll_read, cx, buf)
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        poll_stream!(self, poll_write, cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        poll_stream!(self, poll_flush, cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        poll_stream!(self, poll_shutdown, cx)
    }
}

/// Dials the server with implicit TLS (port 993), then negotiates the
/// greeting and promotes the connection into a session.
///
/// # Errors
///
/// Dial and handshake failures surface as [`Error::ConnectFailed`] (a bad
/// hostname as [`Error::InvalidDnsName`]); greeting failures as in
/// [`establish`].
pub async fn connect_tls(
    host: &str,
    port: u16,
    config: SessionConfig,
) -> Result<(Session, Greeting)> {
    let tcp = dial(host, port).await?;
    let server_name = ServerName::try_from(host.to_string())?;
    let tls = tls_connector()
        .connect(server_name, tcp)
        .await
        .map_err(Error::ConnectFailed)?;
    establish(ImapStream::Tls(Box::new(tls)), config).await
}

/// Dials the server without TLS, then negotiates the greeting and
/// promotes the connection into a session. For local servers and tests.
///
/// # Errors
///
/// Dial failures surface as [`Error::ConnectFailed`]; greeting failures
/// as in [`establish`].
pub async fn connect_plain(
    host: &str,
    port: u16,
    config: SessionConfig,
) -> Result<(Session, Greeting)> {
    let tcp = dial(host, port).await?;
    establish(ImapStream::Plain(tcp), config).await
}

async fn dial(host: &str, port: u16) -> Result<TcpStream> {
    TcpStream::connect((host, port))
        .await
        .map_err(Error::ConnectFailed)
}

fn tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(tls_config))
}

/// Reads the greeting from an established transport and promotes it into a
/// session. The generic transport keeps the engine testable against
/// scripted streams; the dialers above feed it an [`ImapStream`].
///
/// # Errors
///
/// - [`Error::GreetingTimeout`] if no greeting arrives within the
///   configured read-idle limit.
/// - [`Error::ConnectionInactive`] if the channel closes first.
/// - [`Error::ConnectFailed`] on a transport error.
/// - [`Error::GreetingNotOk`] if the greeting is not an untagged OK or
///   PREAUTH.
pub async fn establish<S>(stream: S, config: SessionConfig) -> Result<(Session, Greeting)>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut framed = FramedStream::new(Transport::Plain(stream));

    let frame = match timeout(config.read_idle_timeout, framed.read_response()).await {
        Ok(Ok(frame)) => frame,
        Ok(Err(Error::Io(e))) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(Error::ConnectionInactive);
        }
        Ok(Err(Error::Io(e))) => return Err(Error::ConnectFailed(e)),
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(Error::GreetingTimeout(config.read_idle_timeout)),
    };

    let greeting = classify_greeting(&frame)?;
    tracing::debug!(
        session_id = config.session_id,
        status = ?greeting.status,
        "greeting accepted"
    );

    let capabilities = greeting.capabilities.clone().unwrap_or_default();
    let session = Session::spawn(framed, config, capabilities);
    Ok((session, greeting))
}

fn classify_greeting(frame: &[u8]) -> Result<Greeting> {
    let not_ok = || {
        Error::GreetingNotOk(String::from_utf8_lossy(frame).trim_end().to_string())
    };

    let Some(ServerResponse::Untagged(untagged)) = ServerResponse::parse(frame) else {
        return Err(not_ok());
    };
    match untagged.status() {
        Some(status @ (Status::Ok | Status::PreAuth)) => Ok(Greeting {
            status,
            capabilities: untagged.capabilities(),
            text: untagged.text(),
        }),
        _ => Err(not_ok()),
    }
}
