//! Session state machine.
//!
//! A [`Session`] is a handle to a driver task that owns the framed
//! transport. All request-object state transitions happen on that task;
//! callers reach it through a message channel, so submission is safe from
//! any thread.
//!
//! The driver enforces IMAP's one-command-at-a-time discipline with a
//! single pending slot: [`Session::submit`] fails synchronously with
//! [`Error::CommandInProgress`] while the slot is occupied. The slot is
//! freed before the completion future fires, so awaiting a command's
//! future before submitting the next one never races.
//!
//! Inbound responses are classified per RFC 3501: a tagged response
//! completes the pending command, a `+` continuation is routed back to the
//! owning request, and untagged responses either stream to the request's
//! queue (IDLE) or accumulate into the command's result.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::command::{
    AuthOauthBearerCommand, AuthPlainCommand, AuthXoauth2Command, Command, CommandKind,
    IdleCommand, ImapRequest, StatusItem, TagGenerator,
};
use crate::config::{DebugMode, SessionConfig};
use crate::connection::FramedStream;
use crate::connection::deflate::Transport;
use crate::future::{CommandFuture, Completion};
use crate::response::{ServerResponse, TaggedResponse, UntaggedResponse, capability_code};
use crate::types::{Capabilities, Mailbox, Status};
use crate::{Error, Result};

/// Result payload of a completed command: the tagged status plus the
/// untagged responses that accumulated while it was in flight.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    /// Completion status.
    pub status: Status,
    /// Tagged response text, response code included.
    pub text: String,
    /// Accumulated untagged responses.
    pub untagged: Vec<UntaggedResponse>,
}

impl CommandResponse {
    /// Returns true if the command succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Converts a NO/BAD/BYE completion into the corresponding error.
    ///
    /// # Errors
    ///
    /// [`Error::No`], [`Error::Bad`], or [`Error::Bye`] with the tagged
    /// response text.
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            Status::Ok | Status::PreAuth => Ok(self),
            Status::No => Err(Error::No(self.text)),
            Status::Bad => Err(Error::Bad(self.text)),
            Status::Bye => Err(Error::Bye(self.text)),
        }
    }
}

enum Op {
    Submit {
        request: Box<dyn ImapRequest>,
        reply: Completion<CommandResponse>,
    },
    TerminateIdle,
}

struct Shared {
    /// The pending slot, as seen by submitters.
    busy: AtomicBool,
    /// False once the session is terminal.
    open: AtomicBool,
    capabilities: Mutex<Capabilities>,
    session_id: u64,
}

fn lock_caps(shared: &Shared) -> MutexGuard<'_, Capabilities> {
    shared
        .capabilities
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running IMAP session.
///
/// Cheap to clone; all clones share the one driver task and its pending
/// slot. The session dies on LOGOUT completion, transport failure, a
/// protocol violation, the read-idle limit, or when every handle is
/// dropped.
#[derive(Clone)]
pub struct Session {
    ops: mpsc::UnboundedSender<Op>,
    shared: Arc<Shared>,
}

impl Session {
    pub(crate) fn spawn<S>(
        framed: FramedStream<Transport<S>>,
        config: SessionConfig,
        capabilities: Capabilities,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            busy: AtomicBool::new(false),
            open: AtomicBool::new(true),
            capabilities: Mutex::new(capabilities),
            session_id: config.session_id,
        });

        let span = tracing::info_span!("imap_session", session_id = config.session_id);
        let driver = Driver {
            framed,
            config,
            shared: Arc::clone(&shared),
            ops: ops_rx,
            tags: TagGenerator::default(),
            pending: None,
        };
        tokio::spawn(driver.run().instrument(span));

        Self {
            ops: ops_tx,
            shared,
        }
    }

    /// The session id used for log correlation.
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.shared.session_id
    }

    /// Returns true while the session accepts submissions.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Snapshot of the server's advertised capabilities.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        lock_caps(&self.shared).clone()
    }

    /// Submits a request.
    ///
    /// The returned future resolves with the command's
    /// [`CommandResponse`] (NO and BAD included; see
    /// [`CommandResponse::into_result`]) or with a connection-level error.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionInactive`] if the session is terminal.
    /// - [`Error::CommandInProgress`] if a command is already in flight,
    ///   including the automatic capability refresh that follows
    ///   authentication. Higher layers serialize.
    pub fn submit(
        &self,
        request: Box<dyn ImapRequest>,
    ) -> Result<CommandFuture<CommandResponse>> {
        if !self.is_open() {
            return Err(Error::ConnectionInactive);
        }
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::CommandInProgress);
        }

        let (reply, future) = Completion::channel();
        if self.ops.send(Op::Submit { request, reply }).is_err() {
            self.shared.busy.store(false, Ordering::Release);
            return Err(Error::ConnectionInactive);
        }
        Ok(future)
    }

    async fn run_command(&self, command: Command) -> Result<CommandResponse> {
        self.submit(Box::new(command))?.await?.into_result()
    }

    /// LOGIN with a cleartext password. The line is marked sensitive and
    /// never reaches the debug log unredacted.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn login(&self, username: &str, password: &str) -> Result<CommandResponse> {
        self.run_command(Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
    }

    /// AUTHENTICATE PLAIN (RFC 4616).
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn authenticate_plain(
        &self,
        authzid: Option<&str>,
        authcid: &str,
        password: &str,
    ) -> Result<CommandResponse> {
        let capabilities = self.capabilities();
        let command = AuthPlainCommand::new(authzid, authcid, password, &capabilities);
        self.submit(Box::new(command))?.await?.into_result()
    }

    /// AUTHENTICATE XOAUTH2 (Google/Microsoft proprietary).
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn authenticate_xoauth2(&self, user: &str, token: &str) -> Result<CommandResponse> {
        let capabilities = self.capabilities();
        let command = AuthXoauth2Command::new(user, token, &capabilities);
        self.submit(Box::new(command))?.await?.into_result()
    }

    /// AUTHENTICATE OAUTHBEARER (RFC 7628). `host` and `port` name the
    /// server this session is connected to.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn authenticate_oauthbearer(
        &self,
        user: &str,
        host: &str,
        port: u16,
        token: &str,
    ) -> Result<CommandResponse> {
        let capabilities = self.capabilities();
        let command = AuthOauthBearerCommand::new(user, host, port, token, &capabilities);
        self.submit(Box::new(command))?.await?.into_result()
    }

    /// CAPABILITY command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn capability(&self) -> Result<CommandResponse> {
        self.run_command(Command::Capability).await
    }

    /// NOOP command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn noop(&self) -> Result<CommandResponse> {
        self.run_command(Command::Noop).await
    }

    /// SELECT command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn select(&self, mailbox: &str) -> Result<CommandResponse> {
        self.run_command(Command::Select {
            mailbox: Mailbox::new(mailbox),
        })
        .await
    }

    /// EXAMINE command (read-only SELECT).
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn examine(&self, mailbox: &str) -> Result<CommandResponse> {
        self.run_command(Command::Examine {
            mailbox: Mailbox::new(mailbox),
        })
        .await
    }

    /// CREATE command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn create(&self, mailbox: &str) -> Result<CommandResponse> {
        self.run_command(Command::Create {
            mailbox: Mailbox::new(mailbox),
        })
        .await
    }

    /// DELETE command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn delete(&self, mailbox: &str) -> Result<CommandResponse> {
        self.run_command(Command::Delete {
            mailbox: Mailbox::new(mailbox),
        })
        .await
    }

    /// RENAME command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn rename(&self, from: &str, to: &str) -> Result<CommandResponse> {
        self.run_command(Command::Rename {
            from: Mailbox::new(from),
            to: Mailbox::new(to),
        })
        .await
    }

    /// SUBSCRIBE command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn subscribe(&self, mailbox: &str) -> Result<CommandResponse> {
        self.run_command(Command::Subscribe {
            mailbox: Mailbox::new(mailbox),
        })
        .await
    }

    /// UNSUBSCRIBE command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn unsubscribe(&self, mailbox: &str) -> Result<CommandResponse> {
        self.run_command(Command::Unsubscribe {
            mailbox: Mailbox::new(mailbox),
        })
        .await
    }

    /// LIST command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn list(&self, reference: &str, pattern: &str) -> Result<CommandResponse> {
        self.run_command(Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        })
        .await
    }

    /// NAMESPACE command (RFC 2342).
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn namespace(&self) -> Result<CommandResponse> {
        self.run_command(Command::Namespace).await
    }

    /// STATUS command.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn status(&self, mailbox: &str, items: &[StatusItem]) -> Result<CommandResponse> {
        self.run_command(Command::Status {
            mailbox: Mailbox::new(mailbox),
            items: items.to_vec(),
        })
        .await
    }

    /// COMPRESS DEFLATE (RFC 4978). On OK the session splices DEFLATE
    /// stages into the transport before framing any further inbound byte.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn compress_deflate(&self) -> Result<CommandResponse> {
        self.run_command(Command::CompressDeflate).await
    }

    /// Enters IDLE (RFC 2177). The returned handle streams untagged
    /// responses live; call [`IdleHandle::done`] to end the command.
    ///
    /// # Errors
    ///
    /// Submission errors.
    pub fn idle(&self) -> Result<IdleHandle> {
        let (command, events) = IdleCommand::new();
        let future = self.submit(Box::new(command))?;
        Ok(IdleHandle {
            events,
            future,
            ops: self.ops.clone(),
        })
    }

    /// LOGOUT. The server sends `* BYE` then the tagged OK; the session
    /// then closes the transport and goes terminal.
    ///
    /// # Errors
    ///
    /// Submission errors, connection-level failures, or a NO/BAD
    /// completion.
    pub async fn logout(&self) -> Result<CommandResponse> {
        self.run_command(Command::Logout).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.shared.session_id)
            .field("open", &self.is_open())
            .field("busy", &self.shared.busy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Handle for an active IDLE command.
#[derive(Debug)]
pub struct IdleHandle {
    events: mpsc::UnboundedReceiver<UntaggedResponse>,
    future: CommandFuture<CommandResponse>,
    ops: mpsc::UnboundedSender<Op>,
}

impl IdleHandle {
    /// Waits for the next untagged response. Returns `None` once the
    /// command (or session) has ended.
    pub async fn recv(&mut self) -> Option<UntaggedResponse> {
        self.events.recv().await
    }

    /// Ends IDLE by sending `DONE` and waits for the tagged completion.
    ///
    /// # Errors
    ///
    /// Connection-level failures or a NO/BAD completion.
    pub async fn done(self) -> Result<CommandResponse> {
        if self.ops.send(Op::TerminateIdle).is_err() {
            return Err(Error::ConnectionInactive);
        }
        self.future.await?.into_result()
    }
}

struct PendingEntry {
    tag: String,
    request: Box<dyn ImapRequest>,
    reply: Completion<CommandResponse>,
    untagged: Vec<UntaggedResponse>,
    streaming: Option<mpsc::UnboundedSender<UntaggedResponse>>,
    /// Set once this command's responses carried a capability set.
    saw_capabilities: bool,
    /// Driver-issued capability refresh, not an external submission.
    internal: bool,
    started: Instant,
}

struct Driver<S> {
    framed: FramedStream<Transport<S>>,
    config: SessionConfig,
    shared: Arc<Shared>,
    ops: mpsc::UnboundedReceiver<Op>,
    tags: TagGenerator,
    pending: Option<PendingEntry>,
}

impl<S> Driver<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn run(mut self) {
        let result = self.drive().await;
        self.shutdown(result.as_ref().err()).await;
    }

    async fn drive(&mut self) -> Result<()> {
        loop {
            let read_idle = self.config.read_idle_timeout;
            tokio::select! {
                op = self.ops.recv() => {
                    match op {
                        Some(op) => self.handle_op(op).await?,
                        // Every handle dropped: close quietly.
                        None => return Ok(()),
                    }
                }
                frame = self.framed.read_response() => {
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                            return Err(Error::ConnectionInactive);
                        }
                        Err(e) => return Err(e),
                    };
                    if self.handle_frame(&frame).await? {
                        return Ok(());
                    }
                }
                () = tokio::time::sleep(read_idle), if self.pending.is_some() => {
                    return Err(Error::ReadIdleExceeded(read_idle));
                }
            }
        }
    }

    async fn handle_op(&mut self, op: Op) -> Result<()> {
        match op {
            Op::Submit { request, reply } => {
                if self.pending.is_some() {
                    // The handle-side flag normally rejects this earlier;
                    // the slot check is authoritative.
                    let mut request = request;
                    let mut reply = reply;
                    reply.done(Err(Error::CommandInProgress));
                    request.cleanup();
                    return Ok(());
                }
                self.start_command(request, reply, false).await
            }
            Op::TerminateIdle => {
                let Some(pending) = self.pending.as_mut() else {
                    return Ok(());
                };
                match pending.request.terminator() {
                    Ok(bytes) => {
                        let tag = pending.tag.clone();
                        self.log_frame(&tag, false, "", &bytes);
                        self.framed.write_all(&bytes).await
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "terminate requested for non-terminable command");
                        Ok(())
                    }
                }
            }
        }
    }

    async fn start_command(
        &mut self,
        mut request: Box<dyn ImapRequest>,
        mut reply: Completion<CommandResponse>,
        internal: bool,
    ) -> Result<()> {
        let tag = self.tags.next();
        let line = request.initial_line();
        let sensitive = request.is_sensitive();
        self.log_frame(&tag, sensitive, &request.debug_label(), &line);

        let mut frame = Vec::with_capacity(tag.len() + 1 + line.len());
        frame.extend_from_slice(tag.as_bytes());
        frame.push(b' ');
        frame.extend_from_slice(&line);

        if let Err(e) = self.framed.write_all(&frame).await {
            reply.done(Err(Error::ConnectionInactive));
            request.cleanup();
            return Err(e);
        }

        let streaming = request.streaming_queue();
        self.pending = Some(PendingEntry {
            tag,
            request,
            reply,
            untagged: Vec::new(),
            streaming,
            saw_capabilities: false,
            internal,
            started: Instant::now(),
        });
        Ok(())
    }

    /// Returns `Ok(true)` when the session ends gracefully (LOGOUT).
    async fn handle_frame(&mut self, frame: &[u8]) -> Result<bool> {
        let Some(response) = ServerResponse::parse(frame) else {
            return Err(self.protocol("unparseable server response".to_string()));
        };
        match response {
            ServerResponse::Continuation { text } => {
                self.handle_continuation(&text).await?;
                Ok(false)
            }
            ServerResponse::Tagged(tagged) => self.handle_tagged(tagged).await,
            ServerResponse::Untagged(untagged) => {
                self.handle_untagged(untagged)?;
                Ok(false)
            }
        }
    }

    async fn handle_continuation(&mut self, text: &str) -> Result<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Err(self.protocol("continuation with no command in progress".to_string()));
        };
        match pending.request.continuation(text.as_bytes()) {
            Ok(Some(bytes)) => {
                // Sensitivity is re-read after the request produced the
                // frame; the payload round is the sensitive one.
                let sensitive = pending.request.is_sensitive();
                let label = pending.request.debug_label();
                let tag = pending.tag.clone();
                self.log_frame(&tag, sensitive, &label, &bytes);
                self.framed.write_all(&bytes).await
            }
            Ok(None) => Ok(()),
            Err(err) => {
                let message = format!("continuation rejected: {err}");
                if let Some(mut pending) = self.pending.take() {
                    pending.reply.done(Err(err));
                    pending.request.cleanup();
                }
                Err(self.protocol(message))
            }
        }
    }

    async fn handle_tagged(&mut self, tagged: TaggedResponse) -> Result<bool> {
        let Some(mut pending) = self.pending.take() else {
            return Err(self.protocol(format!(
                "tagged response {} with no command in progress",
                tagged.tag
            )));
        };
        if pending.tag != tagged.tag {
            let message = format!("expected tag {}, got {}", pending.tag, tagged.tag);
            pending.reply.done(Err(Error::Protocol(message.clone())));
            pending.request.cleanup();
            return Err(self.protocol(message));
        }

        // An OK carrying [CAPABILITY ...] supersedes the refresh.
        if let Some(caps) = capability_code(&tagged.text) {
            *lock_caps(&self.shared) = caps;
            pending.saw_capabilities = true;
        }

        let kind = pending.request.kind();
        let succeeded = tagged.status == Status::Ok;
        tracing::debug!(
            tag = %tagged.tag,
            command = kind.name(),
            status = ?tagged.status,
            elapsed_ms = u64::try_from(pending.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "command completed"
        );

        pending.request.cleanup();

        if kind == CommandKind::Logout {
            pending.reply.done(Ok(CommandResponse {
                status: tagged.status,
                text: tagged.text,
                untagged: pending.untagged,
            }));
            return Ok(true);
        }

        if kind == CommandKind::Compress && succeeded {
            // Any bytes already buffered behind the OK belong to the
            // compressed stream; hand them to the decompressor so nothing
            // is framed before it is in place.
            let residual = self.framed.take_residual();
            if let Err(e) = self.framed.stream_mut().enable_deflate(residual) {
                let message = e.to_string();
                pending.reply.done(Err(e));
                return Err(self.protocol(message));
            }
            tracing::debug!("DEFLATE transport stages active");
        }

        let needs_refresh =
            succeeded && kind.refreshes_capabilities() && !pending.saw_capabilities;
        let internal = pending.internal;
        let response = CommandResponse {
            status: tagged.status,
            text: tagged.text,
            untagged: pending.untagged,
        };
        let mut reply = pending.reply;

        if needs_refresh {
            // The advertised set is stale after authentication. Discard it
            // and re-issue CAPABILITY; the slot stays busy until the
            // refresh completes, so external submissions are rejected.
            *lock_caps(&self.shared) = Capabilities::default();
            reply.done(Ok(response));
            self.issue_capability_refresh().await?;
            return Ok(false);
        }

        self.shared.busy.store(false, Ordering::Release);
        if !internal {
            reply.done(Ok(response));
        }
        Ok(false)
    }

    async fn issue_capability_refresh(&mut self) -> Result<()> {
        let (reply, future) = Completion::channel();
        drop(future);
        let request: Box<dyn ImapRequest> = Box::new(Command::Capability);
        // Queued through the same path as external commands so frame
        // ordering and tagging stay uniform.
        self.start_command(request, reply, true).await
    }

    fn handle_untagged(&mut self, untagged: UntaggedResponse) -> Result<()> {
        // A CAPABILITY response replaces the advertised set wholesale.
        if let Some(caps) = untagged.capabilities() {
            *lock_caps(&self.shared) = caps;
            if let Some(pending) = self.pending.as_mut() {
                pending.saw_capabilities = true;
            }
        }

        if untagged.is_bye() {
            let during_logout = self
                .pending
                .as_ref()
                .is_some_and(|p| p.request.kind() == CommandKind::Logout);
            if !during_logout {
                let text = untagged.text();
                if let Some(mut pending) = self.pending.take() {
                    pending.reply.done(Err(Error::Bye(text.clone())));
                    pending.request.cleanup();
                }
                return Err(Error::Bye(text));
            }
        }

        if let Some(pending) = self.pending.as_mut() {
            let streams =
                pending.streaming.is_some() && pending.request.streams(&untagged.keyword);
            if streams {
                if let Some(queue) = &pending.streaming {
                    // The consumer may have gone away; drop silently then.
                    let _ = queue.send(untagged);
                }
            } else {
                pending.untagged.push(untagged);
            }
        } else {
            tracing::debug!(keyword = %untagged.keyword, "unsolicited untagged response");
        }
        Ok(())
    }

    async fn shutdown(&mut self, error: Option<&Error>) {
        self.shared.open.store(false, Ordering::Release);

        if let Some(mut pending) = self.pending.take() {
            pending.reply.done(Err(replicate(error)));
            pending.request.cleanup();
        }

        self.ops.close();
        while let Ok(op) = self.ops.try_recv() {
            if let Op::Submit {
                mut request,
                mut reply,
            } = op
            {
                reply.done(Err(Error::ConnectionInactive));
                request.cleanup();
            }
        }

        self.shared.busy.store(false, Ordering::Release);
        let _ = self.framed.shutdown().await;

        match error {
            Some(e) => tracing::warn!(error = %e, "session terminated"),
            None => tracing::debug!("session closed"),
        }
    }

    fn log_frame(&self, tag: &str, sensitive: bool, label: &str, line: &[u8]) {
        if self.config.debug == DebugMode::Off {
            return;
        }
        if sensitive {
            tracing::debug!("{tag} {label}");
        } else {
            tracing::debug!("{tag} {}", String::from_utf8_lossy(line).trim_end());
        }
    }

    fn protocol(&self, message: String) -> Error {
        Error::Protocol(format!(
            "session {}: {message}",
            self.config.session_id
        ))
    }
}

/// Derives the error delivered to a pending future when the session goes
/// terminal ([`Error`] holds sources that are not `Clone`).
fn replicate(error: Option<&Error>) -> Error {
    match error {
        Some(Error::ReadIdleExceeded(limit)) => Error::ReadIdleExceeded(*limit),
        Some(Error::Bye(text)) => Error::Bye(text.clone()),
        Some(Error::Protocol(message)) => Error::Protocol(message.clone()),
        Some(Error::Io(e)) => Error::Io(io::Error::new(e.kind(), e.to_string())),
        _ => Error::ConnectionInactive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_into_result() {
        let ok = CommandResponse {
            status: Status::Ok,
            text: "done".to_string(),
            untagged: Vec::new(),
        };
        assert!(ok.is_ok());
        assert!(ok.into_result().is_ok());

        let no = CommandResponse {
            status: Status::No,
            text: "denied".to_string(),
            untagged: Vec::new(),
        };
        assert!(matches!(no.into_result(), Err(Error::No(text)) if text == "denied"));

        let bad = CommandResponse {
            status: Status::Bad,
            text: "syntax".to_string(),
            untagged: Vec::new(),
        };
        assert!(matches!(bad.into_result(), Err(Error::Bad(_))));
    }

    #[test]
    fn replicate_preserves_kind() {
        assert!(matches!(
            replicate(Some(&Error::Bye("closing".to_string()))),
            Error::Bye(_)
        ));
        assert!(matches!(
            replicate(Some(&Error::ReadIdleExceeded(
                std::time::Duration::from_secs(1)
            ))),
            Error::ReadIdleExceeded(_)
        ));
        assert!(matches!(replicate(None), Error::ConnectionInactive));
        assert!(matches!(
            replicate(Some(&Error::Cancelled)),
            Error::ConnectionInactive
        ));
    }
}
