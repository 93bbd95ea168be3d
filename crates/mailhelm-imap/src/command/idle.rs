//! IDLE command (RFC 2177).

use tokio::sync::mpsc;

use super::{CommandKind, ImapRequest};
use crate::Result;
use crate::response::UntaggedResponse;

/// The IDLE command.
///
/// Two phases: the client sends `IDLE`, the server answers `+ idling`, and
/// from then on untagged responses stream to the queue until the client
/// ends the command with `DONE` and the server sends the tagged
/// completion.
#[derive(Debug)]
pub struct IdleCommand {
    queue: mpsc::UnboundedSender<UntaggedResponse>,
}

impl IdleCommand {
    /// Creates the command and the receiving end of its streaming queue.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UntaggedResponse>) {
        let (queue, events) = mpsc::unbounded_channel();
        (Self { queue }, events)
    }
}

impl ImapRequest for IdleCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Idle
    }

    fn initial_line(&mut self) -> Vec<u8> {
        b"IDLE\r\n".to_vec()
    }

    fn continuation(&mut self, _server_text: &[u8]) -> Result<Option<Vec<u8>>> {
        // "+ idling": the server is ready; there is nothing to send.
        Ok(None)
    }

    fn terminator(&mut self) -> Result<Vec<u8>> {
        Ok(b"DONE\r\n".to_vec())
    }

    fn streaming_queue(&self) -> Option<mpsc::UnboundedSender<UntaggedResponse>> {
        Some(self.queue.clone())
    }

    fn streams(&self, _keyword: &str) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn emits_idle_and_done() {
        let (mut cmd, _events) = IdleCommand::new();
        assert_eq!(cmd.initial_line(), b"IDLE\r\n");
        assert_eq!(cmd.terminator().unwrap(), b"DONE\r\n");
    }

    #[test]
    fn continuation_sends_nothing() {
        let (mut cmd, _events) = IdleCommand::new();
        assert!(cmd.continuation(b"idling").unwrap().is_none());
    }

    #[test]
    fn streams_all_untagged() {
        let (cmd, mut events) = IdleCommand::new();
        assert!(cmd.streams("EXISTS"));
        assert!(cmd.streams("EXPUNGE"));

        let queue = cmd.streaming_queue().unwrap();
        queue
            .send(UntaggedResponse {
                keyword: "EXISTS".to_string(),
                raw: b"* 3 EXISTS\r\n".to_vec(),
            })
            .unwrap();
        assert_eq!(events.try_recv().unwrap().keyword, "EXISTS");
    }

    #[test]
    fn is_never_sensitive() {
        let (cmd, _events) = IdleCommand::new();
        assert!(!cmd.is_sensitive());
        assert_eq!(cmd.debug_label(), "IDLE");
    }
}
