//! Core IMAP types.

mod capability;
mod mailbox;
pub mod utf7;

pub use capability::{Capabilities, Status, names};
pub use mailbox::Mailbox;
