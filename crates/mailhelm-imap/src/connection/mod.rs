//! Connection management: dialing, framing, compression, and
//! establishment.

mod connect;
pub(crate) mod deflate;
mod framed;

pub use connect::{Greeting, ImapStream, connect_plain, connect_tls, establish};
pub use deflate::DeflateStream;
pub use framed::FramedStream;
