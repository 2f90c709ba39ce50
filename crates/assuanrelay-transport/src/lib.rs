//! Assuan endpoint resolution and outbound transport.
//!
//! An Assuan endpoint is named by a filesystem path that is either:
//! - a Unix domain socket, connected to directly, or
//! - a descriptor file (`<port>\n<nonce>`) naming a loopback TCP port plus a
//!   nonce that must be the first bytes sent on the new connection.
//!
//! This is the lowest layer of assuanrelay. Sessions build on the
//! [`AddressingMode`] and [`OutboundStream`] types provided here.

pub mod endpoint;
pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use endpoint::{parse_descriptor, AddressingMode, Endpoint, Nonce, LOOPBACK_HOST};
pub use error::{Result, TransportError};
pub use stream::OutboundStream;
