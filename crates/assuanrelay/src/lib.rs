//! Relay TCP connections to a local gpg-agent over the Assuan socket family.
//!
//! assuanrelay listens on a TCP port and forwards each connection, byte for
//! byte, to an Assuan endpoint: a Unix domain socket, or a descriptor file
//! naming a loopback port plus a nonce (the scheme gpg-agent uses where
//! native local sockets are unavailable).
//!
//! # Crate Structure
//!
//! - [`transport`]: Endpoint resolution and outbound streams
//! - [`session`]: Per-connection sessions, the bridge, and the relay listener

/// Re-export transport types.
pub mod transport {
    pub use assuanrelay_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use assuanrelay_session::*;
}
