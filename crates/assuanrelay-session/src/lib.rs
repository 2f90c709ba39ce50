//! Per-connection Assuan relay sessions.
//!
//! A [`Session`] owns one outbound connection to an Assuan endpoint: it
//! resolves the endpoint, sends the descriptor nonce when required, and
//! delivers outbound data to a [`SessionHandler`] one chunk at a time.
//! [`RelayListener`] accepts TCP clients and pairs each with a session so the
//! two streams relay in both directions and close together.

mod bridge;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod listener;
pub mod session;

pub use bridge::INBOUND_CHUNK_SIZE;
pub use error::{Result, SessionError};
pub use handler::SessionHandler;
pub use handshake::send_nonce;
pub use listener::{RelayConfig, RelayListener};
pub use session::{Session, SessionState, READ_CHUNK_SIZE};
