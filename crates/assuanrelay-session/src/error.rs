/// Errors that can occur in session and relay operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Endpoint resolution or transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] assuanrelay_transport::TransportError),

    /// Sending the descriptor nonce failed; the connection attempt is aborted.
    #[error("handshake failed: {0}")]
    Handshake(#[source] std::io::Error),

    /// No active outbound connection.
    #[error("session not connected")]
    NotConnected,

    /// `connect` was called on a session that already left the idle state.
    #[error("session already started")]
    AlreadyStarted,

    /// The data handler failed to deliver an outbound chunk.
    #[error("delivery failed: {0}")]
    Delivery(#[source] std::io::Error),

    /// Failed to bind the relay listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The relay listening socket failed to accept.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// A session error escalated by the fatal-error policy.
    #[error("fatal error on connection {conn_id}: {source}")]
    Fatal {
        conn_id: u64,
        source: Box<SessionError>,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
