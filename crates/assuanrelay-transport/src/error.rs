use std::path::PathBuf;

/// Errors that can occur while resolving or opening an Assuan endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint descriptor path does not exist.
    #[error("endpoint not found: {path}")]
    NotFound { path: PathBuf },

    /// The descriptor file has no newline separating port and nonce.
    #[error("malformed descriptor file (no newline): {path}")]
    MalformedDescriptor { path: PathBuf },

    /// The port line of the descriptor file is not a valid TCP port.
    #[error("invalid port {value:?} in descriptor file {path}")]
    InvalidPort { path: PathBuf, value: String },

    /// Failed to stat or read the endpoint descriptor.
    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open the outbound connection.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// An I/O error occurred on an established stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
