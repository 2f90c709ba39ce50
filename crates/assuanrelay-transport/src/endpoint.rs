use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};

/// Host used to reach the TCP port named by a descriptor file.
pub const LOOPBACK_HOST: &str = "localhost";

/// Handshake secret read from a descriptor file.
///
/// Treated as opaque credential material: the bytes are sent verbatim and are
/// redacted in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce(Bytes);

impl Nonce {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted:{} bytes>", self.0.len())
    }
}

/// How an endpoint descriptor is reached, decided once per connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    /// The descriptor path is itself a local stream socket.
    DirectSocket { path: PathBuf },
    /// The descriptor path is a file naming a loopback port and a nonce.
    IndirectFile { port: u16, nonce: Nonce },
}

impl AddressingMode {
    /// Short mode name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            AddressingMode::DirectSocket { .. } => "direct-socket",
            AddressingMode::IndirectFile { .. } => "indirect-file",
        }
    }

    /// The nonce to send on open, if this mode requires one.
    pub fn nonce(&self) -> Option<&Nonce> {
        match self {
            AddressingMode::DirectSocket { .. } => None,
            AddressingMode::IndirectFile { nonce, .. } => Some(nonce),
        }
    }

    /// Human-readable connection target (never includes the nonce).
    pub fn target(&self) -> String {
        match self {
            AddressingMode::DirectSocket { path } => path.display().to_string(),
            AddressingMode::IndirectFile { port, .. } => format!("{LOOPBACK_HOST}:{port}"),
        }
    }
}

/// A filesystem path naming an Assuan endpoint.
///
/// Construction performs no I/O; the path is inspected by [`Endpoint::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: PathBuf,
}

impl Endpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The descriptor path as configured.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inspect the descriptor path and decide the addressing mode.
    ///
    /// A regular file is parsed as a nonce descriptor; anything else (socket,
    /// device node) is connected to directly. The existence check runs first
    /// so a missing path never reaches the stat.
    pub async fn resolve(&self) -> Result<AddressingMode> {
        let dest = std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone());

        let exists = tokio::fs::try_exists(&dest)
            .await
            .map_err(|e| inspect_error(&dest, e))?;
        if !exists {
            return Err(TransportError::NotFound { path: dest });
        }

        let metadata = tokio::fs::metadata(&dest)
            .await
            .map_err(|e| inspect_error(&dest, e))?;

        if !metadata.is_file() {
            debug!(path = ?dest, "endpoint is a socket path");
            return Ok(AddressingMode::DirectSocket { path: dest });
        }

        let contents = tokio::fs::read(&dest)
            .await
            .map_err(|e| inspect_error(&dest, e))?;
        let (port, nonce) = parse_descriptor(&dest, Bytes::from(contents))?;
        debug!(path = ?dest, port, nonce_len = nonce.len(), "endpoint is a descriptor file");

        Ok(AddressingMode::IndirectFile { port, nonce })
    }
}

/// Parse descriptor file contents: `<decimal port>\n<nonce bytes>`.
///
/// Everything after the first newline is the nonce, verbatim and possibly
/// empty. Surrounding ASCII whitespace on the port line (including a `\r`
/// from CRLF files) is ignored. Port 0 is rejected.
pub fn parse_descriptor(path: &Path, contents: Bytes) -> Result<(u16, Nonce)> {
    let newline = contents
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| TransportError::MalformedDescriptor {
            path: path.to_path_buf(),
        })?;

    let port_text = String::from_utf8_lossy(&contents[..newline]);
    let port_text = port_text.trim();
    let port = port_text
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| TransportError::InvalidPort {
            path: path.to_path_buf(),
            value: port_text.to_string(),
        })?;

    Ok((port, Nonce::new(contents.slice(newline + 1..))))
}

fn inspect_error(path: &Path, source: std::io::Error) -> TransportError {
    TransportError::Inspect {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/arelay-endpoint-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    fn parse(contents: &'static [u8]) -> Result<(u16, Nonce)> {
        parse_descriptor(Path::new("S.gpg-agent"), Bytes::from_static(contents))
    }

    #[test]
    fn parses_port_and_nonce() {
        let (port, nonce) = parse(b"7777\nABCD").unwrap();
        assert_eq!(port, 7777);
        assert_eq!(nonce.as_bytes(), b"ABCD");
    }

    #[test]
    fn empty_nonce_is_allowed() {
        let (port, nonce) = parse(b"1234\n").unwrap();
        assert_eq!(port, 1234);
        assert!(nonce.is_empty());
    }

    #[test]
    fn nonce_keeps_binary_bytes_and_later_newlines() {
        let (_, nonce) = parse(b"5000\n\x00\xff\n\r\x01").unwrap();
        assert_eq!(nonce.as_bytes(), b"\x00\xff\n\r\x01");
    }

    #[test]
    fn crlf_port_line_is_accepted() {
        let (port, nonce) = parse(b"6000\r\nxyz").unwrap();
        assert_eq!(port, 6000);
        assert_eq!(nonce.as_bytes(), b"xyz");
    }

    #[test]
    fn missing_newline_is_malformed() {
        let result = parse(b"7777");
        assert!(matches!(
            result,
            Err(TransportError::MalformedDescriptor { .. })
        ));
        assert!(matches!(
            parse(b""),
            Err(TransportError::MalformedDescriptor { .. })
        ));
    }

    #[test]
    fn non_numeric_port_is_invalid() {
        match parse(b"gpg\nABCD") {
            Err(TransportError::InvalidPort { value, .. }) => assert_eq!(value, "gpg"),
            other => panic!("expected InvalidPort, got {other:?}"),
        }
        assert!(matches!(
            parse(b"\nABCD"),
            Err(TransportError::InvalidPort { .. })
        ));
        assert!(matches!(
            parse(b"70000\nABCD"),
            Err(TransportError::InvalidPort { .. })
        ));
        assert!(matches!(
            parse(b"0\nABCD"),
            Err(TransportError::InvalidPort { .. })
        ));
    }

    #[test]
    fn nonce_debug_is_redacted() {
        let nonce = Nonce::new(&b"super-secret"[..]);
        let rendered = format!("{:?}", AddressingMode::IndirectFile { port: 1, nonce });
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted:12 bytes>"));
    }

    #[tokio::test]
    async fn resolve_missing_path_is_not_found() {
        let dir = unique_temp_dir("missing");
        let endpoint = Endpoint::new(dir.join("S.gpg-agent.extra"));

        let result = endpoint.resolve().await;
        assert!(matches!(result, Err(TransportError::NotFound { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn resolve_regular_file_is_indirect() {
        let dir = unique_temp_dir("file");
        let path = dir.join("S.gpg-agent");
        std::fs::write(&path, b"7777\nABCD").unwrap();

        let mode = Endpoint::new(&path).resolve().await.unwrap();
        assert_eq!(mode.name(), "indirect-file");
        assert_eq!(mode.target(), "localhost:7777");
        assert_eq!(mode.nonce().map(Nonce::as_bytes), Some(&b"ABCD"[..]));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn resolve_malformed_file_fails() {
        let dir = unique_temp_dir("malformed");
        let path = dir.join("S.gpg-agent");
        std::fs::write(&path, b"7777").unwrap();

        let result = Endpoint::new(&path).resolve().await;
        assert!(matches!(
            result,
            Err(TransportError::MalformedDescriptor { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_socket_is_direct() {
        let dir = unique_temp_dir("sock");
        let path = dir.join("S.gpg-agent");
        let _listener = tokio::net::UnixListener::bind(&path).unwrap();

        let mode = Endpoint::new(&path).resolve().await.unwrap();
        assert_eq!(mode, AddressingMode::DirectSocket { path: path.clone() });
        assert!(mode.nonce().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
