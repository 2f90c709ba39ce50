use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::endpoint::{AddressingMode, LOOPBACK_HOST};
use crate::error::{Result, TransportError};

/// A connected outbound stream to an Assuan endpoint.
///
/// Wraps a loopback TCP stream (descriptor-file endpoints) or a Unix domain
/// socket stream (direct socket endpoints) behind one `AsyncRead + AsyncWrite`
/// type.
pub struct OutboundStream {
    inner: OutboundStreamInner,
}

enum OutboundStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

impl OutboundStream {
    /// Open the connection described by `mode`.
    ///
    /// No bytes are written; sending the nonce is the caller's job.
    pub async fn connect(mode: &AddressingMode) -> Result<Self> {
        match mode {
            AddressingMode::DirectSocket { path } => Self::connect_direct(path).await,
            AddressingMode::IndirectFile { port, .. } => {
                let stream = TcpStream::connect((LOOPBACK_HOST, *port))
                    .await
                    .map_err(|e| TransportError::Connect {
                        target: mode.target(),
                        source: e,
                    })?;
                stream.set_nodelay(true)?;
                debug!(port, "connected to loopback descriptor port");
                Ok(Self::from_tcp(stream))
            }
        }
    }

    #[cfg(unix)]
    async fn connect_direct(path: &Path) -> Result<Self> {
        let stream = crate::uds::connect(path).await?;
        Ok(Self::from_unix(stream))
    }

    #[cfg(not(unix))]
    async fn connect_direct(path: &Path) -> Result<Self> {
        Err(TransportError::Connect {
            target: path.display().to_string(),
            source: io::Error::new(
                io::ErrorKind::Unsupported,
                "direct socket endpoints require Unix domain sockets",
            ),
        })
    }

    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: OutboundStreamInner::Tcp(stream),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: tokio::net::UnixStream) -> Self {
        Self {
            inner: OutboundStreamInner::Unix(stream),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            OutboundStreamInner::Tcp(_) => "tcp-loopback",
            #[cfg(unix)]
            OutboundStreamInner::Unix(_) => "unix-domain-socket",
        }
    }
}

impl AsyncRead for OutboundStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            OutboundStreamInner::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            OutboundStreamInner::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for OutboundStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            OutboundStreamInner::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            OutboundStreamInner::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            OutboundStreamInner::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            OutboundStreamInner::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            OutboundStreamInner::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            OutboundStreamInner::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for OutboundStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
