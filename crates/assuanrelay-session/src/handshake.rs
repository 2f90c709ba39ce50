use assuanrelay_transport::Nonce;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{Result, SessionError};

/// Send the descriptor nonce as the first bytes of a new connection.
///
/// No reply is expected. An empty nonce writes nothing.
pub async fn send_nonce<W: AsyncWrite + Unpin>(writer: &mut W, nonce: &Nonce) -> Result<()> {
    writer
        .write_all(nonce.as_bytes())
        .await
        .map_err(SessionError::Handshake)?;
    writer.flush().await.map_err(SessionError::Handshake)?;
    debug!(nonce_len = nonce.len(), "sent endpoint nonce");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn writes_nonce_verbatim() {
        let mut out = Vec::new();
        send_nonce(&mut out, &Nonce::new(&b"\x00ABCD\n"[..]))
            .await
            .unwrap();
        assert_eq!(out, b"\x00ABCD\n");
    }

    #[tokio::test]
    async fn empty_nonce_writes_nothing() {
        let mut out = Vec::new();
        send_nonce(&mut out, &Nonce::new(&b""[..])).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn write_failure_is_handshake_error() {
        let result = send_nonce(&mut BrokenWriter, &Nonce::new(&b"ABCD"[..])).await;
        assert!(matches!(result, Err(SessionError::Handshake(_))));
    }
}
