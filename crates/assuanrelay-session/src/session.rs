use std::sync::{Arc, Mutex, PoisonError};

use assuanrelay_transport::{AddressingMode, Endpoint, OutboundStream, TransportError};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, Instrument};

use crate::error::{Result, SessionError};
use crate::handler::SessionHandler;
use crate::handshake::send_nonce;

/// Read size for outbound chunks.
pub const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Lifecycle of a [`Session`].
///
/// `Idle → Connecting → Connected → Closed`; `Failed` is entered from
/// `Idle`/`Connecting` when connect fails and from `Connected` on any runtime
/// error: an outbound read or write failure, or a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Closed,
    Failed,
}

struct Shared {
    state: Mutex<SessionState>,
    writer: tokio::sync::Mutex<Option<WriteHalf<OutboundStream>>>,
}

impl Shared {
    fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Connected sessions become Closed; Failed stays Failed.
    fn mark_closed(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == SessionState::Connected {
            *state = SessionState::Closed;
        }
    }
}

/// One outbound connection to an Assuan endpoint.
///
/// The endpoint is resolved on [`connect`](Session::connect). Outbound data
/// is delivered to the handler one chunk at a time; inbound data is sent with
/// [`write`](Session::write).
pub struct Session<H: SessionHandler> {
    endpoint: Endpoint,
    handler: Arc<H>,
    shared: Arc<Shared>,
    mode: Option<AddressingMode>,
    reader: Option<JoinHandle<()>>,
}

impl<H: SessionHandler> Session<H> {
    /// Create an idle session. No I/O happens until `connect`.
    pub fn new(endpoint: Endpoint, handler: H) -> Self {
        Self {
            endpoint,
            handler: Arc::new(handler),
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                writer: tokio::sync::Mutex::new(None),
            }),
            mode: None,
            reader: None,
        }
    }

    /// Resolve the endpoint, open the connection and send the nonce if the
    /// endpoint is a descriptor file.
    ///
    /// Returns once the nonce write completes. Any failure up to that point is
    /// returned here; later failures go to the handler's `on_error`.
    pub async fn connect(&mut self) -> Result<()> {
        if self.shared.state() != SessionState::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        self.shared.set_state(SessionState::Connecting);

        match self.open().await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.shared.set_state(SessionState::Failed);
                Err(err)
            }
        }
    }

    async fn open(&mut self) -> Result<()> {
        let mode = self.endpoint.resolve().await?;
        let mut stream = OutboundStream::connect(&mode).await?;

        if let Some(nonce) = mode.nonce() {
            send_nonce(&mut stream, nonce).await?;
        }

        let (reader, writer) = tokio::io::split(stream);
        *self.shared.writer.lock().await = Some(writer);
        self.shared.set_state(SessionState::Connected);
        info!(mode = mode.name(), target = %mode.target(), "session connected");

        let task = read_loop(reader, Arc::clone(&self.shared), Arc::clone(&self.handler));
        self.reader = Some(tokio::spawn(task.in_current_span()));
        self.mode = Some(mode);
        Ok(())
    }

    /// Send bytes on the outbound connection.
    ///
    /// Resolves once the bytes are written and flushed. A failed write marks
    /// the session `Failed`.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.shared.writer.lock().await;
        let writer = guard.as_mut().ok_or(SessionError::NotConnected)?;
        let written = match writer.write_all(data).await {
            Ok(()) => writer.flush().await,
            Err(err) => Err(err),
        };
        written.map_err(|err| {
            self.shared.set_state(SessionState::Failed);
            TransportError::from(err).into()
        })
    }

    /// End the outbound connection.
    ///
    /// Idempotent: when already disconnected this returns `Ok` without I/O.
    pub async fn close(&self) -> Result<()> {
        let Some(mut writer) = self.shared.writer.lock().await.take() else {
            return Ok(());
        };

        let result = writer.shutdown().await;
        self.shared.mark_closed();
        debug!("outbound write side closed");
        result.map_err(|e| TransportError::from(e).into())
    }

    /// Wait until the outbound read side has finished.
    ///
    /// Returns immediately if the session never connected.
    pub async fn closed(&mut self) {
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// The addressing mode chosen by the last successful `connect`.
    pub fn mode(&self) -> Option<&AddressingMode> {
        self.mode.as_ref()
    }
}

impl<H: SessionHandler> Drop for Session<H> {
    fn drop(&mut self) {
        if let Some(reader) = &self.reader {
            reader.abort();
        }
    }
}

async fn read_loop<H: SessionHandler>(
    mut reader: ReadHalf<OutboundStream>,
    shared: Arc<Shared>,
    handler: Arc<H>,
) {
    let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);

    loop {
        buf.reserve(READ_CHUNK_SIZE);
        match reader.read_buf(&mut buf).await {
            Ok(0) => {
                debug!("outbound peer closed");
                break;
            }
            Ok(size) => {
                trace!(size, "delivering outbound chunk");
                // No further read is issued until the handler settles.
                if let Err(err) = handler.on_data(buf.split().freeze()).await {
                    shared.set_state(SessionState::Failed);
                    handler.on_error(SessionError::Delivery(err));
                }
            }
            Err(err) => {
                shared.set_state(SessionState::Failed);
                handler.on_error(TransportError::from(err).into());
                break;
            }
        }
    }

    shared.writer.lock().await.take();
    shared.mark_closed();

    let notify = async move { handler.on_close().await };
    tokio::spawn(notify.in_current_span());
}
