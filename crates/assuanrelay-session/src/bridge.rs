use assuanrelay_transport::Endpoint;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::handler::SessionHandler;
use crate::session::Session;

/// Read size for inbound chunks.
pub const INBOUND_CHUNK_SIZE: usize = 16 * 1024;

/// A session error escalated to the listener.
#[derive(Debug)]
pub(crate) struct FatalEvent {
    pub conn_id: u64,
    pub error: SessionError,
}

/// Forwards session errors to the listener when the fatal-error policy is on.
#[derive(Clone)]
pub(crate) struct FatalReporter {
    enabled: bool,
    tx: mpsc::UnboundedSender<FatalEvent>,
}

impl FatalReporter {
    pub fn new(enabled: bool, tx: mpsc::UnboundedSender<FatalEvent>) -> Self {
        Self { enabled, tx }
    }

    fn report(&self, conn_id: u64, error: SessionError) {
        if self.enabled {
            let _ = self.tx.send(FatalEvent { conn_id, error });
        }
    }
}

/// Session handler that writes outbound data to the inbound TCP peer.
struct InboundSink {
    conn_id: u64,
    writer: Mutex<OwnedWriteHalf>,
    fatal: FatalReporter,
}

impl SessionHandler for InboundSink {
    async fn on_data(&self, chunk: Bytes) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&chunk).await?;
        writer.flush().await
    }

    async fn on_close(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.shutdown().await {
            debug!(conn_id = self.conn_id, %err, "inbound shutdown failed");
        }
        info!(conn_id = self.conn_id, "outbound closed, inbound ended");
    }

    fn on_error(&self, err: SessionError) {
        error!(conn_id = self.conn_id, %err, "session error");
        self.fatal.report(self.conn_id, err);
    }
}

/// Relay one accepted inbound connection until both directions finish.
///
/// Outbound data reaches the inbound peer through the session handler, so
/// the outbound side is only read as fast as the inbound peer accepts data.
/// A failed connect drops the inbound stream, closing it. A failed outbound
/// write ends the connection in both directions.
pub(crate) async fn relay(
    inbound: TcpStream,
    conn_id: u64,
    endpoint: Endpoint,
    fatal: FatalReporter,
) {
    let (mut inbound_read, inbound_write) = inbound.into_split();
    let sink = InboundSink {
        conn_id,
        writer: Mutex::new(inbound_write),
        fatal: fatal.clone(),
    };
    let mut session = Session::new(endpoint, sink);

    if let Err(err) = session.connect().await {
        warn!(%err, "outbound connect failed, closing inbound connection");
        return;
    }

    let mut buf = BytesMut::with_capacity(INBOUND_CHUNK_SIZE);
    let mut outbound_failed = false;
    loop {
        buf.clear();
        match inbound_read.read_buf(&mut buf).await {
            Ok(0) => {
                debug!("inbound peer closed");
                break;
            }
            Ok(_) => match session.write(&buf).await {
                Ok(()) => {}
                Err(SessionError::NotConnected) => {
                    debug!("outbound already closed, dropping inbound data");
                    break;
                }
                Err(err) => {
                    warn!(%err, "failed to forward inbound data");
                    fatal.report(conn_id, err);
                    outbound_failed = true;
                    break;
                }
            },
            Err(err) => {
                warn!(%err, "inbound stream error");
                break;
            }
        }
    }

    if outbound_failed {
        // Dropping the session stops its reader and releases the inbound
        // write half, ending the inbound connection without draining.
        drop(session);
        info!("connection closed after outbound write failure");
        return;
    }

    if let Err(err) = session.close().await {
        debug!(%err, "outbound close failed");
    }
    session.closed().await;
    info!("connection closed");
}
