use std::io;
use std::net::SocketAddr;

use assuanrelay_transport::Endpoint;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::bridge::{relay, FatalReporter};
use crate::error::{Result, SessionError};

/// Relay behavior shared by every accepted connection.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Endpoint descriptor each session connects to.
    pub endpoint: Endpoint,
    /// Escalate session runtime errors to a listener failure.
    pub fatal_session_errors: bool,
}

impl RelayConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            fatal_session_errors: false,
        }
    }

    pub fn with_fatal_session_errors(mut self, fatal: bool) -> Self {
        self.fatal_session_errors = fatal;
        self
    }
}

/// Accepts inbound TCP connections and relays each one to the endpoint.
pub struct RelayListener {
    listener: TcpListener,
    config: RelayConfig,
}

impl RelayListener {
    /// Bind the listening socket.
    pub async fn bind(host: &str, port: u16, config: RelayConfig) -> Result<Self> {
        let listener =
            TcpListener::bind((host, port))
                .await
                .map_err(|source| SessionError::Bind {
                    addr: format!("{host}:{port}"),
                    source,
                })?;

        info!(
            addr = ?listener.local_addr().ok(),
            endpoint = ?config.endpoint.path(),
            "relay listening"
        );

        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Accept and relay connections until `shutdown` is cancelled.
    ///
    /// Returns `Ok` on shutdown. Returns `Err` when accepting fails with a
    /// non-transient error, or when a session error is escalated by
    /// [`RelayConfig::fatal_session_errors`]. Open connections are aborted
    /// when this returns.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
        let reporter = FatalReporter::new(self.config.fatal_session_errors, fatal_tx);
        let mut connections = JoinSet::new();
        let mut next_conn_id = 0u64;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!(open = connections.len(), "relay shutting down");
                    return Ok(());
                }
                Some(event) = fatal_rx.recv() => {
                    error!(conn_id = event.conn_id, err = %event.error, "fatal session error");
                    return Err(SessionError::Fatal {
                        conn_id: event.conn_id,
                        source: Box::new(event.error),
                    });
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) if is_transient_accept_error(&err) => {
                            warn!(%err, "accept failed, continuing");
                            continue;
                        }
                        Err(err) => return Err(SessionError::Accept(err)),
                    };

                    next_conn_id += 1;
                    let conn_id = next_conn_id;
                    info!(conn_id, %peer, "client connected");

                    let span = info_span!("relay", conn_id, %peer);
                    connections.spawn(
                        relay(stream, conn_id, self.config.endpoint.clone(), reporter.clone())
                            .instrument(span),
                    );
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
    }
}

fn is_transient_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_accept_errors() {
        assert!(is_transient_accept_error(&io::ErrorKind::ConnectionAborted.into()));
        assert!(is_transient_accept_error(&io::ErrorKind::Interrupted.into()));
        assert!(!is_transient_accept_error(&io::ErrorKind::PermissionDenied.into()));
        assert!(!is_transient_accept_error(&io::Error::other("emfile")));
    }

    #[test]
    fn config_defaults_to_non_fatal() {
        let config = RelayConfig::new(Endpoint::new("/run/user/1000/gnupg/S.gpg-agent.extra"));
        assert!(!config.fatal_session_errors);
        assert!(config.with_fatal_session_errors(true).fatal_session_errors);
    }

    #[tokio::test]
    async fn bind_reports_local_addr_and_stops_on_shutdown() {
        let listener = RelayListener::bind(
            "127.0.0.1",
            0,
            RelayConfig::new(Endpoint::new("/nonexistent/S.gpg-agent")),
        )
        .await
        .expect("listener should bind");
        assert_ne!(listener.local_addr().unwrap().port(), 0);

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        listener.run(shutdown).await.expect("shutdown should be graceful");
    }

    #[tokio::test]
    async fn bind_conflict_is_bind_error() {
        let first = RelayListener::bind(
            "127.0.0.1",
            0,
            RelayConfig::new(Endpoint::new("/nonexistent/S.gpg-agent")),
        )
        .await
        .unwrap();
        let port = first.local_addr().unwrap().port();

        let second = RelayListener::bind(
            "127.0.0.1",
            port,
            RelayConfig::new(Endpoint::new("/nonexistent/S.gpg-agent")),
        )
        .await;
        assert!(matches!(second, Err(SessionError::Bind { .. })));
    }
}
