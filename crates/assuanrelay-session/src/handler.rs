use std::future::Future;

use bytes::Bytes;

use crate::error::SessionError;

/// Receives a session's outbound traffic and lifecycle events.
///
/// The handler is a constructor argument of [`Session`](crate::Session), so it
/// is always in place before `connect` runs.
pub trait SessionHandler: Send + Sync + 'static {
    /// Deliver one chunk read from the outbound connection.
    ///
    /// The outbound read side stays paused until the returned future settles,
    /// so at most one chunk is in flight. An `Err` marks the session `Failed`,
    /// is reported through [`on_error`](Self::on_error), and reading resumes.
    fn on_data(&self, chunk: Bytes) -> impl Future<Output = std::io::Result<()>> + Send;

    /// The outbound connection closed.
    ///
    /// Runs detached: the session does not wait for it before it considers the
    /// connection torn down.
    fn on_close(&self) -> impl Future<Output = ()> + Send;

    /// An error occurred after the session connected.
    fn on_error(&self, err: SessionError);
}
