use assuanrelay_session::{RelayConfig, RelayListener};
use assuanrelay_transport::Endpoint;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::{endpoint_path, ServeArgs};
use crate::config::{resolve_flag, DEFAULT_FATAL_SESSION_ERRORS};
use crate::exit::{io_error, session_error, CliResult, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let endpoint = Endpoint::new(endpoint_path(args.socket)?);
    let fatal = resolve_flag(
        "FATAL_SESSION_ERRORS",
        args.fatal_session_errors.as_deref(),
        DEFAULT_FATAL_SESSION_ERRORS,
    );
    let config = RelayConfig::new(endpoint).with_fatal_session_errors(fatal);

    // Sessions are driven from one thread; callbacks never run concurrently
    // with each other.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;
    runtime.block_on(serve(&args.host, args.port, config))
}

async fn serve(host: &str, port: u16, config: RelayConfig) -> CliResult<i32> {
    let listener = RelayListener::bind(host, port, config)
        .await
        .map_err(|err| session_error("listen failed", err))?;

    let listen = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| format!("{host}:{port}"));
    info!(
        endpoint = %listener.config().endpoint.path().display(),
        listen = %listen,
        fatal_session_errors = listener.config().fatal_session_errors,
        "relay started"
    );

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                on_signal.cancel();
            }
            Err(err) => warn!(error = %err, "cannot listen for interrupt"),
        }
    });

    listener
        .run(shutdown)
        .await
        .map_err(|err| session_error("relay stopped", err))?;
    info!("relay stopped");
    Ok(SUCCESS)
}
