use std::time::Duration;

use assuanrelay_session::send_nonce;
use assuanrelay_transport::{AddressingMode, Endpoint, OutboundStream};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::cmd::{endpoint_path, InfoArgs};
use crate::exit::{
    io_error, session_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_json, print_pretty, print_table, OutputFormat};

#[derive(Serialize)]
struct EndpointInfo {
    path: String,
    mode: &'static str,
    target: String,
    port: Option<u16>,
    nonce_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transport: Option<&'static str>,
    probed: bool,
}

impl EndpointInfo {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Path", self.path.clone()),
            ("Mode", self.mode.to_string()),
            ("Target", self.target.clone()),
        ];
        if let Some(port) = self.port {
            rows.push(("Port", port.to_string()));
        }
        if let Some(len) = self.nonce_len {
            rows.push(("Nonce", format!("{len} bytes")));
        }
        if let Some(transport) = self.transport {
            rows.push(("Probe", format!("ok ({transport})")));
        }
        rows
    }
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let endpoint = Endpoint::new(endpoint_path(args.path)?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;
    let out = runtime.block_on(inspect(&endpoint, args.probe, timeout))?;

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(&out.rows()),
        OutputFormat::Pretty => print_pretty("Endpoint", &out.rows()),
        OutputFormat::Raw => println!("{}", out.mode),
    }
    Ok(SUCCESS)
}

async fn inspect(endpoint: &Endpoint, probe: bool, timeout: Duration) -> CliResult<EndpointInfo> {
    let mode = endpoint
        .resolve()
        .await
        .map_err(|err| transport_error("resolve failed", err))?;

    let transport = if probe {
        let probed = tokio::time::timeout(timeout, probe_endpoint(&mode))
            .await
            .map_err(|_| {
                CliError::new(TIMEOUT, format!("probe timed out after {timeout:?}"))
            })??;
        Some(probed)
    } else {
        None
    };

    let (port, nonce_len) = match &mode {
        AddressingMode::DirectSocket { .. } => (None, None),
        AddressingMode::IndirectFile { port, nonce } => (Some(*port), Some(nonce.len())),
    };

    Ok(EndpointInfo {
        path: endpoint.path().display().to_string(),
        mode: mode.name(),
        target: mode.target(),
        port,
        nonce_len,
        transport,
        probed: probe,
    })
}

/// Open the outbound connection the relay would open, then close it.
async fn probe_endpoint(mode: &AddressingMode) -> CliResult<&'static str> {
    let mut stream = OutboundStream::connect(mode)
        .await
        .map_err(|err| transport_error("probe failed", err))?;
    if let Some(nonce) = mode.nonce() {
        send_nonce(&mut stream, nonce)
            .await
            .map_err(|err| session_error("probe failed", err))?;
    }
    let transport = stream.transport_name();
    let _ = stream.shutdown().await;
    Ok(transport)
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
