use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT};
use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept TCP clients and relay each one to the agent endpoint.
    Serve(ServeArgs),
    /// Resolve an agent endpoint and print its addressing mode.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Agent endpoint: a socket path or a port/nonce descriptor file.
    #[arg(long, env = "GPG_AGENT_SOCK", value_name = "PATH")]
    pub socket: Option<PathBuf>,
    /// TCP port to listen on.
    #[arg(long, env = "LISTEN_PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,
    /// Address to listen on.
    #[arg(long, env = "LISTEN_HOST", default_value = DEFAULT_LISTEN_HOST)]
    pub host: String,
    /// Stop with exit code 2 when any session fails (true/false, 1/0, yes/no).
    #[arg(long, env = "FATAL_SESSION_ERRORS", value_name = "BOOL")]
    pub fatal_session_errors: Option<String>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Endpoint path. Defaults to GPG_AGENT_SOCK, then the platform location.
    #[arg(env = "GPG_AGENT_SOCK")]
    pub path: Option<PathBuf>,
    /// Also connect (sending the nonce, if any) and close again.
    #[arg(long)]
    pub probe: bool,
    /// Probe connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// The given endpoint path, or the platform default.
pub(crate) fn endpoint_path(explicit: Option<PathBuf>) -> CliResult<PathBuf> {
    explicit
        .or_else(crate::config::default_agent_socket)
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                "no agent endpoint: set GPG_AGENT_SOCK or pass a path",
            )
        })
}
