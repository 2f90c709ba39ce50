mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "assuanrelay",
    version,
    about = "Relay TCP connections to a local gpg-agent socket"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::ServeArgs;

    #[test]
    fn parses_serve_with_flags() {
        let cli = Cli::try_parse_from([
            "assuanrelay",
            "serve",
            "--socket",
            "/tmp/S.gpg-agent.extra",
            "--port",
            "4100",
            "--host",
            "127.0.0.1",
            "--fatal-session-errors",
            "yes",
        ])
        .expect("serve args should parse");

        let Command::Serve(ServeArgs {
            socket,
            port,
            host,
            fatal_session_errors,
        }) = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(socket.as_deref(), Some(std::path::Path::new("/tmp/S.gpg-agent.extra")));
        assert_eq!(port, 4100);
        assert_eq!(host, "127.0.0.1");
        assert_eq!(fatal_session_errors.as_deref(), Some("yes"));
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = Cli::try_parse_from(["assuanrelay", "serve", "--port", "70000"])
            .expect_err("port above u16 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_info_with_probe() {
        let cli = Cli::try_parse_from([
            "assuanrelay",
            "--format",
            "json",
            "info",
            "/tmp/S.gpg-agent",
            "--probe",
            "--timeout",
            "500ms",
        ])
        .expect("info args should parse");
        assert!(matches!(cli.command, Command::Info(ref args) if args.probe));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }

    #[test]
    fn parses_version_subcommand() {
        let cli = Cli::try_parse_from(["assuanrelay", "version", "--extended"])
            .expect("version args should parse");
        assert!(matches!(cli.command, Command::Version(ref args) if args.extended));
    }
}
