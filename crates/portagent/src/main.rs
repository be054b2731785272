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
#[command(name = "portagent", version, about = "Frame, publish and command remote instrument ports")]
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
    let code = match cmd::run(cli.command, format) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("portagent: {err}");
            err.code
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{CaptureKind, FileFormatArg, KindArg};

    #[test]
    fn parses_stream_subcommand() {
        let cli = Cli::try_parse_from([
            "portagent",
            "stream",
            "--kind",
            "tcp",
            "--data-host",
            "10.0.0.5",
            "--data-port",
            "4001",
            "--count",
            "3",
            "--output-format",
            "ascii",
        ])
        .expect("stream args should parse");

        let Command::Stream(args) = cli.command else {
            panic!("expected stream command");
        };
        assert_eq!(args.connect.kind, Some(KindArg::Tcp));
        assert_eq!(args.connect.data_port, Some(4001));
        assert_eq!(args.count, Some(3));
        assert_eq!(args.output_format, FileFormatArg::Ascii);
    }

    #[test]
    fn parses_break_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "portagent",
            "break",
            "--command-host",
            "digi",
            "--command-port",
            "2101",
            "-d",
            "250",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("break args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert_eq!(cli.log_level, LogLevel::Debug);
        let Command::Break(args) = cli.command else {
            panic!("expected break command");
        };
        assert_eq!(args.duration, 250);
    }

    #[test]
    fn decode_defaults_to_port_agent_kind() {
        let cli = Cli::try_parse_from(["portagent", "decode", "capture.bin"])
            .expect("decode args should parse");
        let Command::Decode(args) = cli.command else {
            panic!("expected decode command");
        };
        assert_eq!(args.kind, CaptureKind::PortAgent);
        assert!(!args.verify);
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = Cli::try_parse_from(["portagent", "stream", "--data-port", "70000"])
            .expect_err("port above u16 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
