use serde::Serialize;

use crate::cmd::BreakArgs;
use crate::exit::{connection_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct BreakOutput<'a> {
    host: &'a str,
    port: u16,
    duration_ms: u32,
    acknowledged: bool,
}

pub fn run(args: BreakArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connect.resolve()?;
    let mut conn = config.connection()?;

    if !conn.command_configured() {
        return Err(CliError::new(
            USAGE,
            "command host and port are required (--command-host, --command-port or --config)",
        ));
    }

    let acknowledged = conn
        .send_break(args.duration)
        .map_err(|err| connection_error("break failed", err))?;

    let out = BreakOutput {
        host: conn.command_host(),
        port: conn.command_port(),
        duration_ms: args.duration,
        acknowledged,
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        _ => println!(
            "break {}ms on {}:{}: {}",
            out.duration_ms,
            out.host,
            out.port,
            if acknowledged { "acknowledged" } else { "not acknowledged" }
        ),
    }

    if acknowledged {
        Ok(SUCCESS)
    } else {
        Err(CliError::new(FAILURE, "serial break not acknowledged"))
    }
}
