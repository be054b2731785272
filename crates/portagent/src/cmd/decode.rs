use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use portagent_packet::{PacketError, PacketReader};
use tracing::{debug, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, packet_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{add_packet_row, packet_table, write_packet, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = open_input(&args.path)?;
    let reader = PacketReader::with_kind(input, args.kind.into());

    let mut table = packet_table();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut decoded = 0usize;
    let mut bad_checksums = 0usize;

    for item in reader {
        let packet = match item {
            Ok(packet) => packet,
            Err(PacketError::ConnectionClosed) => {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!("capture ends with an incomplete packet after {decoded} packets"),
                ));
            }
            Err(err) => return Err(packet_error("decode failed", err)),
        };

        decoded += 1;
        if !packet.checksum_valid() {
            bad_checksums += 1;
            warn!(index = decoded - 1, packet_type = %packet.packet_type(), "checksum mismatch");
        }

        match format {
            OutputFormat::Table => add_packet_row(&mut table, &packet),
            other => write_packet(&mut out, &packet, other)
                .map_err(|err| io_error("write failed", err))?,
        }
    }

    if format == OutputFormat::Table {
        writeln!(out, "{table}").map_err(|err| io_error("write failed", err))?;
    }
    debug!(decoded, bad_checksums, "capture decoded");

    if args.verify && bad_checksums > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{bad_checksums} of {decoded} packets failed checksum verification"),
        ));
    }
    Ok(SUCCESS)
}

fn open_input(path: &Path) -> CliResult<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin()));
    }
    let file = File::open(path)
        .map_err(|err| io_error(&format!("open {}", path.display()), err))?;
    Ok(Box::new(file))
}
