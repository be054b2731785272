use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use portagent_packet::{Packet, PacketKind};
use portagent_publisher::{Publisher, Result as PublishResult};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Ascii,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    kind: &'static str,
    packet_type: &'static str,
    type_code: u8,
    size: u16,
    checksum: String,
    checksum_valid: bool,
    timestamp: String,
    payload: String,
}

impl PacketOutput {
    fn new(packet: &Packet) -> Self {
        Self {
            kind: kind_name(packet.kind()),
            packet_type: packet.packet_type().as_str(),
            type_code: packet.packet_type().as_u8(),
            size: packet.packet_size(),
            checksum: format!("0x{:04x}", packet.checksum()),
            checksum_valid: packet.checksum_valid(),
            timestamp: packet.timestamp().as_number(),
            payload: payload_preview(packet.payload()),
        }
    }
}

/// Render one packet to `out`.
pub fn write_packet(out: &mut dyn Write, packet: &Packet, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let line = serde_json::to_string(&PacketOutput::new(packet))
                .unwrap_or_else(|_| "{}".to_string());
            writeln!(out, "{line}")?;
        }
        OutputFormat::Table => {
            let mut table = packet_table();
            add_packet_row(&mut table, packet);
            writeln!(out, "{table}")?;
        }
        OutputFormat::Pretty => out.write_all(packet.pretty().as_bytes())?,
        OutputFormat::Ascii => out.write_all(&packet.as_ascii_bytes())?,
        OutputFormat::Raw => out.write_all(packet.buffer())?,
    }
    out.flush()
}

/// Empty packet table with headers.
pub fn packet_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["TYPE", "SIZE", "TIMESTAMP", "CHECKSUM", "PAYLOAD"]);
    table
}

pub fn add_packet_row(table: &mut Table, packet: &Packet) {
    let checksum = if packet.checksum_valid() {
        format!("0x{:04x}", packet.checksum())
    } else {
        format!("0x{:04x} (bad)", packet.checksum())
    };
    table.add_row(vec![
        packet.packet_type().to_string(),
        packet.packet_size().to_string(),
        packet.timestamp().as_number(),
        checksum,
        payload_preview(packet.payload()),
    ]);
}

/// Prints every packet it is handed to stdout.
pub struct ConsolePublisher {
    format: OutputFormat,
}

impl ConsolePublisher {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Publisher for ConsolePublisher {
    fn name(&self) -> &str {
        "console"
    }

    fn publish(&mut self, packet: &Packet) -> PublishResult<()> {
        let mut out = io::stdout().lock();
        write_packet(&mut out, packet, self.format)?;
        Ok(())
    }
}

fn kind_name(kind: PacketKind) -> &'static str {
    match kind {
        PacketKind::Generic => "generic",
        PacketKind::Rsn => "rsn",
        PacketKind::PortAgent => "port_agent",
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.escape_debug().to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
