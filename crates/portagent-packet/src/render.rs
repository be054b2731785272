use std::fmt::Write;

use crate::codec::{Packet, PacketKind, SYNC};

const HEX_LINE_WIDTH: usize = 16;

impl Packet {
    /// XML-like envelope around the raw payload, terminated by `\n\r`.
    ///
    /// Payload bytes are not escaped. Each byte becomes the char with the same
    /// code point; use [`Packet::as_ascii_bytes`] for a byte-exact rendering.
    pub fn as_ascii(&self) -> String {
        let (open, close) = self.ascii_tags();
        let mut out = String::with_capacity(open.len() + self.payload().len() + close.len());
        out.push_str(&open);
        out.extend(self.payload().iter().map(|&b| char::from(b)));
        out.push_str(&close);
        out
    }

    /// Same envelope as [`Packet::as_ascii`], with the payload copied verbatim.
    pub fn as_ascii_bytes(&self) -> Vec<u8> {
        let (open, close) = self.ascii_tags();
        let mut out = Vec::with_capacity(open.len() + self.payload().len() + close.len());
        out.extend_from_slice(open.as_bytes());
        out.extend_from_slice(self.payload());
        out.extend_from_slice(close.as_bytes());
        out
    }

    /// Multi-line diagnostic dump: header fields, then the payload as
    /// escaped ASCII and as hex, then the whole buffer as hex.
    pub fn pretty(&self) -> String {
        let mut out = String::new();

        // Infallible: writing into a String.
        let _ = self.write_pretty(&mut out);
        out
    }

    fn ascii_tags(&self) -> (String, String) {
        let label = self.kind().ascii_label();
        let open = match self.kind() {
            // DIGI packets are labelled by type only.
            PacketKind::Rsn => format!("<{label} type=\"{}\">", self.packet_type()),
            PacketKind::Generic | PacketKind::PortAgent => format!(
                "<{label} type=\"{}\" time=\"{}\">",
                self.packet_type(),
                self.timestamp().as_number()
            ),
        };
        (open, format!("</{label}>\n\r"))
    }

    fn write_pretty(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out)?;
        writeln!(out, "Ready to send: {}", self.ready_to_send())?;
        writeln!(out, "Sync: 0x{SYNC:x}")?;
        writeln!(
            out,
            "Type: {} ({})",
            self.packet_type().as_u8(),
            self.packet_type()
        )?;
        writeln!(out, "Size: {}", self.packet_size())?;
        if self.kind() != PacketKind::Rsn {
            writeln!(out, "Checksum: 0x{:04x}", self.checksum())?;
            writeln!(out, "Timestamp: {}", self.timestamp().as_number())?;
        }

        out.push_str("Payload (ascii): ");
        writeln!(out)?;
        for &byte in self.payload() {
            if byte.is_ascii_graphic() || byte == b' ' {
                out.push(char::from(byte));
            } else {
                write!(out, "0x{byte:x}")?;
            }
        }
        writeln!(out)?;

        out.push_str("Payload (hex): ");
        write_hex_lines(out, self.payload())?;
        writeln!(out)?;

        out.push_str("Full packet (hex): ");
        write_hex_lines(out, self.buffer())?;
        writeln!(out)
    }
}

fn write_hex_lines(out: &mut String, bytes: &[u8]) -> std::fmt::Result {
    for line in bytes.chunks(HEX_LINE_WIDTH) {
        writeln!(out)?;
        for byte in line {
            write!(out, "{byte:02x} ")?;
        }
    }
    Ok(())
}
