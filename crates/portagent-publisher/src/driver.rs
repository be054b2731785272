use std::io::Write;

use portagent_packet::{Packet, PacketWriter};
use tracing::trace;

use crate::error::Result;
use crate::traits::Publisher;

/// Forwards binary packets to a driver connection.
pub struct DriverPublisher<W> {
    writer: PacketWriter<W>,
}

impl<W: Write> DriverPublisher<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: PacketWriter::new(inner),
        }
    }

    /// Bytes forwarded so far.
    pub fn bytes_written(&self) -> u64 {
        self.writer.bytes_written()
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> Publisher for DriverPublisher<W> {
    fn name(&self) -> &str {
        "driver"
    }

    fn publish(&mut self, packet: &Packet) -> Result<()> {
        trace!(packet_type = %packet.packet_type(), size = packet.packet_size(), "to driver");
        self.writer.write_packet(packet)?;
        Ok(())
    }
}
