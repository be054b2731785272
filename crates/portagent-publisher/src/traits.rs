use portagent_packet::Packet;
use tracing::error;

use crate::error::Result;

/// A downstream consumer of framed packets.
///
/// Implementors provide [`Publisher::publish`]; callers use
/// [`Publisher::handle`], which never fails and reports delivery as a bool.
pub trait Publisher {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Deliver one packet.
    fn publish(&mut self, packet: &Packet) -> Result<()>;

    /// Deliver one packet, logging any failure. Returns true on success.
    fn handle(&mut self, packet: &Packet) -> bool {
        match self.publish(packet) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    publisher = self.name(),
                    packet_type = %packet.packet_type(),
                    error = %err,
                    "failed to publish packet"
                );
                false
            }
        }
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn publish(&mut self, packet: &Packet) -> Result<()> {
        (**self).publish(packet)
    }

    fn handle(&mut self, packet: &Packet) -> bool {
        (**self).handle(packet)
    }
}
