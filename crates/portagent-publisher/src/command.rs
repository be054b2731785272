use portagent_packet::{Packet, PacketType};
use portagent_transport::CommSocket;
use tracing::{debug, trace};

use crate::error::Result;
use crate::traits::Publisher;

/// Writes `INSTRUMENT_COMMAND` payloads to the instrument's command socket.
///
/// Packets of any other type are not for this publisher and are accepted
/// without doing anything.
pub struct InstrumentCommandPublisher<S> {
    socket: S,
}

impl<S: CommSocket> InstrumentCommandPublisher<S> {
    pub fn new(socket: S) -> Self {
        Self { socket }
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    pub fn into_inner(self) -> S {
        self.socket
    }
}

impl<S: CommSocket> Publisher for InstrumentCommandPublisher<S> {
    fn name(&self) -> &str {
        "instrument_command"
    }

    fn publish(&mut self, packet: &Packet) -> Result<()> {
        if packet.packet_type() != PacketType::InstrumentCommand {
            trace!(packet_type = %packet.packet_type(), "not an instrument command, ignored");
            return Ok(());
        }

        debug!(
            endpoint = %self.socket.endpoint(),
            length = packet.payload().len(),
            "forwarding instrument command"
        );
        self.socket.write_data(packet.payload())?;
        Ok(())
    }
}
