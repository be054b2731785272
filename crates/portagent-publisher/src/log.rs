use portagent_packet::Packet;
use tracing::info;

use crate::error::Result;
use crate::traits::Publisher;

/// Emits one `tracing` event per packet.
#[derive(Debug, Default)]
pub struct LogPublisher {
    count: u64,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets logged so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Publisher for LogPublisher {
    fn name(&self) -> &str {
        "log"
    }

    fn publish(&mut self, packet: &Packet) -> Result<()> {
        self.count += 1;
        info!(
            packet_type = %packet.packet_type(),
            size = packet.packet_size(),
            timestamp = %packet.timestamp(),
            checksum_valid = packet.checksum_valid(),
            payload = %String::from_utf8_lossy(packet.payload()).escape_debug(),
            "packet"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use portagent_packet::{PacketType, Timestamp};

    use super::*;

    #[test]
    fn logs_every_packet() {
        let packet =
            Packet::new(PacketType::PortAgentHeartbeat, Timestamp::now(), b"").unwrap();
        let mut publisher = LogPublisher::new();
        assert!(publisher.handle(&packet));
        assert!(publisher.handle(&packet));
        assert_eq!(publisher.count(), 2);
    }
}
