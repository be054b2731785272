//! Packet type tags.
//!
//! Tags 0-8 are defined by the port agent protocol. Any other byte seen on
//! the wire is kept as [`PacketType::Other`] so that parsing and rendering
//! never fail on an unexpected tag.

use std::fmt;

/// Name rendered for tags outside the known set.
pub const OUT_OF_RANGE: &str = "OUT_OF_RANGE";

/// Packet type carried in byte 3 of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Unknown,
    DataFromInstrument,
    DataFromRsn,
    DataFromDriver,
    PortAgentCommand,
    PortAgentStatus,
    PortAgentFault,
    InstrumentCommand,
    PortAgentHeartbeat,
    /// A tag outside the known range.
    Other(u8),
}

impl PacketType {
    /// Every known packet type, in tag order.
    pub const KNOWN: [PacketType; 9] = [
        PacketType::Unknown,
        PacketType::DataFromInstrument,
        PacketType::DataFromRsn,
        PacketType::DataFromDriver,
        PacketType::PortAgentCommand,
        PacketType::PortAgentStatus,
        PacketType::PortAgentFault,
        PacketType::InstrumentCommand,
        PacketType::PortAgentHeartbeat,
    ];

    /// Wire tag for this type.
    pub fn as_u8(self) -> u8 {
        match self {
            PacketType::Unknown => 0,
            PacketType::DataFromInstrument => 1,
            PacketType::DataFromRsn => 2,
            PacketType::DataFromDriver => 3,
            PacketType::PortAgentCommand => 4,
            PacketType::PortAgentStatus => 5,
            PacketType::PortAgentFault => 6,
            PacketType::InstrumentCommand => 7,
            PacketType::PortAgentHeartbeat => 8,
            PacketType::Other(tag) => tag,
        }
    }

    /// Protocol name for this type, `OUT_OF_RANGE` for unknown tags.
    pub fn as_str(self) -> &'static str {
        match self {
            PacketType::Unknown => "UNKNOWN",
            PacketType::DataFromInstrument => "DATA_FROM_INSTRUMENT",
            PacketType::DataFromRsn => "DATA_FROM_RSN",
            PacketType::DataFromDriver => "DATA_FROM_DRIVER",
            PacketType::PortAgentCommand => "PORT_AGENT_COMMAND",
            PacketType::PortAgentStatus => "PORT_AGENT_STATUS",
            PacketType::PortAgentFault => "PORT_AGENT_FAULT",
            PacketType::InstrumentCommand => "INSTRUMENT_COMMAND",
            PacketType::PortAgentHeartbeat => "PORT_AGENT_HEARTBEAT",
            PacketType::Other(_) => OUT_OF_RANGE,
        }
    }

    /// True for tags 0-8.
    pub fn is_known(self) -> bool {
        !matches!(self, PacketType::Other(_))
    }
}

impl From<u8> for PacketType {
    fn from(tag: u8) -> Self {
        match tag {
            0 => PacketType::Unknown,
            1 => PacketType::DataFromInstrument,
            2 => PacketType::DataFromRsn,
            3 => PacketType::DataFromDriver,
            4 => PacketType::PortAgentCommand,
            5 => PacketType::PortAgentStatus,
            6 => PacketType::PortAgentFault,
            7 => PacketType::InstrumentCommand,
            8 => PacketType::PortAgentHeartbeat,
            other => PacketType::Other(other),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> Self {
        packet_type.as_u8()
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the protocol name for a packet type.
pub fn type_to_string(packet_type: PacketType) -> &'static str {
    packet_type.as_str()
}
