use bytes::{Buf, BufMut};
use tracing::trace;

use crate::error::{PacketError, Result};
use crate::packet_type::PacketType;
use crate::timestamp::Timestamp;

/// Header: sync (3) + type (1) + size (2) + checksum (2) + timestamp (8) = 16 bytes.
pub const HEADER_SIZE: usize = 16;

/// Sync marker, 24 bits.
pub const SYNC: u32 = 0xA3_9D_7A;

/// Sync marker as it appears on the wire.
pub const SYNC_BYTES: [u8; 3] = [0xA3, 0x9D, 0x7A];

/// Byte offset of the checksum field.
pub const CHECKSUM_OFFSET: usize = 6;

/// Largest total packet size the 16-bit size field can express.
pub const MAX_PACKET_SIZE: usize = u16::MAX as usize;

/// Largest payload that fits in a packet.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - HEADER_SIZE;

/// Where a packet came from. Selects labels and rendering details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// A packet with no more specific origin.
    Generic,
    /// A packet received already framed from an RSN DIGI.
    Rsn,
    /// A packet built by the port agent itself.
    PortAgent,
}

impl PacketKind {
    /// Element name used by [`Packet::as_ascii`].
    pub fn ascii_label(self) -> &'static str {
        match self {
            PacketKind::Generic => "packet",
            PacketKind::Rsn => "rsn_packet",
            PacketKind::PortAgent => "port_agent_packet",
        }
    }
}

/// A framed, checksummed port agent packet.
///
/// The packet owns its wire buffer exclusively; `Clone` is a deep copy.
/// Header fields are decoded once at construction and never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: PacketKind,
    packet_type: PacketType,
    checksum: u16,
    timestamp: Timestamp,
    buffer: Vec<u8>,
}

impl Packet {
    /// Build a port agent packet.
    pub fn new(packet_type: PacketType, timestamp: Timestamp, payload: &[u8]) -> Result<Self> {
        Self::build(PacketKind::PortAgent, packet_type, timestamp, payload)
    }

    /// Build a packet of the given kind from its parts.
    ///
    /// Fails before allocating when the type is UNKNOWN or the payload does
    /// not fit in the size field.
    pub fn build(
        kind: PacketKind,
        packet_type: PacketType,
        timestamp: Timestamp,
        payload: &[u8],
    ) -> Result<Self> {
        // `Other` may spell a known tag; use the variant parse would yield.
        let packet_type = PacketType::from(packet_type.as_u8());
        if packet_type == PacketType::Unknown {
            return Err(PacketError::InvalidPacketType);
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let size = HEADER_SIZE + payload.len();
        let mut buffer = Vec::with_capacity(size);
        buffer.put_slice(&SYNC_BYTES);
        buffer.put_u8(packet_type.as_u8());
        buffer.put_u16(size as u16);
        buffer.put_u16(0);
        buffer.put_u64(timestamp.to_bits());
        buffer.put_slice(payload);

        let checksum = calculate_checksum(&buffer);
        buffer[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());

        trace!(kind = ?kind, packet_type = %packet_type, size, checksum, "built packet");

        Ok(Self {
            kind,
            packet_type,
            checksum,
            timestamp,
            buffer,
        })
    }

    /// Parse a complete wire buffer.
    ///
    /// The checksum is not verified here; see [`Packet::checksum_valid`].
    pub fn parse(kind: PacketKind, raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_SIZE {
            return Err(PacketError::MalformedHeader("buffer shorter than header"));
        }
        if raw[..3] != SYNC_BYTES {
            return Err(PacketError::MalformedHeader("missing sync marker"));
        }

        let mut header = &raw[3..HEADER_SIZE];
        let packet_type = PacketType::from(header.get_u8());
        let declared = header.get_u16() as usize;
        let checksum = header.get_u16();
        let timestamp = Timestamp::from_bits(header.get_u64());

        if declared < HEADER_SIZE {
            return Err(PacketError::MalformedHeader(
                "declared size smaller than header",
            ));
        }
        if declared != raw.len() {
            return Err(PacketError::SizeMismatch {
                declared,
                actual: raw.len(),
            });
        }

        Ok(Self {
            kind,
            packet_type,
            checksum,
            timestamp,
            buffer: raw.to_vec(),
        })
    }

    /// Wrap a packet received already framed from an RSN DIGI.
    pub fn from_rsn(raw: &[u8]) -> Result<Self> {
        Self::parse(PacketKind::Rsn, raw)
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Total size including header.
    pub fn packet_size(&self) -> u16 {
        self.buffer.len() as u16
    }

    pub fn payload_size(&self) -> u16 {
        (self.buffer.len() - HEADER_SIZE) as u16
    }

    /// Checksum as carried in the header.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[HEADER_SIZE..]
    }

    /// The complete wire buffer, header included.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the packet and return its wire buffer.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// True when the header checksum matches the buffer contents.
    pub fn checksum_valid(&self) -> bool {
        calculate_checksum(&self.buffer) == self.checksum
    }

    /// Whether the packet is complete and may be transmitted.
    pub fn ready_to_send(&self) -> bool {
        match self.kind {
            PacketKind::Generic | PacketKind::Rsn | PacketKind::PortAgent => true,
        }
    }
}

/// 16-bit wrapping sum of every buffer byte, with the checksum field read as zero.
pub fn calculate_checksum(buffer: &[u8]) -> u16 {
    buffer
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != CHECKSUM_OFFSET && *i != CHECKSUM_OFFSET + 1)
        .fold(0u16, |sum, (_, &byte)| sum.wrapping_add(byte as u16))
}
