//! Port agent packet format.
//!
//! Every data flow through the port agent is carried in the same packet:
//! - A 3-byte sync marker (`0xA39D7A`) for stream synchronization
//! - A 1-byte packet type
//! - A 2-byte big-endian total size (header + payload)
//! - A 2-byte big-endian checksum
//! - An 8-byte big-endian fixed-point timestamp
//!
//! Packets are immutable values; building and parsing are inverses.

pub mod codec;
pub mod error;
pub mod packet_type;
pub mod reader;
mod render;
pub mod timestamp;
pub mod writer;

pub use codec::{
    calculate_checksum, Packet, PacketKind, CHECKSUM_OFFSET, HEADER_SIZE, MAX_PACKET_SIZE,
    MAX_PAYLOAD_SIZE, SYNC, SYNC_BYTES,
};
pub use error::{PacketError, Result};
pub use packet_type::{type_to_string, PacketType, OUT_OF_RANGE};
pub use reader::{decode_packet, PacketReader};
pub use timestamp::Timestamp;
pub use writer::PacketWriter;
