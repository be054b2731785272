/// Errors that can occur while building, parsing or streaming packets.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// Tag 0 (UNKNOWN), under any spelling, cannot be built.
    #[error("invalid packet type (UNKNOWN cannot be transmitted)")]
    InvalidPacketType,

    /// The payload does not fit in the 16-bit size field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The buffer does not start with a well-formed header.
    #[error("malformed packet header: {0}")]
    MalformedHeader(&'static str),

    /// The header's size field disagrees with the buffer length.
    #[error("packet size mismatch (header declares {declared} bytes, buffer has {actual})")]
    SizeMismatch { declared: usize, actual: usize },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete packet was received.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, PacketError>;
