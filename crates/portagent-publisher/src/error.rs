/// Errors that can occur while publishing a packet.
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    /// Writing to the publisher's sink failed.
    #[error("publisher I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The packet could not be written out.
    #[error("packet error: {0}")]
    Packet(#[from] portagent_packet::PacketError),

    /// The instrument socket rejected the write.
    #[error("transport error: {0}")]
    Transport(#[from] portagent_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, PublisherError>;
