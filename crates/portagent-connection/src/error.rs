/// Errors that can occur while driving an instrument connection.
///
/// Command protocol failures (wrong banner, missing echo or ack) are not
/// errors; those operations return `Ok(false)` and log the details.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Socket-level error.
    #[error("transport error: {0}")]
    Transport(#[from] portagent_transport::TransportError),

    /// Packet framing error.
    #[error("packet error: {0}")]
    Packet(#[from] portagent_packet::PacketError),

    /// A command whose echo cannot fit in the response buffer.
    #[error("command too long to await its echo ({len} bytes, max {max})")]
    CommandTooLong { len: usize, max: usize },

    /// An expected response larger than the response buffer.
    #[error("expected response too long ({len} bytes, max {max})")]
    ResponseTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
