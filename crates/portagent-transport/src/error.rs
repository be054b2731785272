/// Errors that can occur in socket operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Hostname or port missing when the socket was initialized.
    #[error("socket missing configuration (hostname and port required)")]
    MissingConfig,

    /// The hostname could not be resolved to an IPv4 address.
    #[error("failed to resolve host {host}: {source}")]
    HostResolution {
        host: String,
        source: std::io::Error,
    },

    /// The operating system refused to create a stream socket.
    #[error("failed to create socket: {0}")]
    SocketCreate(std::io::Error),

    /// The connect call failed (an in-progress connect is not a failure).
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// The socket has not been initialized, or has been disconnected.
    #[error("socket not connected")]
    NotConnected,

    /// The remote end closed the connection.
    #[error("connection closed by peer")]
    Closed,

    /// An I/O error occurred on the connected stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
