use std::fmt;
use std::io;

use portagent_connection::ConnectionError;
use portagent_packet::PacketError;
use portagent_publisher::PublisherError;
use portagent_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::MissingConfig => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Connect { source, .. } if source.kind() == io::ErrorKind::TimedOut => {
            io_error(context, source)
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn packet_error(context: &str, err: PacketError) -> CliError {
    match err {
        PacketError::Io(source) => io_error(context, source),
        PacketError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn connection_error(context: &str, err: ConnectionError) -> CliError {
    match err {
        ConnectionError::Transport(err) => transport_error(context, err),
        ConnectionError::Packet(err) => packet_error(context, err),
        other @ (ConnectionError::CommandTooLong { .. }
        | ConnectionError::ResponseTooLong { .. }) => {
            CliError::new(USAGE, format!("{context}: {other}"))
        }
    }
}

pub fn publisher_error(context: &str, err: PublisherError) -> CliError {
    match err {
        PublisherError::Io(source) => io_error(context, source),
        PublisherError::Packet(err) => packet_error(context, err),
        PublisherError::Transport(err) => transport_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_usage() {
        let err = transport_error("connect", TransportError::MissingConfig);
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("connect: "));
    }

    #[test]
    fn refused_connect_is_transport_error() {
        let err = connection_error(
            "initialize",
            ConnectionError::Transport(TransportError::Connect {
                host: "127.0.0.1".to_string(),
                port: 1,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn malformed_packets_are_data_invalid() {
        let err = packet_error("decode", PacketError::MalformedHeader("missing sync marker"));
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn oversized_command_is_usage() {
        let err = connection_error(
            "break",
            ConnectionError::CommandTooLong { len: 2000, max: 1000 },
        );
        assert_eq!(err.code, USAGE);
    }
}
