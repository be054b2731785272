//! Instrument connection management.
//!
//! An [`InstrumentConnection`] owns the two sockets to one instrument and
//! knows the RSN DIGI command protocol: wait for the banner, switch on binary
//! timestamping, send serial breaks. Socket failures come back as
//! [`ConnectionError`]s; protocol failures come back as `Ok(false)` with the
//! details logged, and the connection stays usable for a later retry.

pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod status;

#[cfg(test)]
mod mock;

pub use command::{await_echo, await_response, await_response_from, EchoOutcome};
pub use config::{CommandConfig, ConnectedPolicy, ConnectionKind, DigiProtocol};
pub use connection::InstrumentConnection;
pub use error::{ConnectionError, Result};
pub use status::{InitOutcome, InitReport, SocketState};

/// Connection over real TCP sockets.
#[cfg(unix)]
pub type TcpInstrumentConnection = InstrumentConnection<portagent_transport::TcpCommSocket>;
