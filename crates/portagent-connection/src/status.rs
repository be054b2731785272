use std::fmt;

use crate::error::ConnectionError;

/// Lifecycle position of one socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketState {
    Unconfigured,
    Configured,
    Connected,
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocketState::Unconfigured => "unconfigured",
            SocketState::Configured => "configured",
            SocketState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// What `initialize()` did with one socket.
#[derive(Debug)]
pub enum InitOutcome {
    /// Hostname or port missing; nothing attempted.
    Skipped,
    /// Socket was already up; left untouched.
    AlreadyConnected,
    /// Socket connected (and, for a DIGI command port, the handshake passed).
    Connected,
    /// Socket connected but the DIGI handshake failed; socket closed again.
    ProtocolFailed,
    /// Socket could not be brought up.
    Failed(ConnectionError),
}

impl InitOutcome {
    /// True when the socket is up after initialization.
    pub fn is_up(&self) -> bool {
        matches!(self, InitOutcome::AlreadyConnected | InitOutcome::Connected)
    }
}

/// Per-socket result of `InstrumentConnection::initialize`.
///
/// Sockets are brought up independently: one may succeed while the other
/// fails, and nothing is rolled back.
#[derive(Debug)]
pub struct InitReport {
    pub data: InitOutcome,
    pub command: InitOutcome,
}

impl InitReport {
    /// True when both sockets are up.
    pub fn all_up(&self) -> bool {
        self.data.is_up() && self.command.is_up()
    }
}
