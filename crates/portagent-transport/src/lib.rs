//! Instrument socket capability.
//!
//! This is the lowest layer of the port agent. It knows how to configure,
//! connect, read, write and tear down a single non-blocking endpoint and
//! nothing else: no framing, no protocol, no timeouts. Everything above it
//! talks to the [`CommSocket`] trait.

pub mod error;
pub mod io;
pub mod traits;

#[cfg(unix)]
pub mod tcp;

pub use error::{Result, TransportError};
pub use io::SocketIo;
pub use traits::CommSocket;

#[cfg(unix)]
pub use tcp::TcpCommSocket;
