//! Port agent for remote scientific instruments.
//!
//! The port agent sits between an instrument (reached over plain TCP or
//! through an RSN DIGI) and its consumers. It frames the instrument's byte
//! stream into typed, timestamped, checksummed packets and hands them to
//! publishers.
//!
//! # Crate Structure
//!
//! - [`transport`] — Non-blocking instrument sockets
//! - [`packet`] — Packet format, checksums, rendering and stream decoding
//! - [`connection`] — Data/command connection state machine and DIGI protocol (behind `connection` feature)
//! - [`publisher`] — Packet publishers (behind `publisher` feature)

/// Re-export transport types.
pub mod transport {
    pub use portagent_transport::*;
}

/// Re-export packet types.
pub mod packet {
    pub use portagent_packet::*;
}

/// Re-export connection types (requires `connection` feature).
#[cfg(feature = "connection")]
pub mod connection {
    pub use portagent_connection::*;
}

/// Re-export publisher types (requires `publisher` feature).
#[cfg(feature = "publisher")]
pub mod publisher {
    pub use portagent_publisher::*;
}
