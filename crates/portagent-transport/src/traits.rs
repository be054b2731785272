use crate::error::Result;

/// A single network endpoint driven in non-blocking mode.
///
/// Implementations carry their own configuration (hostname and port) and a
/// connected flag. Reads never block: `read_data` returns `Ok(0)` when
/// nothing is available yet.
pub trait CommSocket {
    /// Configured hostname, empty when unset.
    fn hostname(&self) -> &str;

    /// Configured port, zero when unset.
    fn port(&self) -> u16;

    /// Set the hostname. No I/O.
    fn set_hostname(&mut self, hostname: &str);

    /// Set the port. No I/O.
    fn set_port(&mut self, port: u16);

    /// Set hostname and port together. No I/O.
    fn configure(&mut self, hostname: &str, port: u16) {
        self.set_hostname(hostname);
        self.set_port(port);
    }

    /// True when both a hostname and a non-zero port are set.
    fn is_configured(&self) -> bool {
        !self.hostname().is_empty() && self.port() > 0
    }

    /// Resolve, create, connect and switch the socket to non-blocking mode.
    ///
    /// Re-initializing an already connected socket replaces the old stream.
    fn initialize(&mut self) -> Result<()>;

    /// True once `initialize` has succeeded and until `disconnect`.
    fn connected(&self) -> bool;

    /// Tear down the stream. Returns true when the socket ends disconnected.
    fn disconnect(&mut self) -> bool;

    /// Read whatever is currently available, `Ok(0)` when nothing is.
    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write the whole buffer.
    fn write_data(&mut self, buf: &[u8]) -> Result<()>;

    /// `host:port` for diagnostics.
    fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname(), self.port())
    }
}
