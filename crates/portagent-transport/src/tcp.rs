use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::CommSocket;

/// TCP client socket to an instrument or DIGI port.
///
/// The socket is created and connected through `libc` so that creation,
/// resolution and connect failures stay distinguishable, then handed to
/// [`TcpStream`] for I/O. Cloning copies configuration only; the clone starts
/// disconnected.
#[derive(Debug, Default)]
pub struct TcpCommSocket {
    hostname: String,
    port: u16,
    blocking: bool,
    stream: Option<TcpStream>,
}

impl TcpCommSocket {
    /// Create an unconfigured socket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a socket with hostname and port already set.
    pub fn with_endpoint(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            ..Self::default()
        }
    }

    /// Keep the stream in blocking mode after connect. Off by default.
    pub fn set_blocking(&mut self, blocking: bool) {
        self.blocking = blocking;
    }

    /// Whether the stream is left in blocking mode after connect.
    pub fn blocking(&self) -> bool {
        self.blocking
    }

    /// Local address of the connected stream.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn resolve(&self) -> Result<SocketAddrV4> {
        let host_error = |source| TransportError::HostResolution {
            host: self.hostname.clone(),
            source,
        };

        let addrs = (self.hostname.as_str(), self.port)
            .to_socket_addrs()
            .map_err(host_error)?;

        addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(v4),
                SocketAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| {
                host_error(std::io::Error::new(
                    ErrorKind::NotFound,
                    "no IPv4 address for host",
                ))
            })
    }
}

impl Clone for TcpCommSocket {
    fn clone(&self) -> Self {
        Self {
            hostname: self.hostname.clone(),
            port: self.port,
            blocking: self.blocking,
            stream: None,
        }
    }
}

impl CommSocket for TcpCommSocket {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn set_hostname(&mut self, hostname: &str) {
        self.hostname = hostname.to_string();
    }

    fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    fn initialize(&mut self) -> Result<()> {
        debug!(host = %self.hostname, port = self.port, "tcp comm socket initialize");

        if !self.is_configured() {
            return Err(TransportError::MissingConfig);
        }

        if self.stream.is_some() {
            debug!(endpoint = %self.endpoint(), "dropping previous stream before reconnect");
            self.disconnect();
        }

        let addr = self.resolve()?;
        let fd = create_stream_socket()?;

        info!(host = %self.hostname, port = self.port, "connecting to server");
        connect_fd(&fd, addr).map_err(|source| TransportError::Connect {
            host: self.hostname.clone(),
            port: self.port,
            source,
        })?;

        let stream = TcpStream::from(fd);
        if !self.blocking {
            debug!("set socket non-blocking");
            stream.set_nonblocking(true)?;
        }

        self.stream = Some(stream);
        Ok(())
    }

    fn connected(&self) -> bool {
        self.stream.is_some()
    }

    fn disconnect(&mut self) -> bool {
        if let Some(stream) = self.stream.take() {
            debug!(endpoint = %self.endpoint(), "disconnecting");
            let _ = stream.shutdown(Shutdown::Both);
        }
        true
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            match stream.read(buf) {
                Ok(0) if !buf.is_empty() => {
                    debug!(host = %self.hostname, port = self.port, "peer closed connection");
                    self.stream = None;
                    return Err(TransportError::Closed);
                }
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // Nothing buffered yet, or the connect is still completing.
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock
                        || err.kind() == ErrorKind::NotConnected =>
                {
                    return Ok(0)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_data(&mut self, buf: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        let mut offset = 0usize;
        while offset < buf.len() {
            match stream.write(&buf[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

fn create_stream_socket() -> Result<OwnedFd> {
    // SAFETY: socket(2) takes no pointers; the arguments are constants.
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(TransportError::SocketCreate(std::io::Error::last_os_error()));
    }
    // SAFETY: `fd` was just returned by socket(2) and is owned by nobody else.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn connect_fd(fd: &OwnedFd, addr: SocketAddrV4) -> std::io::Result<()> {
    // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
    let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_port = addr.port().to_be();
    sin.sin_addr = libc::in_addr {
        s_addr: u32::from(*addr.ip()).to_be(),
    };
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    ))]
    {
        sin.sin_len = std::mem::size_of::<libc::sockaddr_in>() as u8;
    }

    // SAFETY: `sin` is a fully initialized sockaddr_in that outlives the call,
    // and the length passed matches its size. `fd` is an open socket.
    let rc = unsafe {
        libc::connect(
            fd.as_raw_fd(),
            (&sin as *const libc::sockaddr_in).cast::<libc::sockaddr>(),
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };

    if rc < 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINPROGRESS) {
            return Err(err);
        }
        debug!("connect in progress");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    use super::*;

    fn read_until(socket: &mut TcpCommSocket, want: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(3);
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        while out.len() < want && Instant::now() < deadline {
            let n = socket.read_data(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
            if n == 0 {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        out
    }

    #[test]
    fn configuration_gating() {
        let mut socket = TcpCommSocket::new();
        assert!(!socket.is_configured());

        socket.set_port(4001);
        assert!(!socket.is_configured());

        socket.set_hostname("127.0.0.1");
        assert!(socket.is_configured());

        socket.set_port(0);
        assert!(!socket.is_configured());
    }

    #[test]
    fn initialize_without_config_fails() {
        let mut socket = TcpCommSocket::new();
        let err = socket.initialize().unwrap_err();
        assert!(matches!(err, TransportError::MissingConfig));
        assert!(!socket.connected());
    }

    #[test]
    fn connect_refused_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut socket = TcpCommSocket::with_endpoint("127.0.0.1", port);
        let err = socket.initialize().unwrap_err();
        assert!(matches!(err, TransportError::Connect { port: p, .. } if p == port));
        assert!(!socket.connected());
    }

    #[test]
    fn read_and_write_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut socket = TcpCommSocket::with_endpoint("127.0.0.1", port);
        socket.initialize().unwrap();
        assert!(socket.connected());

        let (mut server, _) = listener.accept().unwrap();

        let mut empty = [0u8; 16];
        assert_eq!(socket.read_data(&mut empty).unwrap(), 0);

        server.write_all(b"hello").unwrap();
        assert_eq!(read_until(&mut socket, 5), b"hello");

        socket.write_data(b"world").unwrap();
        let mut got = [0u8; 5];
        server.read_exact(&mut got).unwrap();
        assert_eq!(&got, b"world");
    }

    #[test]
    fn peer_close_reports_closed_and_disconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut socket = TcpCommSocket::with_endpoint("localhost", port);
        socket.initialize().unwrap();
        let (server, _) = listener.accept().unwrap();
        drop(server);

        let deadline = Instant::now() + Duration::from_secs(3);
        let mut buf = [0u8; 8];
        let err = loop {
            match socket.read_data(&mut buf) {
                Ok(0) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(5))
                }
                Ok(n) => panic!("unexpected read of {n} bytes"),
                Err(err) => break err,
            }
        };
        assert!(matches!(err, TransportError::Closed));
        assert!(!socket.connected());
    }

    #[test]
    fn disconnect_then_io_is_not_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut socket = TcpCommSocket::with_endpoint("127.0.0.1", port);
        socket.initialize().unwrap();
        assert!(socket.disconnect());
        assert!(!socket.connected());

        let mut buf = [0u8; 4];
        assert!(matches!(
            socket.read_data(&mut buf),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            socket.write_data(b"x"),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn clone_copies_configuration_only() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut socket = TcpCommSocket::with_endpoint("127.0.0.1", port);
        socket.initialize().unwrap();

        let copy = socket.clone();
        assert_eq!(copy.hostname(), "127.0.0.1");
        assert_eq!(copy.port(), port);
        assert!(!copy.connected());
        assert!(socket.connected());
    }
}
