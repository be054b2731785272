use std::io::{self, ErrorKind, Read, Write};

use crate::error::TransportError;
use crate::traits::CommSocket;

/// `Read`/`Write` view of a borrowed [`CommSocket`].
///
/// "No data yet" surfaces as `ErrorKind::WouldBlock` and a peer close as
/// end-of-stream, so std-style readers can sit on top of a socket.
pub struct SocketIo<'a, S: ?Sized> {
    socket: &'a mut S,
}

impl<'a, S: CommSocket + ?Sized> SocketIo<'a, S> {
    pub fn new(socket: &'a mut S) -> Self {
        Self { socket }
    }

    pub fn socket(&self) -> &S {
        &*self.socket
    }
}

impl<S: CommSocket + ?Sized> Read for SocketIo<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.socket.read_data(buf) {
            Ok(0) => Err(io::Error::from(ErrorKind::WouldBlock)),
            Ok(n) => Ok(n),
            Err(TransportError::Closed) => Ok(0),
            Err(err) => Err(into_io_error(err)),
        }
    }
}

impl<S: CommSocket + ?Sized> Write for SocketIo<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.write_data(buf).map_err(into_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn into_io_error(err: TransportError) -> io::Error {
    match err {
        TransportError::Io(io) | TransportError::SocketCreate(io) => io,
        TransportError::HostResolution { source, .. } | TransportError::Connect { source, .. } => {
            source
        }
        TransportError::NotConnected => io::Error::from(ErrorKind::NotConnected),
        TransportError::Closed => io::Error::from(ErrorKind::ConnectionAborted),
        other => io::Error::other(other.to_string()),
    }
}
