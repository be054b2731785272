use std::io::{ErrorKind, Write};

use crate::codec::Packet;
use crate::error::{PacketError, Result};

/// Writes whole packet buffers to any `Write` stream.
pub struct PacketWriter<T> {
    inner: T,
    written: u64,
}

impl<T: Write> PacketWriter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, written: 0 }
    }

    /// Write a packet's full wire buffer and flush (blocking).
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.write_all(packet.buffer())?;
        self.flush()
    }

    /// Write raw bytes, retrying short and would-block writes.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(PacketError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PacketError::Io(err)),
            }
        }
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PacketError::Io(err)),
            }
        }
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PacketReader, PacketType, Timestamp};

    #[test]
    fn write_then_read_back() {
        let first = Packet::new(
            PacketType::DataFromDriver,
            Timestamp::from_secs_f64(10.25),
            b"cmd\r\n",
        )
        .unwrap();
        let second =
            Packet::new(PacketType::PortAgentHeartbeat, Timestamp::default(), b"").unwrap();

        let mut writer = PacketWriter::new(Vec::new());
        writer.write_packet(&first).unwrap();
        writer.write_packet(&second).unwrap();
        assert_eq!(
            writer.bytes_written(),
            (first.buffer().len() + second.buffer().len()) as u64
        );

        let mut reader = PacketReader::new(std::io::Cursor::new(writer.into_inner()));
        assert_eq!(reader.read_packet().unwrap(), first);
        assert_eq!(reader.read_packet().unwrap(), second);
    }

    #[test]
    fn retries_short_and_blocked_writes() {
        let packet = Packet::new(
            PacketType::DataFromInstrument,
            Timestamp::from_secs_f64(1.0),
            b"stubborn",
        )
        .unwrap();

        let mut writer = PacketWriter::new(StutteringWriter::default());
        writer.write_packet(&packet).unwrap();
        assert_eq!(writer.get_ref().data, packet.buffer());
        assert!(writer.get_ref().blocked > 0);
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let packet =
            Packet::new(PacketType::DataFromDriver, Timestamp::default(), b"x").unwrap();
        let mut writer = PacketWriter::new(ClosedWriter);
        assert!(matches!(
            writer.write_packet(&packet),
            Err(PacketError::ConnectionClosed)
        ));
    }

    /// Accepts at most three bytes per call and blocks every other call.
    #[derive(Default)]
    struct StutteringWriter {
        data: Vec<u8>,
        calls: usize,
        blocked: usize,
    }

    impl Write for StutteringWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                self.blocked += 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = buf.len().min(3);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ClosedWriter;

    impl Write for ClosedWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
