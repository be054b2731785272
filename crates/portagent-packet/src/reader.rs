use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::codec::{calculate_checksum, Packet, PacketKind, CHECKSUM_OFFSET, HEADER_SIZE, SYNC_BYTES};
use crate::error::{PacketError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Decode one packet from the front of a stream buffer.
///
/// Bytes before the next sync marker are discarded. Returns `Ok(None)` when
/// the buffer does not hold a complete packet yet; on success the packet's
/// bytes are consumed from the buffer.
///
/// A marker whose packet is incomplete or fails its checksum is dropped as
/// a false sync when a complete, checksum-valid packet starts inside its
/// declared span. A damaged packet with no such successor is still returned;
/// see [`Packet::checksum_valid`].
pub fn decode_packet(src: &mut BytesMut, kind: PacketKind) -> Result<Option<Packet>> {
    loop {
        match find_sync(src) {
            Some(0) => {}
            Some(offset) => {
                debug!(skipped = offset, "discarding bytes before sync marker");
                src.advance(offset);
            }
            None => {
                // Keep a possible partial marker at the tail.
                let keep = SYNC_BYTES.len() - 1;
                if src.len() > keep {
                    let drop = src.len() - keep;
                    debug!(skipped = drop, "no sync marker in buffer");
                    src.advance(drop);
                }
                return Ok(None);
            }
        }

        if src.len() < HEADER_SIZE {
            return Ok(None); // Need more data
        }

        let declared = u16::from_be_bytes([src[4], src[5]]) as usize;
        if declared < HEADER_SIZE {
            warn!(declared, "false sync marker (size smaller than header), resyncing");
            src.advance(1);
            continue;
        }

        if !holds_valid_packet(src) {
            if let Some(next) = valid_packet_within(src, declared) {
                warn!(declared, skipped = next, "false sync marker, resyncing on next valid packet");
                src.advance(next);
                continue;
            }
        }

        if src.len() < declared {
            return Ok(None); // Need more data
        }

        let raw = src.split_to(declared);
        return Packet::parse(kind, &raw).map(Some);
    }
}

fn find_sync(src: &[u8]) -> Option<usize> {
    src.windows(SYNC_BYTES.len())
        .position(|window| window == SYNC_BYTES)
}

/// True when `src` starts with a complete packet whose checksum matches.
fn holds_valid_packet(src: &[u8]) -> bool {
    if src.len() < HEADER_SIZE || src[..SYNC_BYTES.len()] != SYNC_BYTES {
        return false;
    }
    let declared = u16::from_be_bytes([src[4], src[5]]) as usize;
    if declared < HEADER_SIZE || src.len() < declared {
        return false;
    }
    let stored = u16::from_be_bytes([src[CHECKSUM_OFFSET], src[CHECKSUM_OFFSET + 1]]);
    calculate_checksum(&src[..declared]) == stored
}

/// Offset of the first valid packet starting in `src[1..end]`.
fn valid_packet_within(src: &[u8], end: usize) -> Option<usize> {
    let end = end.min(src.len());
    let mut offset = 1;
    while offset < end {
        let next = offset + find_sync(&src[offset..])?;
        if next >= end {
            return None;
        }
        if holds_valid_packet(&src[next..]) {
            return Some(next);
        }
        offset = next + 1;
    }
    None
}

/// Reads complete packets from any `Read` stream.
///
/// Handles partial reads and stray bytes internally; callers always get
/// complete packets.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
    kind: PacketKind,
}

impl<T: Read> PacketReader<T> {
    /// Create a reader producing port agent packets.
    pub fn new(inner: T) -> Self {
        Self::with_kind(inner, PacketKind::PortAgent)
    }

    /// Create a reader producing packets of the given kind.
    pub fn with_kind(inner: T, kind: PacketKind) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            kind,
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(PacketError::ConnectionClosed)` when EOF is reached.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = decode_packet(&mut self.buf, self.kind)? {
                return Ok(packet);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(PacketError::Io(err)),
            };

            if read == 0 {
                return Err(PacketError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for PacketReader<T> {
    type Item = Result<Packet>;

    /// Yields packets until the stream ends cleanly.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_packet() {
            Ok(packet) => Some(Ok(packet)),
            Err(PacketError::ConnectionClosed) if self.buf.is_empty() => None,
            Err(err) => Some(Err(err)),
        }
    }
}
