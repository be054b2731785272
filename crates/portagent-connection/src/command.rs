//! Bounded command/response exchange over a non-blocking socket.
//!
//! The command socket never blocks, so waiting for a reply is a poll loop:
//! read what is available, compare it against the expected text, sleep one
//! tick, repeat. The loop gives up after `max_ticks` polls or as soon as the
//! bytes received so far can no longer match.

use std::thread;

use portagent_transport::CommSocket;
use tracing::{debug, trace, warn};

use crate::config::CommandConfig;
use crate::error::{ConnectionError, Result};

/// What arrived while waiting for a command echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoOutcome {
    /// The command came back verbatim.
    Echoed,
    /// The remote skipped the echo and started the next response instead.
    /// Holds the bytes of that response read so far.
    Skipped(Vec<u8>),
    /// Neither the echo nor the next response arrived.
    Missing,
}

/// Wait for `expected` to arrive on `socket`.
///
/// Returns `Ok(true)` once exactly `expected` has been read, `Ok(false)` on a
/// mismatch or when `max_ticks` polls pass without a full match. Reads never
/// ask for more than the bytes still missing, so anything the peer sends
/// after the response stays queued in the socket.
pub fn await_response<S>(socket: &mut S, expected: &[u8], config: &CommandConfig) -> Result<bool>
where
    S: CommSocket + ?Sized,
{
    await_response_from(socket, expected, &[], config)
}

/// Like [`await_response`], with the first bytes of the response already
/// in hand.
pub fn await_response_from<S>(
    socket: &mut S,
    expected: &[u8],
    already: &[u8],
    config: &CommandConfig,
) -> Result<bool>
where
    S: CommSocket + ?Sized,
{
    check_capacity(expected, config)?;
    if !expected.starts_with(already) {
        warn!(
            expected = %String::from_utf8_lossy(expected).escape_debug(),
            received = %String::from_utf8_lossy(already).escape_debug(),
            "unexpected command response"
        );
        return Ok(false);
    }
    if already.len() == expected.len() {
        return Ok(true);
    }

    let mut received = vec![0u8; expected.len()];
    received[..already.len()].copy_from_slice(already);
    let mut filled = already.len();

    for tick in 0..config.max_ticks {
        let read = socket.read_data(&mut received[filled..])?;
        if read > 0 {
            trace!(tick, read, "command response bytes");
            filled += read;

            if received[..filled] != expected[..filled] {
                warn!(
                    expected = %String::from_utf8_lossy(expected).escape_debug(),
                    received = %String::from_utf8_lossy(&received[..filled]).escape_debug(),
                    "unexpected command response"
                );
                return Ok(false);
            }
            if filled == expected.len() {
                debug!(ticks = tick + 1, "command response matched");
                return Ok(true);
            }
        }

        if tick + 1 < config.max_ticks {
            thread::sleep(config.tick);
        }
    }

    warn!(
        expected = %String::from_utf8_lossy(expected).escape_debug(),
        received = %String::from_utf8_lossy(&received[..filled]).escape_debug(),
        ticks = config.max_ticks,
        "timed out waiting for command response"
    );
    Ok(false)
}

/// Wait for the echo of a command line, accepting a remote that answers
/// with `next` straight away instead.
///
/// While the bytes read could still be the start of `next`, reads stay
/// within `next` so nothing after it is consumed.
pub fn await_echo<S>(
    socket: &mut S,
    echo: &[u8],
    next: &[u8],
    config: &CommandConfig,
) -> Result<EchoOutcome>
where
    S: CommSocket + ?Sized,
{
    check_capacity(echo, config)?;
    if echo.is_empty() {
        return Ok(EchoOutcome::Echoed);
    }

    let mut received = vec![0u8; echo.len()];
    let mut filled = 0usize;

    for tick in 0..config.max_ticks {
        let mut limit = echo.len() - filled;
        if filled < next.len() && next.starts_with(&received[..filled]) {
            limit = limit.min(next.len() - filled);
        }

        let read = socket.read_data(&mut received[filled..filled + limit])?;
        if read > 0 {
            trace!(tick, read, "command echo bytes");
            filled += read;
            let got = &received[..filled];

            if echo.starts_with(got) {
                if filled == echo.len() {
                    debug!(ticks = tick + 1, "command echo matched");
                    return Ok(EchoOutcome::Echoed);
                }
            } else if next.starts_with(got) {
                debug!(read = filled, "no command echo, response already arriving");
                return Ok(EchoOutcome::Skipped(got.to_vec()));
            } else {
                warn!(
                    expected = %String::from_utf8_lossy(echo).escape_debug(),
                    received = %String::from_utf8_lossy(got).escape_debug(),
                    "unexpected command echo"
                );
                return Ok(EchoOutcome::Missing);
            }
        }

        if tick + 1 < config.max_ticks {
            thread::sleep(config.tick);
        }
    }

    warn!(
        expected = %String::from_utf8_lossy(echo).escape_debug(),
        received = %String::from_utf8_lossy(&received[..filled]).escape_debug(),
        ticks = config.max_ticks,
        "timed out waiting for command echo"
    );
    Ok(EchoOutcome::Missing)
}

fn check_capacity(expected: &[u8], config: &CommandConfig) -> Result<()> {
    if expected.len() > config.buffer_capacity {
        return Err(ConnectionError::ResponseTooLong {
            len: expected.len(),
            max: config.buffer_capacity,
        });
    }
    Ok(())
}
