//! Framed I/O primitives (`spec.md` §4.1).
//!
//! Two primitives, no length prefix, no framing beyond what each
//! primitive defines for itself:
//!
//! - `write_int`/`read_int`: raw little-endian bytes of a native signed
//!   integer. We fix the width at 32 bits, matching a C `int` on every
//!   platform the original daemon targets; the wire format has no
//!   negotiation, so both ends must agree on this out of band, exactly as
//!   the C original does by being compiled for one architecture.
//! - `write_string`/`read_string`: one byte per character followed by a
//!   single `0x00` terminator. `read_string` additionally drains the
//!   channel past `max_size` until a null is seen, so an overlong write
//!   from a misbehaving (or merely honest-but-verbose) peer never leaves
//!   the stream mis-framed for the next read (`original_source/
//!   fio_handlers.c`'s `read_string`).
//!
//! All of it is generic over `AsyncRead`/`AsyncWrite` so the daemon can
//! drive it over real FIFOs in production and over `tokio::io::duplex` in
//! tests without a single `#[cfg(test)]` branch in this module.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WireError;

/// Writes a native 32-bit signed integer as raw little-endian bytes.
pub async fn write_int<W: AsyncWrite + Unpin>(w: &mut W, value: i32) -> Result<(), WireError> {
    w.write_all(&value.to_le_bytes()).await?;
    Ok(())
}

/// Reads a native 32-bit signed integer from raw little-endian bytes.
///
/// Returns [`WireError::ClosedMidInt`] if the channel closes before all
/// four bytes arrive.
pub async fn read_int<R: AsyncRead + Unpin>(r: &mut R) -> Result<i32, WireError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WireError::ClosedMidInt
        } else {
            WireError::Io(e)
        }
    })?;
    Ok(i32::from_le_bytes(buf))
}

/// Writes `value` one byte at a time, followed by a `0x00` terminator.
///
/// Mirrors `fio_handlers.c`'s `write_string`: no length check, no
/// truncation on the write side. A caller that wants to stay within
/// `STRING_SIZE` is responsible for not handing this function a longer
/// string; `read_string` on the other end is what keeps the stream
/// framed regardless.
pub async fn write_string<W: AsyncWrite + Unpin>(w: &mut W, value: &str) -> Result<(), WireError> {
    w.write_all(value.as_bytes()).await?;
    w.write_all(&[0u8]).await?;
    Ok(())
}

/// Reads a null-terminated string, keeping at most `max_size - 1` bytes.
///
/// If a null byte arrives within `max_size` bytes, the string up to that
/// point is returned. If `max_size` bytes are consumed without seeing a
/// null, the returned string is truncated to `max_size - 1` bytes, but
/// the channel is then drained byte-by-byte until a null is actually
/// read, so the next `read_int`/`read_string` on this channel starts at
/// the correct offset (`spec.md` §4.1 and §8's truncation boundary
/// property).
pub async fn read_string<R: AsyncRead + Unpin>(
    r: &mut R,
    max_size: usize,
) -> Result<String, WireError> {
    let mut bytes = Vec::with_capacity(max_size.min(64));
    let mut truncated = false;

    loop {
        let byte = read_one_byte(r).await?;
        if byte == 0 {
            break;
        }
        if bytes.len() + 1 < max_size {
            bytes.push(byte);
        } else {
            truncated = true;
        }
    }

    if truncated {
        log::debug!("read_string: truncated an overlong string to {max_size} bytes");
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn read_one_byte<R: AsyncRead + Unpin>(r: &mut R) -> Result<u8, WireError> {
    let mut byte = [0u8; 1];
    r.read_exact(&mut byte).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WireError::ClosedMidString
        } else {
            WireError::Io(e)
        }
    })?;
    Ok(byte[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STRING_SIZE;

    #[tokio::test]
    async fn int_round_trips() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_int(&mut a, -42).await.unwrap();
        assert_eq!(read_int(&mut b).await.unwrap(), -42);
    }

    #[tokio::test]
    async fn string_round_trips() {
        let (mut a, mut b) = tokio::io::duplex(256);
        write_string(&mut a, "hello").await.unwrap();
        assert_eq!(read_string(&mut b, STRING_SIZE).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn empty_string_round_trips() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_string(&mut a, "").await.unwrap();
        assert_eq!(read_string(&mut b, STRING_SIZE).await.unwrap(), "");
    }

    #[tokio::test]
    async fn string_exactly_at_the_boundary_round_trips_verbatim() {
        let (mut a, mut b) = tokio::io::duplex(512);
        let exact = "x".repeat(STRING_SIZE - 1);
        write_string(&mut a, &exact).await.unwrap();
        assert_eq!(read_string(&mut b, STRING_SIZE).await.unwrap(), exact);
    }

    #[tokio::test]
    async fn overlong_string_is_truncated_but_stream_stays_framed() {
        let (mut a, mut b) = tokio::io::duplex(512);
        let too_long = "y".repeat(STRING_SIZE + 20);
        write_string(&mut a, &too_long).await.unwrap();
        // A second, unrelated write follows right after.
        write_int(&mut a, 7).await.unwrap();

        let truncated = read_string(&mut b, STRING_SIZE).await.unwrap();
        assert_eq!(truncated.len(), STRING_SIZE - 1);
        assert!(too_long.starts_with(&truncated));

        // The stream must still be aligned on the next value.
        assert_eq!(read_int(&mut b).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn closed_mid_int_is_reported() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(matches!(
            read_int(&mut b).await,
            Err(WireError::ClosedMidInt)
        ));
    }

    #[tokio::test]
    async fn closed_mid_string_is_reported() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(b"partial").await.unwrap();
        drop(a);
        assert!(matches!(
            read_string(&mut b, STRING_SIZE).await,
            Err(WireError::ClosedMidString)
        ));
    }
}
