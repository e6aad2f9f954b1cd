//! Fixed-width big-endian primitives shared by the binary reader and writer.
//!
//! Every multi-byte number in a bplist document is stored in network byte
//! order. Widths are always 1, 2, 4 or 8 bytes.

use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};

/// Read exactly `N` bytes. A short read is a format error naming `what`.
pub(crate) fn read_array<R: Read + ?Sized, const N: usize>(
    stream: &mut R,
    what: &str,
) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    stream.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            Error::format(format!("unexpected end of input while reading {}", what))
        }
        _ => Error::Io(e.to_string()),
    })?;
    Ok(buf)
}

/// Read exactly `len` bytes into a fresh buffer.
///
/// The buffer grows with the data actually present, so a corrupt length
/// claim cannot force a huge allocation up front.
pub(crate) fn read_bytes<R: Read + ?Sized>(stream: &mut R, len: u64, what: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream.take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(Error::format(format!(
            "unexpected end of input while reading {} ({} of {} bytes)",
            what,
            buf.len(),
            len
        )));
    }
    Ok(buf)
}

/// Decode an unsigned big-endian integer of width 1, 2, 4 or 8.
pub(crate) fn read_uint(bytes: &[u8]) -> Result<u64> {
    Ok(match *bytes {
        [b] => b as u64,
        [a, b] => u16::from_be_bytes([a, b]) as u64,
        [a, b, c, d] => u32::from_be_bytes([a, b, c, d]) as u64,
        [a, b, c, d, e, f, g, h] => u64::from_be_bytes([a, b, c, d, e, f, g, h]),
        _ => {
            return Err(Error::format(format!(
                "unexpected integer width: {} bytes",
                bytes.len()
            )));
        }
    })
}

/// Encode `value` big-endian into `dst`, whose length is the width.
///
/// Fails when the width is not 1, 2, 4 or 8 or the value does not fit.
pub(crate) fn write_uint(dst: &mut [u8], value: u64) -> Result<()> {
    let too_wide = || {
        Error::format(format!(
            "value {} does not fit in a {}-byte index",
            value,
            dst.len()
        ))
    };
    match dst.len() {
        1 => dst.copy_from_slice(&u8::try_from(value).map_err(|_| too_wide())?.to_be_bytes()),
        2 => dst.copy_from_slice(&u16::try_from(value).map_err(|_| too_wide())?.to_be_bytes()),
        4 => dst.copy_from_slice(&u32::try_from(value).map_err(|_| too_wide())?.to_be_bytes()),
        8 => dst.copy_from_slice(&value.to_be_bytes()),
        n => return Err(Error::format(format!("invalid index width: {} bytes", n))),
    }
    Ok(())
}

/// Width in bytes selected by a power-of-two length class (0..=3).
pub(crate) fn class_width(class: u64, what: &str) -> Result<u64> {
    match class {
        0..=3 => Ok(1 << class),
        _ => Err(Error::format(format!(
            "{} is wider than 64 bits (length class {})",
            what, class
        ))),
    }
}
