//! Binary plist reader (`bplist00`).
//!
//! ## Document layout
//!
//! ```text
//! +----------+------------------+--------------+-------------+
//! | bplist00 | objects ...      | offset table | trailer(32) |
//! +----------+------------------+--------------+-------------+
//! ```
//!
//! Each object starts with a marker byte: the high nibble is the tag, the
//! low nibble an inline length, or `0xF` when an integer object holding the
//! real length follows. Arrays and dictionaries store fixed-width object
//! references into the offset table rather than nested objects.

use crate::endian;
use crate::error::{Error, Result};
use crate::factory;
use crate::node::{MAX_DEPTH, Node, nesting_error};
use log::debug;
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Magic number every binary plist starts with.
pub const HEADER_MAGIC: &[u8; 6] = b"bplist";
/// Full header written by this crate (magic + version "00").
pub const HEADER: &[u8; 8] = b"bplist00";
pub const HEADER_SIZE: u64 = 8;
pub const TRAILER_SIZE: u64 = 32;

/// The fixed 32-byte footer of a binary plist.
///
/// ```text
/// [5 unused][sort version][offset int size][object ref size]
/// [object count: u64][top object: u64][offset table offset: u64]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub sort_version: u8,
    /// Width of each offset table entry
    pub offset_int_size: u8,
    /// Width of each object reference inside arrays and dictionaries
    pub object_ref_size: u8,
    pub object_count: u64,
    /// Object id of the root node
    pub top_object: u64,
    pub offset_table_offset: u64,
}

impl Trailer {
    pub fn from_bytes(buf: &[u8; 32]) -> Self {
        let field = |at: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[at..at + 8]);
            u64::from_be_bytes(raw)
        };
        Trailer {
            sort_version: buf[5],
            offset_int_size: buf[6],
            object_ref_size: buf[7],
            object_count: field(8),
            top_object: field(16),
            offset_table_offset: field(24),
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[5] = self.sort_version;
        buf[6] = self.offset_int_size;
        buf[7] = self.object_ref_size;
        buf[8..16].copy_from_slice(&self.object_count.to_be_bytes());
        buf[16..24].copy_from_slice(&self.top_object.to_be_bytes());
        buf[24..32].copy_from_slice(&self.offset_table_offset.to_be_bytes());
        buf
    }
}

/// Read a binary plist from `stream` and return its root node.
pub fn read<R: Read + Seek>(stream: &mut R) -> Result<Node> {
    validate_header(stream)?;
    let stream_len = stream.seek(SeekFrom::End(0))?;
    let trailer = read_trailer(stream, stream_len)?;
    debug!(
        "bplist trailer: {} objects, top {}, offset table at {} ({}-byte offsets, {}-byte refs)",
        trailer.object_count,
        trailer.top_object,
        trailer.offset_table_offset,
        trailer.offset_int_size,
        trailer.object_ref_size
    );
    let offsets = read_offsets(stream, &trailer, stream_len)?;

    let mut state = ReaderState {
        stream,
        offsets,
        object_ref_size: trailer.object_ref_size,
        stream_len,
        in_progress: HashSet::new(),
    };
    state.read_object(trailer.top_object)
}

/// Read a binary plist held in memory.
pub fn from_slice(bytes: &[u8]) -> Result<Node> {
    read(&mut Cursor::new(bytes))
}

fn validate_header<R: Read + Seek>(stream: &mut R) -> Result<()> {
    stream.seek(SeekFrom::Start(0))?;
    let header: [u8; HEADER_SIZE as usize] = endian::read_array(stream, "the 8-byte header")?;
    if !header.starts_with(HEADER_MAGIC) {
        return Err(Error::format("must start with \"bplist\""));
    }
    // version digits (bytes 6..8) are not checked
    Ok(())
}

fn read_trailer<R: Read + Seek>(stream: &mut R, stream_len: u64) -> Result<Trailer> {
    if stream_len < HEADER_SIZE + TRAILER_SIZE {
        return Err(Error::format("unable to read trailer"));
    }
    stream.seek(SeekFrom::Start(stream_len - TRAILER_SIZE))?;
    let buf: [u8; TRAILER_SIZE as usize] = endian::read_array(stream, "trailer")?;
    let trailer = Trailer::from_bytes(&buf);

    for (name, size) in [
        ("offset int size", trailer.offset_int_size),
        ("object ref size", trailer.object_ref_size),
    ] {
        if !matches!(size, 1 | 2 | 4 | 8) {
            return Err(Error::format(format!("unexpected {}: {}", name, size)));
        }
    }
    Ok(trailer)
}

/// Load the offset table: object id → byte offset of the object.
fn read_offsets<R: Read + Seek>(stream: &mut R, trailer: &Trailer, stream_len: u64) -> Result<Vec<u64>> {
    let count = usize::try_from(trailer.object_count).map_err(|_| {
        Error::format(format!(
            "offset table contains too many entries: {}",
            trailer.object_count
        ))
    })?;
    if trailer.offset_table_offset >= stream_len - TRAILER_SIZE {
        return Err(Error::format(format!(
            "offset table offset {} is beyond the end of the object data",
            trailer.offset_table_offset
        )));
    }
    let width = trailer.offset_int_size as u64;
    let table_len = trailer
        .object_count
        .checked_mul(width)
        .filter(|len| {
            trailer
                .offset_table_offset
                .checked_add(*len)
                .is_some_and(|end| end <= stream_len - TRAILER_SIZE)
        })
        .ok_or_else(|| {
            Error::format(format!(
                "offset table of {} entries does not fit before the trailer",
                trailer.object_count
            ))
        })?;

    stream.seek(SeekFrom::Start(trailer.offset_table_offset))?;
    let table = endian::read_bytes(stream, table_len, "offset table")?;
    let mut offsets = Vec::with_capacity(count);
    for entry in table.chunks_exact(width as usize) {
        offsets.push(endian::read_uint(entry)?);
    }
    Ok(offsets)
}

/// Everything one parse needs, owned by a single `read` call.
struct ReaderState<'a, R> {
    stream: &'a mut R,
    offsets: Vec<u64>,
    object_ref_size: u8,
    stream_len: u64,
    /// Containers currently being decoded, to reject reference cycles
    in_progress: HashSet<u64>,
}

impl<R: Read + Seek> ReaderState<'_, R> {
    /// Decode the object with id `id`.
    ///
    /// Shared objects are decoded again for every reference, so the result
    /// is always a tree.
    fn read_object(&mut self, id: u64) -> Result<Node> {
        let offset = usize::try_from(id)
            .ok()
            .and_then(|idx| self.offsets.get(idx))
            .copied()
            .ok_or_else(|| {
                Error::format(format!(
                    "object reference {} is outside the offset table ({} entries)",
                    id,
                    self.offsets.len()
                ))
            })?;
        if self.in_progress.contains(&id) {
            return Err(Error::format(format!("object {} contains itself", id)));
        }

        self.stream.seek(SeekFrom::Start(offset))?;
        let (tag, length) = self.read_marker()?;
        let mut node = factory::create(tag, length)?;

        match &mut node {
            Node::Array(items) => {
                let refs = self.read_refs(length)?;
                self.enter(id)?;
                for child in refs {
                    items.push(self.read_object(child)?);
                }
                self.in_progress.remove(&id);
            }
            Node::Dictionary(dict) => {
                let keys = self.read_refs(length)?;
                let values = self.read_refs(length)?;
                self.enter(id)?;
                for (key_ref, value_ref) in keys.into_iter().zip(values) {
                    let key = match self.read_object(key_ref)? {
                        Node::String(s) => s.into_string(),
                        other => {
                            return Err(Error::format(format!(
                                "dictionary key is a {}, not a string",
                                other.kind()
                            )));
                        }
                    };
                    let value = self.read_object(value_ref)?;
                    dict.insert(key, value);
                }
                self.in_progress.remove(&id);
            }
            scalar => scalar.read_binary(&mut *self.stream, length)?,
        }
        Ok(node)
    }

    /// Open container `id`. Every open container is distinct, so the set's
    /// size is the current nesting depth.
    fn enter(&mut self, id: u64) -> Result<()> {
        if self.in_progress.len() >= MAX_DEPTH {
            return Err(nesting_error());
        }
        self.in_progress.insert(id);
        Ok(())
    }

    /// Read a marker byte and, when needed, the extended length after it.
    fn read_marker(&mut self) -> Result<(u8, u64)> {
        let [marker] = endian::read_array(&mut *self.stream, "object marker")?;
        let tag = marker >> 4;
        let length = marker & 0x0F;
        if length != 0x0F {
            return Ok((tag, length as u64));
        }

        // 0001 nnnn, then 2^n bytes of big-endian length
        let [size_marker] = endian::read_array(&mut *self.stream, "object length marker")?;
        if size_marker >> 4 != 0x1 {
            return Err(Error::format(format!(
                "invalid extended length marker 0x{:02X}",
                size_marker
            )));
        }
        let width = endian::class_width((size_marker & 0x0F) as u64, "object length")?;
        let buf = endian::read_bytes(&mut *self.stream, width, "object length")?;
        Ok((tag, endian::read_uint(&buf)?))
    }

    /// Read a table of `count` object references.
    fn read_refs(&mut self, count: u64) -> Result<Vec<u64>> {
        let width = self.object_ref_size as u64;
        let len = count
            .checked_mul(width)
            .filter(|len| *len <= self.stream_len)
            .ok_or_else(|| Error::format(format!("reference table of {} entries is too long", count)))?;
        let buf = endian::read_bytes(&mut *self.stream, len, "object reference table")?;
        buf.chunks_exact(width as usize).map(endian::read_uint).collect()
    }
}
