//! Binary plist writer (`bplist00`).
//!
//! Objects are emitted depth-first, a container's marker before its
//! children, and each emitted object takes the next sequential id. Array and
//! dictionary reference tables are reserved in place and filled in once the
//! children's ids are known.
//!
//! Value-equal booleans, integers, strings and UIDs are stored once per
//! document; later occurrences reuse the first object's id.

use crate::endian;
use crate::error::{Error, Result};
use crate::factory;
use crate::node::{Dictionary, MAX_DEPTH, Node, nesting_error};
use crate::reader::{HEADER, Trailer};
use log::{debug, trace};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::Write;

/// Serialize `root` as a binary plist into `sink`.
pub fn write<W: Write + ?Sized>(sink: &mut W, root: &Node) -> Result<()> {
    let bytes = to_vec(root)?;
    sink.write_all(&bytes)?;
    Ok(())
}

/// Serialize `root` as a binary plist into a new buffer.
pub fn to_vec(root: &Node) -> Result<Vec<u8>> {
    BinaryWriter::new(root)?.finish(root)
}

/// Scalar value a stored object can be shared by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UniqueValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    Uid(u64),
}

fn unique_key(node: &Node) -> Option<(u8, UniqueValue)> {
    if !node.is_binary_unique() {
        return None;
    }
    let value = match node {
        Node::Boolean(v) => UniqueValue::Boolean(*v),
        Node::Integer(v) => UniqueValue::Integer(*v),
        Node::String(s) => UniqueValue::String(s.as_str().to_string()),
        Node::Uid(v) => UniqueValue::Uid(*v),
        _ => return None,
    };
    Some((node.binary_tag(), value))
}

/// State for one write: the output buffer, object offsets and the dedup cache.
struct BinaryWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
    unique: HashMap<(u8, UniqueValue), usize>,
    /// Stored objects if nothing were shared
    node_count: usize,
    /// Width of object references inside arrays and dictionaries
    index_size: u8,
}

impl BinaryWriter {
    fn new(root: &Node) -> Result<Self> {
        let node_count = node_count(root);
        let index_size = index_width(node_count as u64).ok_or_else(|| {
            Error::format(format!("{} objects cannot be referenced", node_count))
        })?;
        Ok(BinaryWriter {
            buf: Vec::new(),
            offsets: Vec::with_capacity(node_count),
            unique: HashMap::new(),
            node_count,
            index_size,
        })
    }

    fn finish(mut self, root: &Node) -> Result<Vec<u8>> {
        self.buf.extend_from_slice(HEADER);
        let top_object = self.write_object(root, 0)?;

        let offset_table_offset = self.buf.len();
        let offset_size = index_width(offset_table_offset as u64).ok_or_else(|| {
            Error::format(format!(
                "document of {} bytes is too large for 4-byte offsets",
                offset_table_offset
            ))
        })?;

        let width = offset_size as usize;
        let mut table = vec![0u8; width * self.offsets.len()];
        for (slot, offset) in table.chunks_exact_mut(width).zip(&self.offsets) {
            endian::write_uint(slot, *offset as u64)?;
        }
        self.buf.extend_from_slice(&table);

        debug!(
            "bplist written: {} of at most {} objects, {}-byte refs, {}-byte offsets, offset table at {}",
            self.offsets.len(),
            self.node_count,
            self.index_size,
            offset_size,
            offset_table_offset
        );

        let trailer = Trailer {
            sort_version: 0,
            offset_int_size: offset_size,
            object_ref_size: self.index_size,
            object_count: self.offsets.len() as u64,
            top_object: top_object as u64,
            offset_table_offset: offset_table_offset as u64,
        };
        self.buf.extend_from_slice(&trailer.to_bytes());
        Ok(self.buf)
    }

    /// Emit `node` (or find its shared copy) and return its object id.
    /// `depth` counts the containers enclosing `node`.
    fn write_object(&mut self, node: &Node, depth: usize) -> Result<usize> {
        let id = self.offsets.len();
        if node.is_container() && depth >= MAX_DEPTH {
            return Err(nesting_error());
        }
        if let Some(key) = unique_key(node) {
            match self.unique.entry(key) {
                Entry::Occupied(existing) => {
                    trace!("reusing object {} for {:?}", existing.get(), existing.key().1);
                    return Ok(*existing.get());
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }

        self.offsets.push(self.buf.len());
        self.write_marker(node.binary_tag(), node.binary_length())?;
        match node {
            Node::Array(items) => self.write_array(items, depth + 1)?,
            Node::Dictionary(dict) => self.write_dictionary(dict, depth + 1)?,
            scalar => scalar.write_binary(&mut self.buf)?,
        }
        Ok(id)
    }

    fn write_marker(&mut self, tag: u8, length: u64) -> Result<()> {
        if length < 0x0F {
            self.buf.push(tag << 4 | length as u8);
            return Ok(());
        }
        self.buf.push(tag << 4 | 0x0F);
        let extended = factory::length_element(length)?;
        self.buf
            .push(extended.binary_tag() << 4 | extended.binary_length() as u8);
        extended.write_binary(&mut self.buf)
    }

    fn write_array(&mut self, items: &[Node], depth: usize) -> Result<()> {
        let width = self.index_size as usize;
        let table = self.reserve(width * items.len());
        for (i, item) in items.iter().enumerate() {
            let child = self.write_object(item, depth)?;
            self.backfill(table + i * width, child)?;
        }
        Ok(())
    }

    /// Keys table, then values table; all keys are emitted before any value.
    fn write_dictionary(&mut self, dict: &Dictionary, depth: usize) -> Result<()> {
        let width = self.index_size as usize;
        let keys = self.reserve(2 * width * dict.len());
        let values = keys + width * dict.len();
        for (i, key) in dict.keys().enumerate() {
            let child = self.write_object(&factory::key_element(key), depth)?;
            self.backfill(keys + i * width, child)?;
        }
        for (i, value) in dict.values().enumerate() {
            let child = self.write_object(value, depth)?;
            self.backfill(values + i * width, child)?;
        }
        Ok(())
    }

    /// Append `len` zero bytes and return where they start.
    fn reserve(&mut self, len: usize) -> usize {
        let start = self.buf.len();
        self.buf.resize(start + len, 0);
        start
    }

    fn backfill(&mut self, at: usize, id: usize) -> Result<()> {
        let width = self.index_size as usize;
        endian::write_uint(&mut self.buf[at..at + width], id as u64)
    }
}

/// Upper bound on the stored object count: every node, plus one string
/// object per dictionary key. Walks with an explicit stack, so trees too deep
/// to write still get counted.
fn node_count(root: &Node) -> usize {
    let mut count = 0;
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        count += 1;
        match node {
            Node::Array(items) => pending.extend(items),
            Node::Dictionary(dict) => {
                count += dict.len();
                pending.extend(dict.values());
            }
            _ => {}
        }
    }
    count
}

/// Width needed for a reference or offset no larger than `max`.
fn index_width(max: u64) -> Option<u8> {
    if max <= u8::MAX as u64 {
        Some(1)
    } else if max <= i16::MAX as u64 {
        Some(2)
    } else if max <= u32::MAX as u64 {
        Some(4)
    } else {
        None
    }
}
