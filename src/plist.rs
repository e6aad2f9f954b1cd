//! Format-agnostic entry points: load with format detection, save in either format.

use crate::error::Result;
use crate::node::Node;
use crate::reader::{self, HEADER_MAGIC, HEADER_SIZE};
use crate::{writer, xml};
use log::debug;
use std::io::{Read, Seek, SeekFrom, Write};

/// On-disk plist encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Compact `bplist00` encoding
    #[default]
    Binary,
    /// Apple XML property list
    Xml,
}

/// Load a plist from `stream`, detecting binary or XML from its first bytes.
pub fn load<R: Read + Seek>(stream: &mut R) -> Result<Node> {
    let format = detect_format(stream)?;
    debug!("loading {:?} plist", format);
    match format {
        Format::Binary => reader::read(stream),
        Format::Xml => xml::read(stream),
    }
}

/// Load a plist held in memory.
pub fn load_from_slice(bytes: &[u8]) -> Result<Node> {
    load(&mut std::io::Cursor::new(bytes))
}

/// Peek at the start of `stream` and rewind it.
pub fn detect_format<R: Read + Seek>(stream: &mut R) -> Result<Format> {
    stream.seek(SeekFrom::Start(0))?;
    let mut head = Vec::with_capacity(HEADER_SIZE as usize);
    stream.by_ref().take(HEADER_SIZE).read_to_end(&mut head)?;
    stream.seek(SeekFrom::Start(0))?;
    Ok(if head.starts_with(HEADER_MAGIC) {
        Format::Binary
    } else {
        Format::Xml
    })
}

/// Save `root` to `sink` in `format`.
pub fn save<W: Write + ?Sized>(root: &Node, sink: &mut W, format: Format) -> Result<()> {
    match format {
        Format::Binary => writer::write(sink, root),
        Format::Xml => xml::write(sink, root, true),
    }
}

/// Render `root` as XML text, with or without the document header and
/// `<plist>` wrapper.
pub fn save_to_string(root: &Node, write_document_meta: bool) -> Result<String> {
    xml::to_string(root, write_document_meta)
}
