//! Maps binary tags and XML element names to empty nodes of the matching kind.

use crate::error::{Error, Result};
use crate::node::{
    Date, Dictionary, Node, PlistString, TAG_ARRAY, TAG_ASCII_STRING, TAG_BOOLEAN, TAG_DATA,
    TAG_DATE, TAG_DICTIONARY, TAG_INTEGER, TAG_REAL, TAG_UID, TAG_UTF16_STRING,
};

/// Cap on the capacity reserved from a container's declared length.
const MAX_PREALLOCATED: u64 = 4096;

/// A zeroed node for binary `tag`. The payload is filled in afterwards,
/// using the same `length`.
pub fn create(tag: u8, length: u64) -> Result<Node> {
    let capacity = length.min(MAX_PREALLOCATED) as usize;
    Ok(match tag {
        TAG_BOOLEAN => Node::Boolean(false),
        TAG_INTEGER => Node::Integer(0),
        TAG_REAL => Node::Real(0.0),
        TAG_DATE => Node::Date(Date::default()),
        TAG_DATA => Node::Data(Vec::new()),
        TAG_ASCII_STRING => Node::String(PlistString::default()),
        TAG_UTF16_STRING => Node::String(PlistString::empty_utf16()),
        TAG_UID => Node::Uid(0),
        TAG_ARRAY => Node::Array(Vec::with_capacity(capacity)),
        TAG_DICTIONARY => Node::Dictionary(Dictionary::with_capacity(capacity)),
        other => {
            return Err(Error::format(format!("unsupported object tag 0x{:X}", other)));
        }
    })
}

/// A zeroed node for the XML element `name`.
pub fn create_xml(name: &str) -> Result<Node> {
    Ok(match name {
        "true" => Node::Boolean(true),
        "false" => Node::Boolean(false),
        "integer" => Node::Integer(0),
        "real" => Node::Real(0.0),
        "date" => Node::Date(Date::default()),
        "data" => Node::Data(Vec::new()),
        "string" => Node::String(PlistString::default()),
        "array" => Node::Array(Vec::new()),
        "dict" => Node::Dictionary(Dictionary::new()),
        other => {
            return Err(Error::format(format!("unsupported element <{}>", other)));
        }
    })
}

/// The string object a dictionary key is stored as.
pub fn key_element(key: &str) -> Node {
    Node::String(PlistString::new(key))
}

/// The integer object that carries an extended marker length.
pub fn length_element(length: u64) -> Result<Node> {
    i64::try_from(length)
        .map(Node::Integer)
        .map_err(|_| Error::format(format!("object length {} is too large", length)))
}
