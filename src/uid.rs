//! Serde helper module for plist UIDs.
//!
//! A UID is the object reference `NSKeyedArchiver` writes between archived
//! objects. It has no serde data-model equivalent, so a plain `u64` field
//! would be written as an integer. Annotate the field with
//! `#[serde(with = "plist_serde::uid")]` to write and read a real UID node
//! instead.
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use plist_serde::{Node, from_node, to_node};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Archive {
//!     #[serde(with = "plist_serde::uid")]
//!     root: u64,
//! }
//!
//! let archive = Archive { root: 1 };
//! let node = to_node(&archive).unwrap();
//! assert_eq!(node.get("root"), Some(&Node::Uid(1)));
//!
//! let decoded: Archive = from_node(&node).unwrap();
//! assert_eq!(archive, decoded);
//! ```
//!
//! With other serde formats the value travels as eight big-endian bytes.

use crate::UID_TOKEN;
use serde::de::{self, Visitor};
use std::fmt;

// ── serde `with` module functions ─────────────────────────────────────────

/// Serialize `value` as a UID.
pub fn serialize<S: serde::Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    // The plist serializer recognizes UID_TOKEN and rebuilds the UID from
    // the eight bytes inside.
    serializer.serialize_newtype_struct(UID_TOKEN, &UidBytes(*value))
}

/// Deserialize a UID. Plain integers are accepted as well.
pub fn deserialize<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_newtype_struct(UID_TOKEN, UidVisitor)
}

// ── Internal types ─────────────────────────────────────────────────────────

/// A UID value serialized as its eight big-endian bytes.
pub(crate) struct UidBytes(pub u64);

impl serde::Serialize for UidBytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0.to_be_bytes())
    }
}

struct UidVisitor;

impl<'de> Visitor<'de> for UidVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a plist uid")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_newtype_struct<D: serde::Deserializer<'de>>(self, de: D) -> Result<u64, D::Error> {
        de.deserialize_any(self)
    }

    // Fallback paths for other formats, which see the raw bytes.
    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<u64, E> {
        let raw: [u8; 8] = v.try_into().map_err(|_| E::invalid_length(v.len(), &self))?;
        Ok(u64::from_be_bytes(raw))
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<u64, A::Error> {
        let mut buf = Vec::with_capacity(8);
        while let Some(b) = seq.next_element::<u8>()? {
            buf.push(b);
        }
        self.visit_bytes(&buf)
    }
}
