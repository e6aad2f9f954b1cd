//! Serde serializer producing plist [`Node`] trees.
//!
//! [`Serializer`] turns any `T: Serialize` into a [`Node`], which can then
//! be written in either format. [`to_bytes`] and [`to_writer`] go straight
//! to a binary plist.
//!
//! ## Type mapping
//! - `bool` → Boolean
//! - all integers → Integer (`u64` above `i64::MAX` is an error)
//! - `f32`, `f64` → Real
//! - `char`, `&str`, `String` → String
//! - `&[u8]` (via `serde_bytes`) → Data
//! - seqs, tuples → Array
//! - maps, structs → Dictionary (keys must serialize to strings)
//! - `None`, `()` → omitted from dictionaries, rejected elsewhere
//! - unit variant → String; other variants → `{variant: payload}`

use crate::error::{Error, Result};
use crate::node::{Date, Dictionary, Node};
use crate::uid::UidBytes;
use crate::plist::{self, Format};
use crate::{DATE_TOKEN, UID_TOKEN, writer, xml};
use serde::ser::{self, Serialize};
use std::io::Write;

// ── Public entry points ────────────────────────────────────────────────────

/// Convert `value` into a plist node tree.
pub fn to_node<T: Serialize + ?Sized>(value: &T) -> Result<Node> {
    value
        .serialize(Serializer)?
        .ok_or(Error::Unsupported("None or unit as the root value"))
}

/// Serialize `value` into a freshly allocated binary plist.
pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    writer::to_vec(&to_node(value)?)
}

/// Serialize `value` as a binary plist, writing it into `sink`.
pub fn to_writer<W: Write, T: Serialize + ?Sized>(sink: W, value: &T) -> Result<()> {
    to_writer_with_format(sink, value, Format::Binary)
}

/// Serialize `value` into `sink` in the given `format`.
pub fn to_writer_with_format<W: Write, T: Serialize + ?Sized>(
    mut sink: W,
    value: &T,
    format: Format,
) -> Result<()> {
    plist::save(&to_node(value)?, &mut sink, format)
}

/// Serialize `value` as a complete XML plist document.
pub fn to_xml_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    xml::to_string(&to_node(value)?, true)
}

// ── Serializer ─────────────────────────────────────────────────────────────

/// Serializer whose output is a [`Node`].
///
/// `Ok(None)` means the value has no plist form (`None`, `()`) and is
/// dropped by the enclosing dictionary.
///
/// ```rust
/// use plist_serde::{Node, ser::Serializer};
/// use serde::Serialize;
///
/// let node = 42u32.serialize(Serializer).unwrap();
/// assert_eq!(node, Some(Node::Integer(42)));
/// ```
pub struct Serializer;

impl ser::Serializer for Serializer {
    type Ok = Option<Node>;
    type Error = Error;

    type SerializeSeq = SerializeArray;
    type SerializeTuple = SerializeArray;
    type SerializeTupleStruct = SerializeArray;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeDictionary;
    type SerializeStruct = SerializeDictionary;
    type SerializeStructVariant = SerializeStructVariant;

    // ── Primitives ─────────────────────────────────────────────────────────

    fn serialize_bool(self, v: bool) -> Result<Option<Node>> {
        Ok(Some(Node::Boolean(v)))
    }

    fn serialize_i8(self, v: i8) -> Result<Option<Node>> {
        self.serialize_i64(v as i64)
    }
    fn serialize_i16(self, v: i16) -> Result<Option<Node>> {
        self.serialize_i64(v as i64)
    }
    fn serialize_i32(self, v: i32) -> Result<Option<Node>> {
        self.serialize_i64(v as i64)
    }
    fn serialize_i64(self, v: i64) -> Result<Option<Node>> {
        Ok(Some(Node::Integer(v)))
    }

    fn serialize_u8(self, v: u8) -> Result<Option<Node>> {
        self.serialize_i64(v as i64)
    }
    fn serialize_u16(self, v: u16) -> Result<Option<Node>> {
        self.serialize_i64(v as i64)
    }
    fn serialize_u32(self, v: u32) -> Result<Option<Node>> {
        self.serialize_i64(v as i64)
    }
    fn serialize_u64(self, v: u64) -> Result<Option<Node>> {
        let v = i64::try_from(v)
            .map_err(|_| Error::Message(format!("integer {} does not fit in a plist integer", v)))?;
        self.serialize_i64(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Option<Node>> {
        self.serialize_f64(v as f64)
    }
    fn serialize_f64(self, v: f64) -> Result<Option<Node>> {
        Ok(Some(Node::Real(v)))
    }

    fn serialize_char(self, v: char) -> Result<Option<Node>> {
        Ok(Some(Node::from(v.to_string())))
    }

    fn serialize_str(self, v: &str) -> Result<Option<Node>> {
        Ok(Some(Node::from(v)))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Option<Node>> {
        Ok(Some(Node::Data(v.to_vec())))
    }

    fn serialize_none(self) -> Result<Option<Node>> {
        Ok(None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Option<Node>> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Option<Node>> {
        Ok(None)
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<Option<Node>> {
        Ok(None)
    }

    /// Unit enum variant → its name as a string
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Option<Node>> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Option<Node>> {
        // The uid and date helpers hide their payload behind a private
        // newtype name; turn that payload back into the right node kind.
        match name {
            UID_TOKEN => match value.serialize(self)? {
                Some(Node::Data(bytes)) => {
                    let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                        Error::Message(format!("uid payload must be 8 bytes, got {}", bytes.len()))
                    })?;
                    Ok(Some(Node::Uid(u64::from_be_bytes(raw))))
                }
                _ => Err(Error::Message("uid payload must be bytes".to_string())),
            },
            DATE_TOKEN => match value.serialize(self)? {
                Some(Node::Real(seconds)) => {
                    Ok(Some(Node::Date(Date::from_reference_seconds(seconds))))
                }
                _ => Err(Error::Message("date payload must be a float".to_string())),
            },
            _ => value.serialize(self),
        }
    }

    /// Newtype variant → `{variant: value}`
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Option<Node>> {
        let payload = required(value.serialize(self)?, "None or unit as a variant payload")?;
        Ok(variant_wrapper(variant, payload))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeArray> {
        Ok(SerializeArray {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeArray> {
        self.serialize_seq(Some(len))
    }
    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeArray> {
        self.serialize_seq(Some(len))
    }

    /// Tuple variant → `{variant: [fields...]}`
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant> {
        Ok(SerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeDictionary> {
        Ok(SerializeDictionary {
            dict: Dictionary::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeDictionary> {
        self.serialize_map(Some(len))
    }

    /// Struct variant → `{variant: {fields...}}`
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeStructVariant> {
        Ok(SerializeStructVariant {
            variant,
            dict: Dictionary::with_capacity(len),
        })
    }
}

fn required(node: Option<Node>, context: &'static str) -> Result<Node> {
    node.ok_or(Error::Unsupported(context))
}

fn variant_wrapper(variant: &'static str, payload: Node) -> Option<Node> {
    let mut dict = Dictionary::new();
    dict.insert(variant.to_string(), payload);
    Some(Node::Dictionary(dict))
}

// ── Compound serializers ───────────────────────────────────────────────────

pub struct SerializeArray {
    items: Vec<Node>,
}

macro_rules! forward_serialize_element {
    ($t:path, $method:ident) => {
        impl $t for SerializeArray {
            type Ok = Option<Node>;
            type Error = Error;
            fn $method<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
                let node = required(value.serialize(Serializer)?, "None or unit inside an array")?;
                self.items.push(node);
                Ok(())
            }
            fn end(self) -> Result<Option<Node>> {
                Ok(Some(Node::Array(self.items)))
            }
        }
    };
}

forward_serialize_element!(ser::SerializeSeq, serialize_element);
forward_serialize_element!(ser::SerializeTuple, serialize_element);
forward_serialize_element!(ser::SerializeTupleStruct, serialize_field);

pub struct SerializeTupleVariant {
    variant: &'static str,
    items: Vec<Node>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Option<Node>;
    type Error = Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let node = required(value.serialize(Serializer)?, "None or unit inside an array")?;
        self.items.push(node);
        Ok(())
    }
    fn end(self) -> Result<Option<Node>> {
        Ok(variant_wrapper(self.variant, Node::Array(self.items)))
    }
}

pub struct SerializeDictionary {
    dict: Dictionary,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeDictionary {
    type Ok = Option<Node>;
    type Error = Error;
    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        match key.serialize(Serializer)? {
            Some(Node::String(key)) => {
                self.next_key = Some(key.into_string());
                Ok(())
            }
            _ => Err(Error::Message("dictionary keys must be strings".to_string())),
        }
    }
    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| Error::Message("serialize_value called before serialize_key".to_string()))?;
        if let Some(node) = value.serialize(Serializer)? {
            self.dict.insert(key, node);
        }
        Ok(())
    }
    fn end(self) -> Result<Option<Node>> {
        Ok(Some(Node::Dictionary(self.dict)))
    }
}

impl ser::SerializeStruct for SerializeDictionary {
    type Ok = Option<Node>;
    type Error = Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        if let Some(node) = value.serialize(Serializer)? {
            self.dict.insert(key.to_string(), node);
        }
        Ok(())
    }
    fn end(self) -> Result<Option<Node>> {
        Ok(Some(Node::Dictionary(self.dict)))
    }
}

pub struct SerializeStructVariant {
    variant: &'static str,
    dict: Dictionary,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Option<Node>;
    type Error = Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        if let Some(node) = value.serialize(Serializer)? {
            self.dict.insert(key.to_string(), node);
        }
        Ok(())
    }
    fn end(self) -> Result<Option<Node>> {
        Ok(variant_wrapper(self.variant, Node::Dictionary(self.dict)))
    }
}

// ── Serialize for Node ─────────────────────────────────────────────────────

impl Serialize for Node {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Boolean(v) => serializer.serialize_bool(*v),
            Node::Integer(v) => serializer.serialize_i64(*v),
            Node::Real(v) => serializer.serialize_f64(*v),
            Node::String(s) => serializer.serialize_str(s.as_str()),
            Node::Date(d) => d.serialize(serializer),
            Node::Data(bytes) => serializer.serialize_bytes(bytes),
            Node::Uid(v) => serializer.serialize_newtype_struct(UID_TOKEN, &UidBytes(*v)),
            Node::Array(items) => serializer.collect_seq(items),
            Node::Dictionary(dict) => serializer.collect_map(dict),
        }
    }
}
