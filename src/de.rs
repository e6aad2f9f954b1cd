//! Serde deserializer reading from plist [`Node`] trees.
//!
//! Plists are self-describing, so every `deserialize_*` call is driven by
//! the node actually present. Dates reach plain visitors as RFC 3339
//! strings and UIDs as `u64`; the [`crate::date`] and [`crate::uid`]
//! helpers get the underlying values directly.

use crate::error::{Error, Result};
use crate::node::{Dictionary, Node};
use crate::plist;
use crate::{DATE_TOKEN, UID_TOKEN, xml};
use serde::de::value::{BorrowedStrDeserializer, StrDeserializer};
use serde::de::{
    self, Deserialize, DeserializeOwned, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use std::fmt;
use std::io::{Read, Seek};

/// Deserialize a value borrowing from a node tree.
pub fn from_node<'de, T: Deserialize<'de>>(node: &'de Node) -> Result<T> {
    T::deserialize(Deserializer::new(node))
}

/// Deserialize a value from a binary or XML plist held in memory.
pub fn from_bytes<T: DeserializeOwned>(input: &[u8]) -> Result<T> {
    let node = plist::load_from_slice(input)?;
    from_node(&node)
}

/// Deserialize a value from a binary or XML plist stream.
pub fn from_reader<R: Read + Seek, T: DeserializeOwned>(mut reader: R) -> Result<T> {
    let node = plist::load(&mut reader)?;
    from_node(&node)
}

/// Deserialize a value from an XML plist document.
pub fn from_xml_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    let node = xml::from_str(text)?;
    from_node(&node)
}

/// Deserializer over a borrowed [`Node`].
#[derive(Clone, Copy)]
pub struct Deserializer<'de> {
    node: &'de Node,
}

impl<'de> Deserializer<'de> {
    pub fn new(node: &'de Node) -> Self {
        Deserializer { node }
    }
}

// ── Main Deserializer impl ─────────────────────────────────────────────────

impl<'de> de::Deserializer<'de> for Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.node {
            Node::Boolean(v) => visitor.visit_bool(*v),
            Node::Integer(v) => visitor.visit_i64(*v),
            Node::Real(v) => visitor.visit_f64(*v),
            Node::String(s) => visitor.visit_borrowed_str(s.as_str()),
            Node::Date(d) => visitor.visit_string(d.to_rfc3339()?),
            Node::Data(bytes) => visitor.visit_borrowed_bytes(bytes),
            Node::Uid(v) => visitor.visit_u64(*v),
            Node::Array(items) => visit_array(items, visitor),
            Node::Dictionary(dict) => visitor.visit_map(MapDeserializer::new(dict)),
        }
    }

    /// Present values are always `Some`; absent struct fields become `None`
    /// without reaching the deserializer.
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        match (name, self.node) {
            (UID_TOKEN, Node::Uid(v)) => visitor.visit_u64(*v),
            (DATE_TOKEN, Node::Date(d)) => visitor.visit_f64(d.reference_seconds()),
            (UID_TOKEN | DATE_TOKEN, _) => self.deserialize_any(visitor),
            _ => visitor.visit_newtype_struct(self),
        }
    }

    /// Unit variants are strings; every other variant is a one-entry
    /// dictionary keyed by the variant name.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.node {
            Node::String(s) => {
                let variant: StrDeserializer<'_, Error> = s.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            Node::Dictionary(dict) if dict.len() == 1 => match dict.first() {
                Some((variant, value)) => visitor.visit_enum(EnumDeserializer {
                    variant: variant.as_str(),
                    value,
                }),
                None => Err(Error::Message("empty enum dictionary".to_string())),
            },
            other => Err(Error::Message(format!(
                "expected an enum as a string or single-entry dictionary, found {}",
                other.kind()
            ))),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: &'de [Node], visitor: V) -> Result<V::Value> {
    let mut seq = SeqDeserializer {
        iter: items.iter(),
    };
    let value = visitor.visit_seq(&mut seq)?;
    match seq.iter.len() {
        0 => Ok(value),
        _ => Err(de::Error::invalid_length(items.len(), &"fewer elements in array")),
    }
}

// ── SeqDeserializer ────────────────────────────────────────────────────────

struct SeqDeserializer<'de> {
    iter: std::slice::Iter<'de, Node>,
}

impl<'de> SeqAccess<'de> for SeqDeserializer<'de> {
    type Error = Error;

    fn next_element_seed<T: de::DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.iter.next() {
            Some(node) => seed.deserialize(Deserializer::new(node)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

// ── MapDeserializer ────────────────────────────────────────────────────────

struct MapDeserializer<'de> {
    iter: indexmap::map::Iter<'de, String, Node>,
    value: Option<&'de Node>,
}

impl<'de> MapDeserializer<'de> {
    fn new(dict: &'de Dictionary) -> Self {
        MapDeserializer {
            iter: dict.iter(),
            value: None,
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer<'de> {
    type Error = Error;

    fn next_key_seed<K: de::DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(BorrowedStrDeserializer::<Error>::new(key.as_str()))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: de::DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let value = self
            .value
            .take()
            .ok_or_else(|| Error::Message("map value requested before its key".to_string()))?;
        seed.deserialize(Deserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

// ── EnumDeserializer ───────────────────────────────────────────────────────

struct EnumDeserializer<'de> {
    variant: &'de str,
    value: &'de Node,
}

impl<'de> EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = Error;
    type Variant = Deserializer<'de>;

    fn variant_seed<V: de::DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(BorrowedStrDeserializer::<Error>::new(self.variant))?;
        Ok((variant, Deserializer::new(self.value)))
    }
}

impl<'de> VariantAccess<'de> for Deserializer<'de> {
    type Error = Error;

    /// Unit variants are written as bare strings, never as a dictionary
    fn unit_variant(self) -> Result<()> {
        Err(Error::Message(format!(
            "unit variant carries a {} payload",
            self.node.kind()
        )))
    }

    fn newtype_variant_seed<T: de::DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_map(self, visitor)
    }
}

// ── Deserialize for Node ───────────────────────────────────────────────────

/// Builds a node from any self-describing format.
///
/// Going through the serde data model, a UID arrives as an unsigned integer
/// and a date as a string; they come back as [`Node::Integer`] and
/// [`Node::String`]. Use [`crate::load`] to keep every node kind intact.
impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> std::result::Result<Node, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a plist value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Node, E> {
        Ok(Node::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Node, E> {
        Ok(Node::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Node, E> {
        i64::try_from(v)
            .map(Node::Integer)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Node, E> {
        Ok(Node::Real(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Node, E> {
        Ok(Node::Data(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<Node, E> {
        Ok(Node::Data(v))
    }

    fn visit_some<D: de::Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_newtype_struct<D: de::Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Node, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Node, A::Error> {
        let mut dict = Dictionary::with_capacity(map.size_hint().unwrap_or(0).min(4096));
        while let Some((key, value)) = map.next_entry::<String, Node>()? {
            dict.insert(key, value);
        }
        Ok(Node::Dictionary(dict))
    }
}
