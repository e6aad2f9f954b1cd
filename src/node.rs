//! The plist object model.
//!
//! A plist document is a tree of [`Node`]s. Scalars carry their value
//! directly; arrays and dictionaries own their children, so a tree can never
//! contain cycles or back-references.
//!
//! Each node knows its binary marker (`binary_tag` / `binary_length`) and
//! how to encode and decode its own payload. Container payloads are object
//! reference tables and belong to the binary reader and writer instead.

use crate::endian;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::ops::Deref;

/// Insertion-ordered string-keyed map used for plist dictionaries.
pub type Dictionary = IndexMap<String, Node>;

// ── Binary tags ────────────────────────────────────────────────────────────

pub const TAG_BOOLEAN: u8 = 0x0;
pub const TAG_INTEGER: u8 = 0x1;
pub const TAG_REAL: u8 = 0x2;
pub const TAG_DATE: u8 = 0x3;
pub const TAG_DATA: u8 = 0x4;
pub const TAG_ASCII_STRING: u8 = 0x5;
pub const TAG_UTF16_STRING: u8 = 0x6;
pub const TAG_UID: u8 = 0x8;
pub const TAG_ARRAY: u8 = 0xA;
pub const TAG_DICTIONARY: u8 = 0xD;

/// Marker length of the `false` singleton.
pub(crate) const BOOLEAN_FALSE: u64 = 0x8;
/// Marker length of the `true` singleton.
pub(crate) const BOOLEAN_TRUE: u64 = 0x9;

/// Length class used for every real and date written (8-byte double).
const DOUBLE_CLASS: u64 = 3;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
const REFERENCE_EPOCH_UNIX: i64 = 978_307_200;

/// Deepest array/dictionary nesting the readers and writers accept.
pub const MAX_DEPTH: usize = 512;

pub(crate) fn nesting_error() -> Error {
    Error::format(format!("containers nested deeper than {} levels", MAX_DEPTH))
}

// ── Node ───────────────────────────────────────────────────────────────────

/// One value in a plist object graph.
#[derive(Debug, Clone)]
pub enum Node {
    Boolean(bool),
    /// Signed 64-bit integer
    Integer(i64),
    /// IEEE-754 double
    Real(f64),
    String(PlistString),
    Date(Date),
    Data(Vec<u8>),
    /// Keyed-archiver object reference (`CF$UID`)
    Uid(u64),
    Array(Vec<Node>),
    Dictionary(Dictionary),
}

/// The kind of a [`Node`], without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Boolean,
    Integer,
    Real,
    String,
    Date,
    Data,
    Uid,
    Array,
    Dictionary,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Boolean => "boolean",
            NodeKind::Integer => "integer",
            NodeKind::Real => "real",
            NodeKind::String => "string",
            NodeKind::Date => "date",
            NodeKind::Data => "data",
            NodeKind::Uid => "uid",
            NodeKind::Array => "array",
            NodeKind::Dictionary => "dictionary",
        };
        f.write_str(name)
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Boolean(_) => NodeKind::Boolean,
            Node::Integer(_) => NodeKind::Integer,
            Node::Real(_) => NodeKind::Real,
            Node::String(_) => NodeKind::String,
            Node::Date(_) => NodeKind::Date,
            Node::Data(_) => NodeKind::Data,
            Node::Uid(_) => NodeKind::Uid,
            Node::Array(_) => NodeKind::Array,
            Node::Dictionary(_) => NodeKind::Dictionary,
        }
    }

    /// The 4-bit type code written in the high nibble of the marker byte.
    pub fn binary_tag(&self) -> u8 {
        match self {
            Node::Boolean(_) => TAG_BOOLEAN,
            Node::Integer(_) => TAG_INTEGER,
            Node::Real(_) => TAG_REAL,
            Node::Date(_) => TAG_DATE,
            Node::Data(_) => TAG_DATA,
            Node::String(s) => s.binary_tag(),
            Node::Uid(_) => TAG_UID,
            Node::Array(_) => TAG_ARRAY,
            Node::Dictionary(_) => TAG_DICTIONARY,
        }
    }

    /// The payload size class written in the low nibble of the marker byte
    /// (or as an extended length when it does not fit).
    ///
    /// For integers and UIDs this is the power-of-two byte-count selector;
    /// for strings, data and containers it is the element count.
    pub fn binary_length(&self) -> u64 {
        match self {
            Node::Boolean(false) => BOOLEAN_FALSE,
            Node::Boolean(true) => BOOLEAN_TRUE,
            Node::Integer(v) => integer_class(*v),
            Node::Real(_) | Node::Date(_) => DOUBLE_CLASS,
            Node::Data(bytes) => bytes.len() as u64,
            Node::String(s) => s.binary_length(),
            Node::Uid(v) => uid_class(*v),
            Node::Array(items) => items.len() as u64,
            Node::Dictionary(dict) => dict.len() as u64,
        }
    }

    /// Whether value-equal instances may share one stored object.
    pub fn is_binary_unique(&self) -> bool {
        matches!(
            self,
            Node::Boolean(_) | Node::Integer(_) | Node::String(_) | Node::Uid(_)
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Array(_) | Node::Dictionary(_))
    }

    /// Decode this scalar's payload from `stream`, given the marker length.
    pub fn read_binary<R: Read + ?Sized>(&mut self, stream: &mut R, length: u64) -> Result<()> {
        match self {
            Node::Boolean(value) => {
                *value = match length {
                    BOOLEAN_FALSE => false,
                    BOOLEAN_TRUE => true,
                    other => {
                        return Err(Error::format(format!(
                            "unsupported singleton marker 0x0{:X}",
                            other
                        )));
                    }
                }
            }
            Node::Integer(value) => {
                let width = endian::class_width(length, "integer")?;
                let raw = endian::read_uint(&endian::read_bytes(stream, width, "integer")?)?;
                // one byte is unsigned, wider classes are two's complement
                *value = match width {
                    1 => raw as i64,
                    2 => raw as u16 as i16 as i64,
                    4 => raw as u32 as i32 as i64,
                    _ => raw as i64,
                };
            }
            Node::Uid(value) => {
                let width = endian::class_width(length, "uid")?;
                let buf = endian::read_bytes(stream, width, "uid")?;
                *value = endian::read_uint(&buf)?;
            }
            Node::Real(value) => *value = read_float(stream, length, "real")?,
            Node::Date(value) => *value = Date::from_reference_seconds(read_float(stream, length, "date")?),
            Node::Data(value) => *value = endian::read_bytes(stream, length, "data")?,
            Node::String(value) => {
                let decoded = if value.is_utf16() {
                    let byte_len = length
                        .checked_mul(2)
                        .ok_or_else(|| Error::format("string length overflows"))?;
                    let buf = endian::read_bytes(stream, byte_len, "utf-16 string")?;
                    let units: Vec<u16> = buf
                        .chunks_exact(2)
                        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                        .collect();
                    String::from_utf16(&units)
                        .map_err(|e| Error::format(format!("invalid utf-16 string: {}", e)))?
                } else {
                    let buf = endian::read_bytes(stream, length, "string")?;
                    buf.iter().map(|&b| b as char).collect()
                };
                value.set(decoded);
            }
            Node::Array(_) | Node::Dictionary(_) => {
                return Err(Error::format(format!(
                    "{} payloads are object reference tables",
                    self.kind()
                )));
            }
        }
        Ok(())
    }

    /// Encode this scalar's payload. The marker byte is not written here.
    pub fn write_binary<W: Write + ?Sized>(&self, sink: &mut W) -> Result<()> {
        match self {
            Node::Boolean(_) => {}
            Node::Integer(v) => match integer_class(*v) {
                0 => sink.write_all(&[*v as u8])?,
                1 => sink.write_all(&(*v as i16).to_be_bytes())?,
                2 => sink.write_all(&(*v as i32).to_be_bytes())?,
                _ => sink.write_all(&v.to_be_bytes())?,
            },
            Node::Uid(v) => match uid_class(*v) {
                0 => sink.write_all(&[*v as u8])?,
                1 => sink.write_all(&(*v as u16).to_be_bytes())?,
                2 => sink.write_all(&(*v as u32).to_be_bytes())?,
                _ => sink.write_all(&v.to_be_bytes())?,
            },
            Node::Real(v) => sink.write_all(&v.to_be_bytes())?,
            Node::Date(d) => sink.write_all(&d.reference_seconds().to_be_bytes())?,
            Node::Data(bytes) => sink.write_all(bytes)?,
            Node::String(s) if s.is_utf16() => {
                let buf: Vec<u8> = s.encode_utf16().flat_map(u16::to_be_bytes).collect();
                sink.write_all(&buf)?;
            }
            Node::String(s) => {
                // every char is <= U+00FF here, one byte each
                let buf: Vec<u8> = s.chars().map(|c| c as u32 as u8).collect();
                sink.write_all(&buf)?;
            }
            Node::Array(_) | Node::Dictionary(_) => {
                return Err(Error::format(format!(
                    "{} payloads are object reference tables",
                    self.kind()
                )));
            }
        }
        Ok(())
    }

    /// The XML element name for this node.
    pub fn xml_tag(&self) -> &'static str {
        match self {
            Node::Boolean(true) => "true",
            Node::Boolean(false) => "false",
            Node::Integer(_) | Node::Uid(_) => "integer",
            Node::Real(_) => "real",
            Node::String(_) => "string",
            Node::Date(_) => "date",
            Node::Data(_) => "data",
            Node::Array(_) => "array",
            Node::Dictionary(_) => "dict",
        }
    }

    /// Set this scalar's value from the text content of its XML element.
    pub fn parse(&mut self, text: &str) -> Result<()> {
        let trimmed = text.trim();
        let invalid = |kind: NodeKind| Error::format(format!("invalid {} value {:?}", kind, trimmed));
        match self {
            Node::Boolean(value) => {
                *value = match trimmed {
                    "true" => true,
                    "false" => false,
                    _ => return Err(invalid(NodeKind::Boolean)),
                }
            }
            Node::Integer(value) => *value = parse_integer(trimmed).ok_or_else(|| invalid(NodeKind::Integer))?,
            Node::Uid(value) => *value = trimmed.parse().map_err(|_| invalid(NodeKind::Uid))?,
            Node::Real(value) => *value = trimmed.parse().map_err(|_| invalid(NodeKind::Real))?,
            Node::Date(value) => {
                let parsed = DateTime::parse_from_rfc3339(trimmed).map_err(|_| invalid(NodeKind::Date))?;
                *value = Date::from(parsed.with_timezone(&Utc));
            }
            Node::Data(value) => {
                let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                *value = BASE64.decode(compact).map_err(|_| invalid(NodeKind::Data))?;
            }
            Node::String(value) => value.set(text),
            Node::Array(_) | Node::Dictionary(_) => {
                return Err(Error::format(format!(
                    "{} cannot be parsed from text",
                    self.kind()
                )));
            }
        }
        Ok(())
    }

    /// The text content of this scalar's XML element, unescaped.
    pub fn to_xml_string(&self) -> Result<String> {
        Ok(match self {
            Node::Boolean(v) => v.to_string(),
            Node::Integer(v) => v.to_string(),
            Node::Uid(v) => v.to_string(),
            Node::Real(v) => format_real(*v),
            Node::Date(d) => d.to_rfc3339()?,
            Node::Data(bytes) => BASE64.encode(bytes),
            Node::String(s) => s.as_str().to_string(),
            Node::Array(_) | Node::Dictionary(_) => {
                return Err(Error::format(format!(
                    "{} has no scalar text form",
                    self.kind()
                )));
            }
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Node::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Node::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Node::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Node::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_uid(&self) -> Option<u64> {
        match self {
            Node::Uid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Node::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Node::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Look up `key` when this node is a dictionary.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_dictionary().and_then(|dict| dict.get(key))
    }
}

/// Value equality. Reals and dates compare bit-for-bit.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Boolean(a), Node::Boolean(b)) => a == b,
            (Node::Integer(a), Node::Integer(b)) => a == b,
            (Node::Real(a), Node::Real(b)) => a.to_bits() == b.to_bits(),
            (Node::String(a), Node::String(b)) => a == b,
            (Node::Date(a), Node::Date(b)) => a == b,
            (Node::Data(a), Node::Data(b)) => a == b,
            (Node::Uid(a), Node::Uid(b)) => a == b,
            (Node::Array(a), Node::Array(b)) => a == b,
            (Node::Dictionary(a), Node::Dictionary(b)) => a == b,
            _ => false,
        }
    }
}

/// Smallest length class for an integer: one unsigned byte for 0..=255,
/// otherwise the narrowest signed width that holds the value.
fn integer_class(v: i64) -> u64 {
    if (0..=0xFF).contains(&v) {
        0
    } else if i16::try_from(v).is_ok() {
        1
    } else if i32::try_from(v).is_ok() {
        2
    } else {
        3
    }
}

fn uid_class(v: u64) -> u64 {
    if u8::try_from(v).is_ok() {
        0
    } else if u16::try_from(v).is_ok() {
        1
    } else if u32::try_from(v).is_ok() {
        2
    } else {
        3
    }
}

fn read_float<R: Read + ?Sized>(stream: &mut R, length: u64, what: &str) -> Result<f64> {
    match length {
        2 => {
            let buf: [u8; 4] = endian::read_array(stream, what)?;
            Ok(f32::from_be_bytes(buf) as f64)
        }
        3 => {
            let buf: [u8; 8] = endian::read_array(stream, what)?;
            Ok(f64::from_be_bytes(buf))
        }
        class => Err(Error::format(format!(
            "{} must be 4 or 8 bytes wide (length class {})",
            what, class
        ))),
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn format_real(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v == f64::INFINITY {
        "+infinity".to_string()
    } else if v == f64::NEG_INFINITY {
        "-infinity".to_string()
    } else {
        v.to_string()
    }
}

// ── PlistString ────────────────────────────────────────────────────────────

/// A string value together with its binary encoding.
///
/// The encoding is re-derived whenever the value is set: if every character
/// is at most U+00FF the string is stored one byte per character (tag 5),
/// otherwise as UTF-16BE (tag 6).
#[derive(Debug, Clone, Default)]
pub struct PlistString {
    value: String,
    utf16: bool,
}

impl PlistString {
    pub fn new(value: impl Into<String>) -> Self {
        let mut s = PlistString::default();
        s.set(value);
        s
    }

    /// An empty string that decodes its payload as UTF-16BE.
    pub(crate) fn empty_utf16() -> Self {
        PlistString {
            value: String::new(),
            utf16: true,
        }
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.utf16 = self.value.chars().any(|c| c as u32 > 0xFF);
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }

    pub fn is_utf16(&self) -> bool {
        self.utf16
    }

    pub fn binary_tag(&self) -> u8 {
        if self.utf16 { TAG_UTF16_STRING } else { TAG_ASCII_STRING }
    }

    /// Character count: UTF-16 code units for tag 6, chars for tag 5.
    pub fn binary_length(&self) -> u64 {
        if self.utf16 {
            self.value.encode_utf16().count() as u64
        } else {
            self.value.chars().count() as u64
        }
    }
}

impl PartialEq for PlistString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for PlistString {}

impl Hash for PlistString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Deref for PlistString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for PlistString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for PlistString {
    fn from(value: &str) -> Self {
        PlistString::new(value)
    }
}

impl From<String> for PlistString {
    fn from(value: String) -> Self {
        PlistString::new(value)
    }
}

// ── Date ───────────────────────────────────────────────────────────────────

/// A point in time, stored as seconds since 2001-01-01T00:00:00Z.
///
/// Keeping the raw seconds makes a binary read/write round-trip exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct Date {
    seconds: f64,
}

impl Date {
    pub fn from_reference_seconds(seconds: f64) -> Self {
        Date { seconds }
    }

    /// Seconds relative to 2001-01-01T00:00:00Z.
    pub fn reference_seconds(&self) -> f64 {
        self.seconds
    }

    /// The UTC instant, or `None` when it is outside chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if !self.seconds.is_finite() {
            return None;
        }
        let whole = self.seconds.floor();
        let mut nanos = ((self.seconds - whole) * 1e9).round() as i64;
        let mut secs = whole as i64;
        if nanos >= 1_000_000_000 {
            secs = secs.checked_add(1)?;
            nanos -= 1_000_000_000;
        }
        DateTime::from_timestamp(secs.checked_add(REFERENCE_EPOCH_UNIX)?, nanos as u32)
    }

    pub(crate) fn to_rfc3339(&self) -> Result<String> {
        let datetime = self
            .to_datetime()
            .ok_or_else(|| Error::format(format!("date {} s is out of range", self.seconds)))?;
        Ok(datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.seconds.to_bits() == other.seconds.to_bits()
    }
}

impl From<DateTime<Utc>> for Date {
    fn from(value: DateTime<Utc>) -> Self {
        let whole = (value.timestamp() - REFERENCE_EPOCH_UNIX) as f64;
        Date {
            seconds: whole + value.timestamp_subsec_nanos() as f64 / 1e9,
        }
    }
}

// ── Conversions ────────────────────────────────────────────────────────────

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Boolean(v)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Node::Integer(v)
    }
}

impl From<i32> for Node {
    fn from(v: i32) -> Self {
        Node::Integer(v as i64)
    }
}

impl From<u32> for Node {
    fn from(v: u32) -> Self {
        Node::Integer(v as i64)
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Node::Real(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::String(PlistString::new(v))
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::String(PlistString::new(v))
    }
}

impl From<Date> for Node {
    fn from(v: Date) -> Self {
        Node::Date(v)
    }
}

impl From<DateTime<Utc>> for Node {
    fn from(v: DateTime<Utc>) -> Self {
        Node::Date(Date::from(v))
    }
}

impl From<Vec<u8>> for Node {
    fn from(v: Vec<u8>) -> Self {
        Node::Data(v)
    }
}

impl From<Vec<Node>> for Node {
    fn from(v: Vec<Node>) -> Self {
        Node::Array(v)
    }
}

impl From<Dictionary> for Node {
    fn from(v: Dictionary) -> Self {
        Node::Dictionary(v)
    }
}

impl FromIterator<Node> for Node {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Node::Array(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Node {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        Node::Dictionary(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
