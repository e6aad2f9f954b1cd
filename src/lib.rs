//! # plist-serde
//!
//! A pure-Rust reader and writer for Apple property lists, in both the
//! compact binary encoding (`bplist00`) and the XML encoding, with a serde
//! bridge on top.
//!
//! ## Overview
//!
//! A plist document is a tree of [`Node`]s: booleans, integers, reals,
//! strings, dates, data, UIDs, arrays and string-keyed dictionaries.
//! [`load`] reads either encoding, picking the right one from the first
//! bytes of the stream; [`save`] writes the chosen [`Format`].
//!
//! The binary writer stores each distinct boolean, integer, string and UID
//! only once per document and picks the narrowest reference and offset
//! widths the document allows. All multi-byte values are big-endian.
//!
//! ## Serde type mapping
//!
//! | Rust / serde type | plist node |
//! |-------------------|------------|
//! | `bool`            | boolean |
//! | `i8` … `i64`, `u8` … `u64` | integer (`u64` above `i64::MAX` is rejected) |
//! | `f32`, `f64`      | real |
//! | `char`, `&str`, `String` | string |
//! | `&[u8]` via `serde_bytes` | data |
//! | `Option<T>`       | `T`, or left out of the enclosing dictionary |
//! | `()` / unit struct | left out of the enclosing dictionary |
//! | Unit enum variant | string holding the variant name |
//! | Other enum variants | single-entry dictionary `{variant: payload}` |
//! | `Vec<T>` / seq / tuple | array |
//! | Struct / map      | dictionary (keys must be strings) |
//! | `#[serde(with = "plist_serde::uid")] u64` | uid |
//! | `#[serde(with = "plist_serde::date")] DateTime<Utc>`, [`Date`] | date |
//!
//! ## Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use plist_serde::{Format, Node, from_bytes, load_from_slice, save_to_string, to_bytes};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Info {
//!     name: String,
//!     build: u32,
//!     tags: Vec<String>,
//! }
//!
//! let info = Info {
//!     name: "Demo".to_string(),
//!     build: 42,
//!     tags: vec!["a".to_string(), "b".to_string()],
//! };
//!
//! // Serialize to a binary plist
//! let bytes = to_bytes(&info).unwrap();
//! assert_eq!(&bytes[..8], b"bplist00");
//!
//! // Deserialize back
//! let decoded: Info = from_bytes(&bytes).unwrap();
//! assert_eq!(info, decoded);
//!
//! // Or work with the node tree directly
//! let root = load_from_slice(&bytes).unwrap();
//! assert_eq!(root.get("build"), Some(&Node::Integer(42)));
//! let xml = save_to_string(&root, false).unwrap();
//! assert!(xml.contains("<key>name</key>"));
//! # let _ = Format::Xml;
//! ```

pub mod date;
pub mod de;
pub(crate) mod endian;
pub mod error;
pub mod factory;
pub mod node;
pub mod plist;
pub mod reader;
pub mod ser;
pub mod uid;
pub mod writer;
pub mod xml;

pub use de::{Deserializer, from_bytes, from_node, from_reader, from_xml_str};
pub use error::{Error, Result};
pub use node::{Date, Dictionary, MAX_DEPTH, Node, NodeKind, PlistString};
pub use plist::{Format, load, load_from_slice, save, save_to_string};
pub use reader::Trailer;
pub use ser::{Serializer, to_bytes, to_node, to_writer, to_writer_with_format, to_xml_string};

pub use serde::{Deserialize, Serialize};

/// Private newtype name marking a UID payload (eight big-endian bytes).
pub(crate) const UID_TOKEN: &str = "$__plist_serde_private_Uid";

/// Private newtype name marking a date payload (reference seconds as `f64`).
pub(crate) const DATE_TOKEN: &str = "$__plist_serde_private_Date";
