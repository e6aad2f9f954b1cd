//! Serde helper module for plist dates.
//!
//! `chrono::DateTime<Utc>` serializes as an RFC 3339 string by default,
//! which would become a plist string. Annotate the field with
//! `#[serde(with = "plist_serde::date")]` to store a date node instead:
//!
//! ```rust
//! use chrono::{DateTime, TimeZone, Utc};
//! use serde::{Deserialize, Serialize};
//! use plist_serde::{NodeKind, from_bytes, to_bytes, to_node};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Backup {
//!     #[serde(with = "plist_serde::date")]
//!     taken: DateTime<Utc>,
//! }
//!
//! let backup = Backup { taken: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() };
//! let node = to_node(&backup).unwrap();
//! assert_eq!(node.get("taken").map(|n| n.kind()), Some(NodeKind::Date));
//!
//! let decoded: Backup = from_bytes(&to_bytes(&backup).unwrap()).unwrap();
//! assert_eq!(backup, decoded);
//! ```
//!
//! [`Date`] itself implements `Serialize` and `Deserialize` the same way.

use crate::DATE_TOKEN;
use crate::node::Date;
use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use std::fmt;

// ── serde `with` module functions ─────────────────────────────────────────

/// Serialize `value` as a plist date.
pub fn serialize<S: serde::Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serde::Serialize::serialize(&Date::from(*value), serializer)
}

/// Deserialize a plist date, or an RFC 3339 string.
pub fn deserialize<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let date: Date = serde::Deserialize::deserialize(deserializer)?;
    date.to_datetime()
        .ok_or_else(|| de::Error::custom(format!("date {} s is out of range", date.reference_seconds())))
}

// ── Date ───────────────────────────────────────────────────────────────────

impl serde::Serialize for Date {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(DATE_TOKEN, &self.reference_seconds())
    }
}

impl<'de> serde::Deserialize<'de> for Date {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        deserializer.deserialize_newtype_struct(DATE_TOKEN, DateVisitor)
    }
}

/// Accepts reference seconds, or an RFC 3339 string.
struct DateVisitor;

impl<'de> Visitor<'de> for DateVisitor {
    type Value = Date;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a plist date")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Date, E> {
        Ok(Date::from_reference_seconds(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Date, E> {
        Ok(Date::from_reference_seconds(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Date, E> {
        Ok(Date::from_reference_seconds(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Date, E> {
        let parsed = DateTime::parse_from_rfc3339(v)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))?;
        Ok(Date::from(parsed.with_timezone(&Utc)))
    }

    fn visit_newtype_struct<D: serde::Deserializer<'de>>(self, de: D) -> Result<Date, D::Error> {
        de.deserialize_any(self)
    }
}
