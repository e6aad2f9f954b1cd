use serde::{de, ser};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing or (de)serializing a plist.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The input is not a well-formed plist, or the writer reached a state
    /// the binary format cannot express
    Format(String),

    /// A custom error message from serde
    Message(String),

    /// The plist data model has no representation for this serde type
    Unsupported(&'static str),

    /// The underlying stream failed for a reason other than running short
    Io(String),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Whether this is a malformed-document error.
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "invalid plist: {}", msg),
            Error::Message(msg) => write!(f, "{}", msg),
            Error::Unsupported(t) => write!(f, "plist does not support {}", t),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}
