//! Defines the binary layout of a serialized object graph.
//!
//! # Layout
//! The stream is an optional header followed by a single value, the root record:
//!
//! `[ Header ] [ Root Value ]`
//!
//! ## Value Anatomy
//! Each value starts with a one-byte tag:
//!
//! ```text
//! NULL   0x00
//! LEAF   0x01  len:u32le  bincode payload
//! RECORD 0x02  type:str16  field*  END(0x03)
//! SEQ    0x04  count:u32le  value*
//! MAP    0x05  count:u32le  (key value)*
//! ```
//!
//! A field is a label followed by a value. The label is either `NAME(0x10) str16` or
//! `INDEX(0x11) u16le`, see [`FieldLabels`]. `str16` is a u16le length and UTF-8 bytes.
//!
//! There is no back-reference table: an object reached through two paths is written twice.

use crate::error::{Error, Result};

/// Magic bytes identifying the stream format: "CYG1".
pub const MAGIC_BYTES: [u8; 4] = *b"CYG1";

/// Current stream version.
pub const FORMAT_VERSION: u16 = 1;

/// Magic(4) + Version(2).
pub const HEADER_SIZE: usize = 6;

/// Value tags.
pub mod tag {
    /// Absent reference.
    pub const NULL: u8 = 0x00;
    /// Length-prefixed bincode payload.
    pub const LEAF: u8 = 0x01;
    /// Start of a record.
    pub const RECORD: u8 = 0x02;
    /// End of a record's field list.
    pub const END: u8 = 0x03;
    /// Counted sequence.
    pub const SEQ: u8 = 0x04;
    /// Counted list of key/value pairs.
    pub const MAP: u8 = 0x05;
    /// Field label carrying the field name.
    pub const NAME: u8 = 0x10;
    /// Field label carrying the declaration index.
    pub const INDEX: u8 = 0x11;
}

/// How record fields are labelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldLabels {
    /// Write each field's name.
    #[default]
    Names,
    /// Write each field's position in declaration order. Smaller, but needs the schema to read.
    Indices,
}

/// The stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Always [`MAGIC_BYTES`].
    pub magic: [u8; 4],
    /// Stream version.
    pub version: u16,
}

impl Header {
    /// Creates a header for the current version.
    pub fn new() -> Self {
        Self {
            magic: MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    /// Serializes the header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf
    }

    /// Parses and validates a header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let magic: [u8; 4] = bytes
            .get(0..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| Error::Format("Buffer too small for header".into()))?;
        if magic != MAGIC_BYTES {
            return Err(Error::Format("Invalid magic bytes".into()));
        }
        let version = bytes
            .get(4..6)
            .and_then(|s| s.try_into().ok())
            .map(u16::from_le_bytes)
            .ok_or_else(|| Error::Format("Buffer too small for header".into()))?;
        if version != FORMAT_VERSION {
            return Err(Error::Format(format!("Unsupported version: {version}")));
        }
        Ok(Self { magic, version })
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true if `bytes` starts with the magic bytes.
pub fn has_header(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC_BYTES)
}
