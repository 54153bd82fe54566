// src/inspector.rs

//! Tools for inspecting serialized streams.
//! Useful for debugging record layouts and for verifying output in tests.
//!
//! The inspector decodes the framing only. Leaf payloads stay as raw bincode bytes until
//! [`Value::decode_leaf`] is called with the expected type.

use std::fmt;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::format::{has_header, tag, Header, HEADER_SIZE};

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An absent reference.
    Null,
    /// A bincode payload.
    Leaf(Vec<u8>),
    /// A nested record.
    Record(Record),
    /// A counted sequence.
    Seq(Vec<Value>),
    /// Key/value pairs in written order.
    Map(Vec<(Value, Value)>),
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Type name written by the serializer.
    pub type_name: String,
    /// Fields in written order.
    pub fields: Vec<(FieldLabel, Value)>,
}

/// A decoded field label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLabel {
    /// Label written under [`FieldLabels::Names`](crate::FieldLabels::Names).
    Name(String),
    /// Label written under [`FieldLabels::Indices`](crate::FieldLabels::Indices).
    Index(u16),
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => f.write_str(n),
            Self::Index(i) => write!(f, "#{i}"),
        }
    }
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the record, if this is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the elements, if this is a sequence.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Decodes a leaf payload as `T`.
    pub fn decode_leaf<T: DeserializeOwned>(&self) -> Result<T> {
        let Self::Leaf(bytes) = self else {
            return Err(Error::Format("Value is not a leaf".into()));
        };
        let (value, read) =
            bincode::serde::decode_from_slice::<T, _>(bytes, bincode::config::standard())
                .map_err(|e| Error::Format(e.to_string()))?;
        if read != bytes.len() {
            return Err(Error::Format(format!(
                "Leaf has {} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(value)
    }

    /// Counts records named `type_name` in this subtree, including `self`.
    pub fn count_records(&self, type_name: &str) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(value) = pending.pop() {
            match value {
                Self::Null | Self::Leaf(_) => {}
                Self::Record(r) => {
                    count += usize::from(r.type_name == type_name);
                    pending.extend(r.fields.iter().map(|(_, v)| v));
                }
                Self::Seq(items) => pending.extend(items),
                Self::Map(entries) => {
                    for (k, v) in entries {
                        pending.push(k);
                        pending.push(v);
                    }
                }
            }
        }
        count
    }

    fn fmt_recursive(
        &self,
        f: &mut fmt::Formatter<'_>,
        label: &str,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });

        match self {
            Self::Null => writeln!(f, "{prefix}{connector}{label}null"),
            Self::Leaf(bytes) => writeln!(f, "{prefix}{connector}{label}leaf [{}b]", bytes.len()),
            Self::Record(r) => {
                writeln!(f, "{prefix}{connector}{label}{}", r.type_name)?;
                for (i, (name, value)) in r.fields.iter().enumerate() {
                    let last = i + 1 == r.fields.len();
                    value.fmt_recursive(f, &format!("{name}: "), &child_prefix, last)?;
                }
                Ok(())
            }
            Self::Seq(items) => {
                writeln!(f, "{prefix}{connector}{label}seq ({})", items.len())?;
                for (i, value) in items.iter().enumerate() {
                    let last = i + 1 == items.len();
                    value.fmt_recursive(f, &format!("[{i}] "), &child_prefix, last)?;
                }
                Ok(())
            }
            Self::Map(entries) => {
                writeln!(f, "{prefix}{connector}{label}map ({})", entries.len())?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    let last = i + 1 == entries.len();
                    key.fmt_recursive(f, "key: ", &child_prefix, false)?;
                    value.fmt_recursive(f, "value: ", &child_prefix, last)?;
                }
                Ok(())
            }
        }
    }
}

impl Record {
    /// Returns the first field labelled `name`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find_map(|(label, value)| match label {
            FieldLabel::Name(n) if n == name => Some(value),
            _ => None,
        })
    }

    /// Returns the field at written position `index`.
    pub fn field_at(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, value)| value)
    }
}

/// A decoded stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspector {
    header: Option<Header>,
    root: Value,
    byte_len: u64,
}

impl Inspector {
    /// Decodes a stream held in memory. The header is optional.
    ///
    /// Decoding does not recurse, so any stream the serializer produced is accepted regardless
    /// of its depth. Use [`Inspector::from_bytes_with_limit`] for untrusted input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(bytes, None)
    }

    /// Like [`Inspector::from_bytes`], but fails with [`Error::Format`] once a value is nested
    /// deeper than `max_nesting`. The root value is at depth 0.
    pub fn from_bytes_with_limit(bytes: &[u8], max_nesting: usize) -> Result<Self> {
        Self::decode(bytes, Some(max_nesting))
    }

    fn decode(bytes: &[u8], max_nesting: Option<usize>) -> Result<Self> {
        let (header, body) = if has_header(bytes) {
            (Some(Header::from_bytes(bytes)?), bytes.get(HEADER_SIZE..).unwrap_or_default())
        } else {
            (None, bytes)
        };

        let mut cursor = Cursor { bytes: body, pos: 0 };
        let root = cursor.read_value(max_nesting)?;
        if cursor.pos != body.len() {
            return Err(Error::Format(format!(
                "{} trailing bytes after root value",
                body.len() - cursor.pos
            )));
        }

        Ok(Self {
            header,
            root,
            byte_len: bytes.len() as u64,
        })
    }

    /// Memory-maps a file written by [`CycleGuard::save`](crate::CycleGuard::save) and decodes it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Error::Format("File is empty".into()));
        }

        // Safety: the map is only read while this function runs. A concurrent writer could
        // change the bytes underneath, which surfaces as a Format error at worst.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };

        Self::from_bytes(&mmap)
    }

    /// The stream header, if one was written.
    pub fn header(&self) -> Option<Header> {
        self.header
    }

    /// The root value.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Total stream size in bytes, header included.
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }
}

impl fmt::Display for Inspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CYCLEGUARD STREAM ===")?;
        match self.header {
            Some(h) => writeln!(f, "Version:   {}", h.version)?,
            None => writeln!(f, "Version:   (no header)")?,
        }
        writeln!(f, "Size:      {}b", self.byte_len)?;
        writeln!(f, "\n[RECORDS]")?;
        self.root.fmt_recursive(f, "", "", true)
    }
}

// --- Decoding ---

struct Cursor<'b> {
    bytes: &'b [u8],
    pos: usize,
}

/// What a value tag opened: either a complete value or a container still waiting for children.
enum Head {
    Done(Value),
    Open(Partial),
}

/// A container on the decode stack.
enum Partial {
    Record {
        type_name: String,
        fields: Vec<(FieldLabel, Value)>,
        label: Option<FieldLabel>,
    },
    Seq {
        items: Vec<Value>,
        remaining: usize,
    },
    Map {
        entries: Vec<(Value, Value)>,
        key: Option<Value>,
        remaining: usize,
    },
}

impl Partial {
    fn push(&mut self, value: Value) {
        match self {
            Self::Record { fields, label, .. } => {
                if let Some(label) = label.take() {
                    fields.push((label, value));
                }
            }
            Self::Seq { items, remaining } => {
                items.push(value);
                *remaining -= 1;
            }
            Self::Map {
                entries,
                key,
                remaining,
            } => match key.take() {
                None => *key = Some(value),
                Some(k) => {
                    entries.push((k, value));
                    *remaining -= 1;
                }
            },
        }
    }

    fn finish(self) -> Value {
        match self {
            Self::Record {
                type_name, fields, ..
            } => Value::Record(Record { type_name, fields }),
            Self::Seq { items, .. } => Value::Seq(items),
            Self::Map { entries, .. } => Value::Map(entries),
        }
    }
}

impl<'b> Cursor<'b> {
    fn take(&mut self, n: usize) -> Result<&'b [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        let slice = end
            .and_then(|end| self.bytes.get(self.pos..end))
            .ok_or_else(|| Error::Format(format!("Unexpected end of stream at byte {}", self.pos)))?;
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_str16(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Format(e.to_string()))
    }

    /// Decodes one value with an explicit stack, so input depth never touches the call stack.
    fn read_value(&mut self, max_nesting: Option<usize>) -> Result<Value> {
        let mut stack: Vec<Partial> = Vec::new();
        loop {
            if let Some(limit) = max_nesting.filter(|limit| stack.len() > *limit) {
                return Err(Error::Format(format!("Nesting deeper than {limit}")));
            }

            let mut finished = match self.read_head()? {
                Head::Done(value) => Some(value),
                Head::Open(partial) => {
                    stack.push(partial);
                    None
                }
            };

            // Hand finished values to their parents until a container wants another child.
            loop {
                let Some(top) = stack.last_mut() else {
                    return finished.ok_or_else(|| Error::Format("Empty stream".into()));
                };
                if let Some(value) = finished.take() {
                    top.push(value);
                }
                if self.expects_child(top)? {
                    break;
                }
                finished = stack.pop().map(Partial::finish);
            }
        }
    }

    fn read_head(&mut self) -> Result<Head> {
        let at = self.pos;
        let head = match self.read_u8()? {
            tag::NULL => Head::Done(Value::Null),
            tag::LEAF => {
                let len = self.read_u32()? as usize;
                Head::Done(Value::Leaf(self.take(len)?.to_vec()))
            }
            tag::RECORD => Head::Open(Partial::Record {
                type_name: self.read_str16()?,
                fields: Vec::new(),
                label: None,
            }),
            tag::SEQ => {
                let count = self.read_u32()? as usize;
                Head::Open(Partial::Seq {
                    items: Vec::with_capacity(count.min(1024)),
                    remaining: count,
                })
            }
            tag::MAP => {
                let count = self.read_u32()? as usize;
                Head::Open(Partial::Map {
                    entries: Vec::with_capacity(count.min(1024)),
                    key: None,
                    remaining: count,
                })
            }
            other => {
                return Err(Error::Format(format!("Invalid value tag {other:#04x} at byte {at}")))
            }
        };
        Ok(head)
    }

    /// Returns true if `partial` needs another child. Records consume their next field label
    /// or END here.
    fn expects_child(&mut self, partial: &mut Partial) -> Result<bool> {
        match partial {
            Partial::Record {
                type_name, label, ..
            } => {
                let next = match self.read_u8()? {
                    tag::END => return Ok(false),
                    tag::NAME => FieldLabel::Name(self.read_str16()?),
                    tag::INDEX => FieldLabel::Index(self.read_u16()?),
                    other => {
                        return Err(Error::Format(format!(
                            "Invalid field label tag {other:#04x} in `{type_name}`"
                        )))
                    }
                };
                *label = Some(next);
                Ok(true)
            }
            Partial::Seq { remaining, .. } | Partial::Map { remaining, .. } => Ok(*remaining > 0),
        }
    }
}
