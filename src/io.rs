//! Low-level writing: the byte sink and the per-record field writer.
//!
//! [`CountingWriter`] wraps the caller's sink and tracks how many bytes went through it.
//! [`RecordWriter`] is handed to [`GraphObject::write_fields`] and turns field values into
//! tagged bytes, descending into referenced records through the traversal guard.

use std::io::Write;

use serde::Serialize;

use crate::error::{Result, TypeError};
use crate::format::{tag, FieldLabels};
use crate::graph::TraversalGuard;
use crate::visitor::{FieldValue, GraphObject};

/// A sink wrapper that tracks the current offset.
pub struct CountingWriter<'w> {
    inner: &'w mut dyn Write,
    current_offset: u64,
    /// Reused buffer for leaf payloads, which are length-prefixed.
    scratch: Vec<u8>,
}

impl<'w> CountingWriter<'w> {
    /// Wraps a sink. The offset starts at 0 regardless of what the sink already holds.
    pub fn new(inner: &'w mut dyn Write) -> Self {
        Self {
            inner,
            current_offset: 0,
            scratch: Vec::new(),
        }
    }

    /// Writes a complete buffer. Returns the offset where the write started.
    pub fn write_all(&mut self, buffer: &[u8]) -> Result<u64> {
        let start_offset = self.current_offset;
        self.inner.write_all(buffer)?;
        self.current_offset += buffer.len() as u64;
        Ok(start_offset)
    }

    /// Flushes the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Returns the number of bytes written so far.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Writes a u16-length-prefixed UTF-8 string.
    fn write_str16(&mut self, s: &str) -> Result<()> {
        let len = u16::try_from(s.len())
            .map_err(|_| TypeError::new("str", "label longer than 65535 bytes"))?;
        self.write_all(&len.to_le_bytes())?;
        self.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Encodes `value` with bincode and writes it as a LEAF.
    fn write_leaf<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.scratch.clear();
        bincode::serde::encode_into_std_write(value, &mut self.scratch, bincode::config::standard())
            .map_err(|e| TypeError::new(std::any::type_name::<T>(), e.to_string()))?;
        let len = u32::try_from(self.scratch.len()).map_err(|_| {
            TypeError::new(std::any::type_name::<T>(), "encoded value larger than 4 GiB")
        })?;

        let start_offset = self.current_offset;
        self.inner.write_all(&[tag::LEAF])?;
        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(&self.scratch)?;
        self.current_offset = start_offset + 5 + u64::from(len);
        Ok(())
    }
}

impl std::fmt::Debug for CountingWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingWriter")
            .field("current_offset", &self.current_offset)
            .finish_non_exhaustive()
    }
}

/// Writes the fields of one record.
///
/// Each nested record gets its own `RecordWriter`, borrowing the same sink and the guard frame
/// of its parent. The frame is released when the nested record finishes, whether it succeeded
/// or not.
#[derive(Debug)]
pub struct RecordWriter<'a, 'w> {
    out: &'a mut CountingWriter<'w>,
    guard: &'a mut TraversalGuard,
    labels: FieldLabels,
    /// Field currently being written; becomes the `via` of records entered below it.
    field: Option<&'static str>,
    next_index: u16,
}

impl<'a, 'w> RecordWriter<'a, 'w> {
    pub(crate) fn new(
        out: &'a mut CountingWriter<'w>,
        guard: &'a mut TraversalGuard,
        labels: FieldLabels,
    ) -> Self {
        Self {
            out,
            guard,
            labels,
            field: None,
            next_index: 0,
        }
    }

    /// Writes a labelled field.
    pub fn field<V: FieldValue + ?Sized>(&mut self, name: &'static str, value: &V) -> Result<()> {
        self.write_label(name)?;
        self.field = Some(name);
        value.write_value(self)
    }

    /// Writes a labelled field as a single leaf through its `serde::Serialize` impl.
    ///
    /// A value whose `Serialize` impl fails, or that bincode cannot express, yields
    /// [`Error::Type`](crate::Error::Type).
    pub fn serde_field<T: Serialize + ?Sized>(&mut self, name: &'static str, value: &T) -> Result<()> {
        self.write_label(name)?;
        self.field = Some(name);
        self.write_leaf(value)
    }

    /// Writes a leaf value.
    pub fn write_leaf<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.out.write_leaf(value)
    }

    /// Writes the null marker. Absent references never touch the guard.
    pub fn write_null(&mut self) -> Result<()> {
        self.out.write_all(&[tag::NULL])?;
        Ok(())
    }

    /// Enters `object` into the guard and writes it as a nested record.
    ///
    /// Fails with [`Error::Cycle`](crate::Error::Cycle) if `object` is already being written
    /// further up the current path.
    pub fn write_object<O: GraphObject + ?Sized>(&mut self, object: &O) -> Result<()> {
        let type_name = object.type_name();
        let mut frame = self.guard.scope(object.identity(), type_name, self.field)?;

        self.out.write_all(&[tag::RECORD])?;
        self.out.write_str16(type_name)?;
        {
            let mut nested = RecordWriter::new(&mut *self.out, &mut frame, self.labels);
            object.write_fields(&mut nested)?;
        }
        self.out.write_all(&[tag::END])?;
        Ok(())
    }

    /// Writes a counted sequence. Elements inherit the current field for error reports.
    pub fn write_seq<'v, V, I>(&mut self, items: I) -> Result<()>
    where
        V: FieldValue + 'v,
        I: IntoIterator<Item = &'v V>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        self.write_count(tag::SEQ, items.len())?;
        for item in items {
            item.write_value(self)?;
        }
        Ok(())
    }

    /// Writes a counted list of key/value pairs in iteration order.
    pub fn write_map<'v, K, V, I>(&mut self, entries: I) -> Result<()>
    where
        K: FieldValue + 'v,
        V: FieldValue + 'v,
        I: IntoIterator<Item = (&'v K, &'v V)>,
        I::IntoIter: ExactSizeIterator,
    {
        let entries = entries.into_iter();
        self.write_count(tag::MAP, entries.len())?;
        for (key, value) in entries {
            key.write_value(self)?;
            value.write_value(self)?;
        }
        Ok(())
    }

    /// The guard for this traversal.
    pub fn guard(&self) -> &TraversalGuard {
        self.guard
    }

    /// Field names from the root down to the field being written.
    pub fn field_path(&self) -> Vec<&'static str> {
        self.guard.field_path().into_iter().chain(self.field).collect()
    }

    /// Bytes written to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.out.current_offset()
    }

    /// The label policy in effect.
    pub fn labels(&self) -> FieldLabels {
        self.labels
    }

    fn write_label(&mut self, name: &'static str) -> Result<()> {
        match self.labels {
            FieldLabels::Names => {
                self.out.write_all(&[tag::NAME])?;
                self.out.write_str16(name)?;
            }
            FieldLabels::Indices => {
                self.out.write_all(&[tag::INDEX])?;
                self.out.write_all(&self.next_index.to_le_bytes())?;
            }
        }
        self.next_index = self.next_index.wrapping_add(1);
        Ok(())
    }

    fn write_count(&mut self, marker: u8, len: usize) -> Result<()> {
        let count = u32::try_from(len)
            .map_err(|_| TypeError::new("collection", "more than u32::MAX elements"))?;
        self.out.write_all(&[marker])?;
        self.out.write_all(&count.to_le_bytes())?;
        Ok(())
    }
}
