//! The high-level entry points.
//!
//! [`CycleGuard`] offers one-call serialization with default options. [`SerializeOptions`]
//! (from [`CycleGuard::builder`]) configures the header and the field label policy, and exposes
//! guard reuse and parallel batches.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;

use crate::constants::DEFAULT_BUFFER_SIZE;
use crate::error::Result;
use crate::format::{FieldLabels, Header};
use crate::graph::TraversalGuard;
use crate::io::{CountingWriter, RecordWriter};
use crate::visitor::GraphObject;

/// The main entry point for serializing object graphs.
#[derive(Debug)]
pub struct CycleGuard;

impl CycleGuard {
    /// Serializes `root` into a new byte vector.
    ///
    /// Each call uses a fresh [`TraversalGuard`], so calls from different threads never see
    /// each other's state.
    pub fn to_bytes<T: GraphObject + ?Sized>(root: &T) -> Result<Vec<u8>> {
        SerializeOptions::default().to_bytes(root)
    }

    /// Serializes `root` into `writer`. Returns the number of bytes written.
    pub fn write<T, W>(writer: &mut W, root: &T) -> Result<u64>
    where
        T: GraphObject + ?Sized,
        W: Write,
    {
        SerializeOptions::default().write(writer, root)
    }

    /// Serializes `root` into a file, truncating it.
    pub fn save<T, P>(path: P, root: &T) -> Result<()>
    where
        T: GraphObject + ?Sized,
        P: AsRef<Path>,
    {
        SerializeOptions::default().save(path, root)
    }

    /// Returns a configuration builder.
    pub fn builder() -> SerializeOptions {
        SerializeOptions::default()
    }
}

/// Serialization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    header: bool,
    labels: FieldLabels,
    capacity: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            header: true,
            labels: FieldLabels::Names,
            capacity: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl SerializeOptions {
    /// Emit the `CYG1` stream header (default: on).
    pub fn header(mut self, enable: bool) -> Self {
        self.header = enable;
        self
    }

    /// Label fields by name or by declaration index (default: names).
    pub fn labels(mut self, labels: FieldLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Initial capacity of the buffer used by [`to_bytes`](Self::to_bytes).
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Serializes `root` into a new byte vector.
    pub fn to_bytes<T: GraphObject + ?Sized>(&self, root: &T) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.capacity);
        self.write(&mut buffer, root)?;
        Ok(buffer)
    }

    /// Serializes `root` into `writer` with a fresh guard. Returns the number of bytes written.
    pub fn write<T, W>(&self, writer: &mut W, root: &T) -> Result<u64>
    where
        T: GraphObject + ?Sized,
        W: Write,
    {
        let mut guard = TraversalGuard::new();
        self.write_with_guard(&mut guard, writer, root)
    }

    /// Serializes `root` using a caller-owned guard.
    ///
    /// The guard is empty again when this returns, on success and on failure alike, so it can be
    /// reused for the next call.
    pub fn write_with_guard<T, W>(
        &self,
        guard: &mut TraversalGuard,
        writer: &mut W,
        root: &T,
    ) -> Result<u64>
    where
        T: GraphObject + ?Sized,
        W: Write,
    {
        log::trace!("serializing graph rooted at `{}`", root.type_name());

        let mut out = CountingWriter::new(writer);
        if self.header {
            out.write_all(&Header::new().to_bytes())?;
        }

        let mut records = RecordWriter::new(&mut out, guard, self.labels);
        if let Err(e) = records.write_object(root) {
            log::trace!("serialization of `{}` aborted: {e}", root.type_name());
            return Err(e);
        }
        out.flush()?;

        let written = out.current_offset();
        log::trace!("serialized `{}` into {written} bytes", root.type_name());
        Ok(written)
    }

    /// Serializes `root` into a file, truncating it.
    pub fn save<T, P>(&self, path: P, root: &T) -> Result<()>
    where
        T: GraphObject + ?Sized,
        P: AsRef<Path>,
    {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer, root)?;
        writer.flush()?;
        Ok(())
    }

    /// Serializes unrelated roots in parallel on the rayon pool.
    ///
    /// Every root gets its own guard, so a cycle in one graph never affects another. Results come
    /// back in input order.
    pub fn to_bytes_batch<T>(&self, roots: &[&T]) -> Vec<Result<Vec<u8>>>
    where
        T: GraphObject + Sync + ?Sized,
    {
        roots.par_iter().map(|root| self.to_bytes(*root)).collect()
    }
}
