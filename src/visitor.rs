//! Defines the traits that describe how an object graph is walked.
//!
//! [`GraphObject`] is implemented by record types, usually through `#[derive(GraphObject)]`.
//! It enumerates the record's fields in declaration order. [`FieldValue`] is implemented by
//! everything that can sit in a field: leaves, containers, pointers and records.

use crate::error::Result;
use crate::graph::ObjectId;
use crate::io::RecordWriter;

/// A record type whose fields can be written into a byte stream.
///
/// The writer enters each record into the traversal guard before calling
/// [`write_fields`](Self::write_fields), so implementations only describe their fields and
/// never deal with cycle tracking themselves.
///
/// The trait is object safe; `dyn GraphObject` can be stored in untyped reference fields.
pub trait GraphObject {
    /// Name used in the record header and in error reports.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Identity of this instance. Defaults to the value's address.
    ///
    /// Override only when the address is not stable for the lifetime of a traversal, or when
    /// several values stand for the same logical node.
    fn identity(&self) -> ObjectId {
        ObjectId::of(self)
    }

    /// Writes every field, in a stable order, through `writer`.
    fn write_fields(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()>;
}

/// A value that can be written into a record field.
pub trait FieldValue {
    /// Writes this value at the writer's current position.
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()>;
}
