//! `FieldValue` implementations for standard Rust types.
//!
//! # Dispatch
//! 1. **Leaves** (numbers, `bool`, `char`, strings) are written as bincode payloads.
//! 2. **Containers** (`Option`, `Vec`, slices, arrays, `VecDeque`, `BTreeMap`) write their
//!    own framing and recurse into the elements.
//! 3. **Pointers and cells** (`Box`, `Rc`, `Arc`, `&T`, `Weak`, `RefCell`, `Cell`, `OnceCell`,
//!    `OnceLock`) are transparent: they write whatever they point at. A dead `Weak` or an
//!    unset once-cell is written as null.
//! 4. **Records** reach the guard through `dyn GraphObject` or the derived impl, both of which
//!    call [`RecordWriter::write_object`].
//!
//! Unordered std collections are deliberately missing: field order must be deterministic.
//! `Mutex` and `RwLock` are missing too, since re-locking on a cycle would deadlock before the
//! guard could report it. Use `OnceLock` to build shareable cyclic graphs.

use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{self, Rc};
use std::sync::{self, Arc, OnceLock};

use crate::error::{Result, TypeError};
use crate::io::RecordWriter;
use crate::visitor::{FieldValue, GraphObject};

// --- Leaves ---

macro_rules! leaf_impl {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
                    writer.write_leaf(self)
                }
            }
        )*
    };
}

leaf_impl!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, str,
    String,
);

// --- Containers ---

impl<T: FieldValue> FieldValue for Option<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        match self {
            Some(value) => value.write_value(writer),
            None => writer.write_null(),
        }
    }
}

impl<T: FieldValue> FieldValue for [T] {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        writer.write_seq(self)
    }
}

impl<T: FieldValue, const N: usize> FieldValue for [T; N] {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        writer.write_seq(self)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        writer.write_seq(self)
    }
}

impl<T: FieldValue> FieldValue for VecDeque<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        writer.write_seq(self)
    }
}

impl<K: FieldValue, V: FieldValue> FieldValue for BTreeMap<K, V> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        writer.write_map(self)
    }
}

// --- Pointers ---

macro_rules! deref_impl {
    ($($ptr:ident),*) => {
        $(
            impl<T: FieldValue + ?Sized> FieldValue for $ptr<T> {
                fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
                    (**self).write_value(writer)
                }
            }
        )*
    };
}

deref_impl!(Box, Rc, Arc);

impl<T: FieldValue + ?Sized> FieldValue for &T {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        (**self).write_value(writer)
    }
}

impl<T: FieldValue + ?Sized> FieldValue for rc::Weak<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        match self.upgrade() {
            Some(strong) => strong.write_value(writer),
            None => writer.write_null(),
        }
    }
}

impl<T: FieldValue + ?Sized> FieldValue for sync::Weak<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        match self.upgrade() {
            Some(strong) => strong.write_value(writer),
            None => writer.write_null(),
        }
    }
}

// --- Cells ---

impl<T: FieldValue + ?Sized> FieldValue for RefCell<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        let value = self.try_borrow().map_err(|_| {
            TypeError::new(
                std::any::type_name::<Self>(),
                "value is mutably borrowed and cannot be read",
            )
        })?;
        value.write_value(writer)
    }
}

impl<T: FieldValue + Copy> FieldValue for Cell<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        self.get().write_value(writer)
    }
}

impl<T: FieldValue> FieldValue for OnceCell<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        self.get().write_value(writer)
    }
}

impl<T: FieldValue> FieldValue for OnceLock<T> {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        self.get().write_value(writer)
    }
}

// --- Records ---

impl FieldValue for dyn GraphObject {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        writer.write_object(self)
    }
}

impl FieldValue for dyn GraphObject + Send + Sync {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        writer.write_object(self)
    }
}

// --- Untyped values ---

/// Writes a `dyn Any` by downcasting to the known leaf types.
fn write_any(value: &dyn Any, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
    macro_rules! try_leaves {
        ($($ty:ty),*) => {
            $(
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return writer.write_leaf(v);
                }
            )*
        };
    }

    try_leaves!(
        bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
        String, &'static str
    );
    let reason = format!(
        "{:?} in field `{}` is not a known leaf type",
        value.type_id(),
        writer.field_path().join(".")
    );
    Err(TypeError::new("dyn Any", reason).into())
}

impl FieldValue for dyn Any {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        write_any(self, writer)
    }
}

impl FieldValue for dyn Any + Send + Sync {
    fn write_value(&self, writer: &mut RecordWriter<'_, '_>) -> Result<()> {
        write_any(self, writer)
    }
}
