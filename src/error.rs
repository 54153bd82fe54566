//! Centralized error handling for cycleguard.
//!
//! Every fallible operation in the crate returns [`Result`]. The library never panics on
//! bad input: a cyclic graph, an unencodable field or a failing sink all surface as an
//! [`Error`] value.
//!
//! ## Error Categories
//!
//! - **Cycle** ([`Error::Cycle`]): a reference back to an object that is still being written.
//! - **Type** ([`Error::Type`]): a field value has no known encoding.
//! - **I/O** ([`Error::Io`]): the caller-provided sink or file failed.
//! - **Format** ([`Error::Format`]): the [`Inspector`](crate::inspector::Inspector) was handed
//!   bytes that are not a valid stream.
//!
//! Traversal itself only ever produces `Cycle` or `Type`. Both unwind the whole call; there is
//! no partial output contract.
//!
//! ## Usage Patterns
//!
//! ```rust
//! use cycleguard::{CycleGuard, Error, GraphObject};
//!
//! #[derive(GraphObject)]
//! struct Config { retries: u32 }
//!
//! match CycleGuard::to_bytes(&Config { retries: 3 }) {
//!     Ok(bytes) => println!("{} bytes", bytes.len()),
//!     Err(Error::Cycle(cycle)) => eprintln!("fix the data: {cycle}"),
//!     Err(e) => eprintln!("other error: {e}"),
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::graph::ObjectId;

/// A specialized `Result` type for cycleguard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The master error enum covering all failure domains.
///
/// This type is `Clone` so a batch of results can be shared or stored. I/O errors are wrapped
/// in `Arc` for that reason.
#[derive(Debug, Clone)]
pub enum Error {
    /// A self-reachable reference was detected.
    ///
    /// Always fatal to the enclosing serialize call and never retried. Break the cycle in the
    /// data (for example with a `Weak` that is skipped, or an explicit id field) and call again.
    Cycle(CycleError),

    /// A field value has no known encoding.
    Type(TypeError),

    /// The output sink or file failed.
    ///
    /// Only raised by sinks supplied by the caller. An in-memory `Vec<u8>` never fails.
    Io(Arc<io::Error>),

    /// The inspected byte stream is truncated or malformed.
    Format(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle(e) => write!(f, "Cycle Error: {e}"),
            Self::Type(e) => write!(f, "Type Error: {e}"),
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Format(s) => write!(f, "Format Error: {s}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cycle(e) => Some(e),
            Self::Type(e) => Some(e),
            Self::Io(e) => Some(e.as_ref()),
            Self::Format(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<CycleError> for Error {
    fn from(err: CycleError) -> Self {
        Self::Cycle(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Self::Type(err)
    }
}

impl Error {
    /// Returns the cycle details if this is a [`Error::Cycle`].
    pub fn as_cycle(&self) -> Option<&CycleError> {
        match self {
            Self::Cycle(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the type details if this is a [`Error::Type`].
    pub fn as_type(&self) -> Option<&TypeError> {
        match self {
            Self::Type(e) => Some(e),
            _ => None,
        }
    }
}

/// A reference cycle found while writing an object graph.
///
/// Carries enough context to locate the loop in the data without a debugger: the type of the
/// object that was reached a second time and the ordered list of types on the active path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// Type of the object that is already on the active path.
    pub offending_type: &'static str,
    /// Identity of that object.
    pub offending_id: ObjectId,
    /// Types currently being written, root first. Does not repeat the offending entry.
    pub active_path: Vec<&'static str>,
    /// Field names walked from the root, ending with the field that closed the loop.
    pub field_path: Vec<&'static str>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "circular reference found while serializing instance of `{}`; types on the active path: [{}]",
            self.offending_type,
            self.active_path.join(", ")
        )?;
        if !self.field_path.is_empty() {
            write!(f, " (via {})", self.field_path.join("."))?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleError {}

/// A field value with no known encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    /// Name of the type that could not be written.
    pub unsupported_type: &'static str,
    /// Why the encoder rejected it.
    pub reason: String,
}

impl TypeError {
    /// Creates a new `TypeError`.
    pub fn new(unsupported_type: &'static str, reason: impl Into<String>) -> Self {
        Self {
            unsupported_type,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no encoding for `{}`: {}", self.unsupported_type, self.reason)
    }
}

impl std::error::Error for TypeError {}
