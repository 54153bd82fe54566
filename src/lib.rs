//! # cycleguard
//!
//! A cycle-safe object graph serializer. It walks the fields of a record, writes leaf values
//! into a flat binary stream and recurses into referenced records. A reference back to an
//! object that is still being written is reported as a [`CycleError`] instead of recursing until
//! the stack overflows.
//!
//! ## Overview
//!
//! Two pieces do the work:
//!
//! *   **Traversal Guard** ([`graph::TraversalGuard`]): the set of objects on the current path,
//!     keyed by identity. Entering an object that is already on the path is a cycle. Leaving
//!     happens through an RAII frame, so the guard is clean after every call, failed or not.
//! *   **Field Serializer** ([`io::RecordWriter`]): enumerates a record's fields through
//!     [`GraphObject::write_fields`], writes leaves directly and enters the guard before each
//!     nested record.
//!
//! ### Identity, not equality
//!
//! Two distinct instances with equal contents are different nodes. A graph that reaches the
//! same node twice through separate branches (a diamond) is valid and is written twice; only
//! reaching an object from inside its own subtree is a cycle.
//!
//! ### Per-call state
//!
//! Each top-level call owns its guard. There is no thread-local or global state, so any number
//! of threads can serialize unrelated graphs at once, see
//! [`SerializeOptions::to_bytes_batch`].
//!
//! ## Usage
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use cycleguard::{CycleGuard, GraphObject};
//!
//! #[derive(GraphObject)]
//! struct Node {
//!     label: String,
//!     next: Option<Rc<RefCell<Node>>>,
//! }
//!
//! let a = Rc::new(RefCell::new(Node { label: "a".into(), next: None }));
//! let b = Rc::new(RefCell::new(Node { label: "b".into(), next: Some(a.clone()) }));
//!
//! // Acyclic: fine.
//! assert!(CycleGuard::to_bytes(&*b.borrow()).is_ok());
//!
//! // Close the loop: a -> b -> a.
//! a.borrow_mut().next = Some(b.clone());
//! let err = CycleGuard::to_bytes(&*a.borrow()).unwrap_err();
//! let cycle = err.as_cycle().unwrap();
//! assert_eq!(cycle.active_path.len(), 2);
//! # a.borrow_mut().next = None;
//! ```
//!
//! ## Limits
//!
//! Recursion depth follows the graph's depth. Very deep acyclic graphs can still exhaust the
//! thread's stack; the guard only rules out unbounded recursion caused by cycles.
//!
//! [`Inspector::from_bytes`] decodes with an explicit stack and accepts every stream the
//! serializer can produce, whatever its depth. For streams from untrusted sources,
//! [`Inspector::from_bytes_with_limit`] rejects values nested deeper than a given bound. The
//! decoded tree's `Display` and `Drop` still recurse once per level, like the serializer.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod api;
pub mod error;
pub mod format;
pub mod graph;
pub mod inspector;
pub mod io;
pub mod visitor;

mod visitor_impls;

pub use api::{CycleGuard, SerializeOptions};
pub use error::{CycleError, Error, Result, TypeError};
pub use format::FieldLabels;
pub use graph::{ObjectId, TraversalGuard};
pub use inspector::Inspector;
pub use visitor::{FieldValue, GraphObject};

pub use cycleguard_derive::GraphObject;

/// Constants used throughout the library.
pub mod constants {
    /// The default buffer capacity for in-memory serialization.
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;
}
