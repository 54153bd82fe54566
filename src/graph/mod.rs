//! Identity and cycle tracking for a single traversal.
//!
//! [`TraversalGuard`] holds the active path of the current serialize call. It is created per
//! call (or handed in by the caller) and never shared between threads.

/// Defines the `TraversalGuard` and `ActiveFrame` structures.
pub mod guard;
/// Defines the `ObjectId` type.
pub mod id;

pub use guard::{ActiveFrame, TraversalGuard};
pub use id::ObjectId;
