use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use super::id::ObjectId;
use crate::error::CycleError;

/// One entry on the active path.
#[derive(Debug, Clone, Copy)]
struct Frame {
    id: ObjectId,
    type_name: &'static str,
    /// Field of the parent record through which this object was reached.
    via: Option<&'static str>,
}

/// Tracks which objects are currently being written.
///
/// An id is active from the moment its frame is entered until that frame is left. Entries are
/// pushed and popped in LIFO order matching the recursion. Re-entering an active id is a
/// cycle; reaching the same object again after it was left (a diamond) is not.
///
/// A guard belongs to one traversal at a time. Concurrent serializations each own their own
/// guard, so there is no shared state to lock.
#[derive(Debug, Default)]
pub struct TraversalGuard {
    path: Vec<Frame>,
    active: HashSet<ObjectId>,
}

impl TraversalGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` as active.
    ///
    /// Fails if `id` is already on the active path. The error lists the path types root first.
    pub fn enter(
        &mut self,
        id: ObjectId,
        type_name: &'static str,
        via: Option<&'static str>,
    ) -> Result<(), CycleError> {
        if self.active.contains(&id) {
            let err = CycleError {
                offending_type: type_name,
                offending_id: id,
                active_path: self.path_types(),
                field_path: self.field_path().into_iter().chain(via).collect(),
            };
            log::debug!("cycle detected at {id}: {err}");
            return Err(err);
        }
        self.active.insert(id);
        self.path.push(Frame { id, type_name, via });
        Ok(())
    }

    /// Removes `id` from the active path. Returns false if it was not active.
    pub fn leave(&mut self, id: &ObjectId) -> bool {
        if !self.active.remove(id) {
            return false;
        }
        match self.path.last() {
            Some(top) if top.id == *id => {
                self.path.pop();
            }
            // Out-of-order release; only reachable through manual enter/leave.
            _ => self.path.retain(|f| f.id != *id),
        }
        true
    }

    /// Enters `id` and returns a frame that leaves it again when dropped.
    ///
    /// The frame derefs to the guard, so nested objects are entered through it. Release happens
    /// on every exit path, including `?` and unwinding.
    pub fn scope(
        &mut self,
        id: ObjectId,
        type_name: &'static str,
        via: Option<&'static str>,
    ) -> Result<ActiveFrame<'_>, CycleError> {
        self.enter(id, type_name, via)?;
        Ok(ActiveFrame { guard: self, id })
    }

    /// Returns true if `id` is on the active path.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.active.contains(id)
    }

    /// Returns true if no object is being written.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Returns the number of active frames.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Returns the types on the active path, root first.
    pub fn path_types(&self) -> Vec<&'static str> {
        self.path.iter().map(|f| f.type_name).collect()
    }

    /// Returns the fields through which the active records were reached, root first.
    pub fn field_path(&self) -> Vec<&'static str> {
        self.path.iter().filter_map(|f| f.via).collect()
    }
}

/// RAII handle for an entered object. Leaves the guard on drop.
#[derive(Debug)]
pub struct ActiveFrame<'g> {
    guard: &'g mut TraversalGuard,
    id: ObjectId,
}

impl ActiveFrame<'_> {
    /// The id this frame holds.
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl Deref for ActiveFrame<'_> {
    type Target = TraversalGuard;

    fn deref(&self) -> &Self::Target {
        self.guard
    }
}

impl DerefMut for ActiveFrame<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard
    }
}

impl Drop for ActiveFrame<'_> {
    fn drop(&mut self) {
        self.guard.leave(&self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const A: ObjectId = ObjectId::from_token(1);
    const B: ObjectId = ObjectId::from_token(2);
    const C: ObjectId = ObjectId::from_token(3);

    #[test]
    fn reentering_active_id_is_a_cycle() {
        let mut guard = TraversalGuard::new();
        guard.enter(A, "A", None).unwrap();
        guard.enter(B, "B", Some("next")).unwrap();

        let err = guard.enter(A, "A", Some("back")).unwrap_err();
        assert_eq!(err.offending_type, "A");
        assert_eq!(err.offending_id, A);
        assert_eq!(err.active_path, vec!["A", "B"]);
        assert_eq!(err.field_path, vec!["next", "back"]);

        // The failed enter leaves the path untouched.
        assert_eq!(guard.depth(), 2);
    }

    #[test]
    fn reentering_after_leave_is_allowed() {
        let mut guard = TraversalGuard::new();
        guard.enter(A, "A", None).unwrap();
        guard.enter(C, "C", Some("left")).unwrap();
        assert!(guard.leave(&C));
        guard.enter(B, "B", Some("right")).unwrap();
        guard.enter(C, "C", Some("shared")).unwrap();
        assert_eq!(guard.path_types(), vec!["A", "B", "C"]);
        assert_eq!(guard.field_path(), vec!["right", "shared"]);
    }

    #[test]
    fn leave_unknown_id_is_a_noop() {
        let mut guard = TraversalGuard::new();
        assert!(!guard.leave(&A));
        guard.enter(A, "A", None).unwrap();
        guard.enter(B, "B", None).unwrap();
        assert!(guard.leave(&A));
        assert!(!guard.contains(&A));
        assert_eq!(guard.path_types(), vec!["B"]);
    }

    #[test]
    fn scope_releases_on_error_paths() {
        fn walk(guard: &mut TraversalGuard) -> Result<(), CycleError> {
            let mut outer = guard.scope(A, "A", None)?;
            let mut inner = outer.scope(B, "B", Some("child"))?;
            inner.scope(A, "A", Some("parent"))?;
            Ok(())
        }

        let mut guard = TraversalGuard::new();
        let err = walk(&mut guard).unwrap_err();
        assert_eq!(err.active_path, vec!["A", "B"]);
        assert!(guard.is_empty());
        assert!(!guard.contains(&A));
        assert!(!guard.contains(&B));
    }

    #[test]
    fn scope_tracks_depth() {
        let mut guard = TraversalGuard::new();
        {
            let mut frame = guard.scope(A, "A", None).unwrap();
            assert_eq!(frame.id(), A);
            assert_eq!(frame.depth(), 1);
            let nested = frame.scope(B, "B", None).unwrap();
            assert_eq!(nested.depth(), 2);
        }
        assert_eq!(guard.depth(), 0);
    }
}
