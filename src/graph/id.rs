use std::fmt;

/// A strong type identifying one object instance during a traversal.
///
/// Identity is never structural: two distinct instances with equal field values get
/// different ids. The default key is the value's address paired with its type name, so an
/// inline first field (which shares its parent's address) stays distinct from the parent.
/// Types without a stable address can hand out explicit tokens instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Key);

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Address { addr: usize, ty: &'static str },
    Token(u64),
}

impl ObjectId {
    /// Returns the address identity of `value`.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        let addr = (value as *const T).cast::<()>() as usize;
        Self(Key::Address {
            addr,
            ty: std::any::type_name::<T>(),
        })
    }

    /// Wraps an explicit identity token, e.g. a database row id or an arena index.
    pub const fn from_token(token: u64) -> Self {
        Self(Key::Token(token))
    }

    /// Returns the address for address-keyed ids.
    pub fn address(&self) -> Option<usize> {
        match self.0 {
            Key::Address { addr, .. } => Some(addr),
            Key::Token(_) => None,
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Key::Address { addr, ty } => write!(f, "ObjectId({addr:#x} as {ty})"),
            Key::Token(t) => write!(f, "ObjectId(token {t})"),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Key::Address { addr, .. } => write!(f, "@{addr:#x}"),
            Key::Token(t) => write!(f, "#{t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(PartialEq)]
    struct Point {
        x: i32,
    }

    struct Outer {
        inner: Point,
    }

    #[test]
    fn equal_values_have_distinct_ids() {
        let a = Point { x: 1 };
        let b = Point { x: 1 };
        assert!(a == b);
        assert_ne!(ObjectId::of(&a), ObjectId::of(&b));
        assert_eq!(ObjectId::of(&a), ObjectId::of(&a));
    }

    #[test]
    fn inline_first_field_differs_from_parent() {
        let outer = Outer {
            inner: Point { x: 7 },
        };
        assert_eq!(outer.inner.x, 7);
        assert_eq!(
            ObjectId::of(&outer).address(),
            ObjectId::of(&outer.inner).address()
        );
        assert_ne!(ObjectId::of(&outer), ObjectId::of(&outer.inner));
    }

    #[test]
    fn tokens_compare_by_value() {
        assert_eq!(ObjectId::from_token(9), ObjectId::from_token(9));
        assert_ne!(ObjectId::from_token(9), ObjectId::from_token(10));
        assert_eq!(ObjectId::from_token(9).address(), None);
        assert_eq!(ObjectId::from_token(9).to_string(), "#9");
    }
}
