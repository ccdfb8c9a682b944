//! Identity wrapper for side tables keyed by syntax tree nodes.
//!
//! Two structurally equal expressions at different places in the tree are
//! different keys, which is what per-node analysis results need.
use std::hash::Hasher;

#[derive(Debug)]
pub struct RefEq<T>(pub T);

impl<'a, T> Clone for RefEq<&'a T> {
    fn clone(&self) -> Self {
        RefEq(self.0)
    }
}

impl<'a, T> Copy for RefEq<&'a T> {}

impl<'a, T> std::hash::Hash for RefEq<&'a T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        (self.0 as *const T).hash(state)
    }
}

impl<'b, T> PartialEq<RefEq<&'b T>> for RefEq<&'b T> {
    fn eq(&self, other: &'_ RefEq<&'b T>) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<'a, T> Eq for RefEq<&'a T> {}
