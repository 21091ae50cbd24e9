//! Container-aware member lookup.
//!
//! A tracker's membership queries go through [`Find`], which resolves to the
//! container's native search when it has one (`BTreeSet`) and falls back to a
//! linear scan otherwise (`Vec`). Which strategy applies is a property of the
//! container type, fixed at compile time; there is no per-call branch.

use std::collections::BTreeSet;

/// Locate a member equal to a key inside a container.
///
/// Containers with an ordered or hashed native search advertise it through
/// [`Find::NATIVE`]; sequences report `false` and scan.
pub trait Find {
    /// Element type held by the container.
    type Member;

    /// Whether `find_member` resolves through a container-native search
    /// instead of a linear scan.
    const NATIVE: bool;

    /// First member equal to `key`, if any.
    fn find_member(&self, key: &Self::Member) -> Option<&Self::Member>;
}

impl<T: PartialEq> Find for Vec<T> {
    type Member = T;

    const NATIVE: bool = false;

    fn find_member(&self, key: &T) -> Option<&T> {
        self.iter().find(|member| *member == key)
    }
}

impl<T: Ord> Find for BTreeSet<T> {
    type Member = T;

    const NATIVE: bool = true;

    fn find_member(&self, key: &T) -> Option<&T> {
        self.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_scans_linearly() {
        let v = vec![3, 1, 4, 1, 5];
        assert_eq!(v.find_member(&1), Some(&1));
        assert_eq!(v.find_member(&9), None);
        assert!(!<Vec<i32> as Find>::NATIVE);
    }

    #[test]
    fn vec_returns_first_equal_member() {
        let v = vec![(1, 'a'), (2, 'b')];
        // Equality is whole-element; the scan stops at the first hit.
        assert_eq!(v.find_member(&(2, 'b')), Some(&(2, 'b')));
    }

    #[test]
    fn btreeset_uses_native_search() {
        let s: BTreeSet<i32> = [3, 1, 4].into_iter().collect();
        assert_eq!(s.find_member(&4), Some(&4));
        assert_eq!(s.find_member(&2), None);
        assert!(<BTreeSet<i32> as Find>::NATIVE);
    }

    #[test]
    fn empty_containers_find_nothing() {
        let v: Vec<u8> = Vec::new();
        let s: BTreeSet<u8> = BTreeSet::new();
        assert_eq!(v.find_member(&0), None);
        assert_eq!(s.find_member(&0), None);
    }
}
