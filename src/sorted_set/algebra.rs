//! Set algebra over sorted sets.
//!
//! When both operands share one comparator their in-order sequences are
//! walked in lockstep and the result is rebuilt in linear time. Operands with
//! different comparators fall back to single-value updates and membership
//! tests against the receiver's tree; the answer is the same, only slower.
//!
//! Results always carry the receiver's kind and comparator.

use std::cmp::Ordering;

use super::node;
use super::{Iter, SetKind, SortedSet};
use crate::comparator::Comparator;

// =============================================================================
// Lockstep Merge
// =============================================================================

/// Which values a lockstep merge keeps, by where they occur.
///
/// Values present on both sides are taken from the left operand.
#[derive(Debug, Clone, Copy)]
struct MergePolicy {
    left_only: bool,
    both: bool,
    right_only: bool,
}

impl MergePolicy {
    const UNION: Self = Self {
        left_only: true,
        both: true,
        right_only: true,
    };
    const INTERSECTION: Self = Self {
        left_only: false,
        both: true,
        right_only: false,
    };
    const DIFFERENCE: Self = Self {
        left_only: true,
        both: false,
        right_only: false,
    };
    const SYMMETRIC_DIFFERENCE: Self = Self {
        left_only: true,
        both: false,
        right_only: true,
    };

    /// Walks both ascending sequences once and collects the kept values,
    /// which come out strictly ascending.
    fn merge<T: Clone>(
        self,
        left: Iter<'_, T>,
        right: Iter<'_, T>,
        comparator: &Comparator<T>,
    ) -> Vec<T> {
        let mut merged = Vec::with_capacity(left.len() + right.len());
        let mut left = left.peekable();
        let mut right = right.peekable();

        loop {
            match (left.peek().copied(), right.peek().copied()) {
                (Some(left_value), Some(right_value)) => {
                    match comparator.compare(left_value, right_value) {
                        Ordering::Less => {
                            if self.left_only {
                                merged.push(left_value.clone());
                            }
                            left.next();
                        }
                        Ordering::Greater => {
                            if self.right_only {
                                merged.push(right_value.clone());
                            }
                            right.next();
                        }
                        Ordering::Equal => {
                            if self.both {
                                merged.push(left_value.clone());
                            }
                            left.next();
                            right.next();
                        }
                    }
                }
                (Some(_), None) => {
                    if self.left_only {
                        merged.extend(left.cloned());
                    }
                    break;
                }
                (None, Some(_)) => {
                    if self.right_only {
                        merged.extend(right.cloned());
                    }
                    break;
                }
                (None, None) => break,
            }
        }

        merged
    }
}

// =============================================================================
// Set Operations
// =============================================================================

impl<T: Clone, K: SetKind> SortedSet<T, K> {
    fn shares_order_with<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> bool {
        self.comparator.same_as(&other.comparator)
    }

    fn trace_fallback(operation: &'static str, left: usize, right: usize) {
        tracing::trace!(
            kind = K::NAME,
            operation,
            left,
            right,
            "comparators differ, falling back to per-value updates"
        );
    }

    /// Rebuilds `other`'s values under this set's comparator, so equivalence
    /// is decided by the receiver's order.
    fn reordered<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> Self {
        Self::build_with(other.iter().cloned(), self.comparator.clone())
    }

    /// Runs a lockstep merge and wraps the result, returning the receiver
    /// itself when the merge produced exactly its values.
    fn merged_with<K2: SetKind>(
        &self,
        other: &SortedSet<T, K2>,
        policy: MergePolicy,
        unchanged: impl FnOnce(usize) -> bool,
    ) -> Self {
        let merged = policy.merge(self.iter(), other.iter(), &self.comparator);
        if unchanged(merged.len()) {
            return self.clone();
        }
        self.derive(node::from_sorted(merged))
    }

    /// Returns the values present in either set.
    ///
    /// Where both sets hold equivalent values, the receiver's value is kept.
    /// Returns the receiver itself when `other` adds nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let left: SortedSet<i32> = [1, 3, 5].into_iter().collect();
    /// let right: SortedSet<i32> = [2, 3, 4].into_iter().collect();
    /// assert_eq!(left.union(&right).to_vec(), vec![1, 2, 3, 4, 5]);
    /// ```
    #[must_use]
    pub fn union<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if !self.shares_order_with(other) {
            Self::trace_fallback("union", self.len(), other.len());
            return other.iter().fold(self.clone(), |set, value| set.add(value.clone()));
        }

        if let (Some(last), Some(first)) = (self.last(), other.first())
            && self.comparator.compare(last, first) == Ordering::Less
        {
            return self.derive(node::merge_disjoint(&self.root, &other.root));
        }
        if let (Some(first), Some(last)) = (self.first(), other.last())
            && self.comparator.compare(last, first) == Ordering::Less
        {
            return self.derive(node::merge_disjoint(&other.root, &self.root));
        }

        let length = self.len();
        self.merged_with(other, MergePolicy::UNION, |merged| merged == length)
    }

    /// Returns the receiver's values that are also present in `other`.
    ///
    /// Returns the receiver itself when every value is shared.
    #[must_use]
    pub fn intersection<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> Self {
        if !self.shares_order_with(other) {
            Self::trace_fallback("intersection", self.len(), other.len());
            return self.intersection(&self.reordered(other));
        }
        let length = self.len();
        self.merged_with(other, MergePolicy::INTERSECTION, |merged| {
            merged == length
        })
    }

    /// Returns the receiver's values that are absent from `other`.
    ///
    /// Returns the receiver itself when nothing is removed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let left: SortedSet<i32> = (1..=5).collect();
    /// let right: SortedSet<i32> = [2, 4, 6].into_iter().collect();
    /// assert_eq!(left.difference(&right).to_vec(), vec![1, 3, 5]);
    /// ```
    #[must_use]
    pub fn difference<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if !self.shares_order_with(other) {
            Self::trace_fallback("difference", self.len(), other.len());
            return other.iter().fold(self.clone(), |set, value| set.remove(value));
        }
        let length = self.len();
        self.merged_with(other, MergePolicy::DIFFERENCE, |merged| merged == length)
    }

    /// Returns the values present in exactly one of the two sets.
    #[must_use]
    pub fn symmetric_difference<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if !self.shares_order_with(other) {
            Self::trace_fallback("symmetric_difference", self.len(), other.len());
            return self.symmetric_difference(&self.reordered(other));
        }
        self.merged_with(other, MergePolicy::SYMMETRIC_DIFFERENCE, |_| false)
    }
}

// =============================================================================
// Predicates
// =============================================================================

impl<T, K: SetKind> SortedSet<T, K> {
    /// Returns `true` if every value of the receiver is present in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let small: SortedSet<i32> = [2, 3].into_iter().collect();
    /// let large: SortedSet<i32> = (1..=4).collect();
    /// assert!(small.is_subset(&large));
    /// assert!(small.is_proper_subset(&large));
    /// assert!(!large.is_subset(&small));
    /// ```
    #[must_use]
    pub fn is_subset<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> bool {
        // A coarser comparator on `other` may map several values onto one.
        if self.len() > other.len() {
            return false;
        }
        if !self.comparator.same_as(&other.comparator) {
            return self.iter().all(|value| other.contains(value));
        }

        let mut candidates = other.iter();
        'values: for value in self {
            for candidate in candidates.by_ref() {
                match self.comparator.compare(value, candidate) {
                    Ordering::Equal => continue 'values,
                    Ordering::Greater => {}
                    Ordering::Less => return false,
                }
            }
            return false;
        }
        true
    }

    /// Returns `true` if the receiver is a subset of `other` and smaller.
    #[must_use]
    pub fn is_proper_subset<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> bool {
        self.len() < other.len() && self.is_subset(other)
    }

    /// Returns `true` if every value of `other` is present in the receiver.
    #[must_use]
    pub fn is_superset<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> bool {
        other.is_subset(self)
    }

    /// Returns `true` if the receiver is a superset of `other` and larger.
    #[must_use]
    pub fn is_proper_superset<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> bool {
        other.is_proper_subset(self)
    }

    /// Returns `true` if the two sets share no value.
    #[must_use]
    pub fn is_disjoint<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> bool {
        if !self.comparator.same_as(&other.comparator) {
            return if self.len() <= other.len() {
                !self.iter().any(|value| other.contains(value))
            } else {
                !other.iter().any(|value| self.contains(value))
            };
        }

        let mut left = self.iter().peekable();
        let mut right = other.iter().peekable();
        while let (Some(&left_value), Some(&right_value)) = (left.peek(), right.peek()) {
            match self.comparator.compare(left_value, right_value) {
                Ordering::Less => {
                    left.next();
                }
                Ordering::Greater => {
                    right.next();
                }
                Ordering::Equal => return false,
            }
        }
        true
    }

    /// Returns `true` if the two sets share at least one value.
    #[must_use]
    pub fn intersects<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> bool {
        !self.is_disjoint(other)
    }
}
