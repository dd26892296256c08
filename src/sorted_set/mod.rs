//! Persistent (immutable) sorted set based on an AVL tree.
//!
//! This module provides [`SortedSet`], an immutable ordered set that uses
//! structural sharing for efficient operations.
//!
//! # Overview
//!
//! Every operation that looks like a mutation returns a new set and leaves the
//! receiver untouched. Only the nodes on the path to the change are rebuilt;
//! all other subtrees are shared between the old and the new version.
//!
//! - O(log N) `add`, `remove`, `contains`
//! - O(log N) `at`, `index_of` (rank/select through cached subtree sizes)
//! - O(log N) `first`/`last`
//! - O(log N) `above`/`below`/`from`/`up_to`/`between`, `take`/`drop`/`slice`
//! - O(N + M) set algebra when both sets share a comparator
//! - O(1) `len` and `is_empty`
//!
//! # Identity
//!
//! When an operation changes nothing (adding a value that is already present,
//! removing a value that is absent, `take(n)` with `n >= len`, ...) the result
//! is the receiver itself: [`SortedSet::ptr_eq`] holds between the two.
//!
//! Empty natural-order sets are all the canonical empty set returned by
//! [`SortedSet::new`]. An emptied set with a custom comparator keeps its
//! comparator, so later additions still follow the custom order.
//!
//! # Examples
//!
//! ```rust
//! use persistent_sorted_set::SortedSet;
//!
//! let set = SortedSet::new().add(3).add(1).add(2);
//! assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
//!
//! // Structural sharing: the original set is preserved
//! let larger = set.add(4);
//! assert_eq!(set.len(), 3);
//! assert_eq!(larger.len(), 4);
//!
//! // Adding a present value returns the very same set
//! assert!(set.add(2).ptr_eq(&set));
//!
//! // Rank/select
//! assert_eq!(set.at(-1), Some(&3));
//! assert_eq!(set.index_of(&2), Some(1));
//! ```

mod algebra;
mod iter;
mod kind;
mod node;
#[cfg(feature = "serde")]
mod serde;

use std::any::TypeId;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Bound, Index, RangeBounds};
use std::sync::Arc;

use crate::comparator::Comparator;
use crate::error::SortedSetError;

pub use iter::{IntoIter, Iter};
pub use kind::{Plain, SetKind};
use node::Link;

// =============================================================================
// SortedSet Definition
// =============================================================================

/// A persistent (immutable) sorted set.
///
/// Values are kept unique and ordered under the set's [`Comparator`]: the
/// natural order of `T` by default, or a custom ordering bound at
/// construction. Two values the comparator considers equal are the same
/// member.
///
/// The kind parameter `K` distinguishes derived set types; see
/// [`SetKind`]. Every derived set keeps the receiver's kind and comparator
/// unless the operation documents otherwise (`sort`, `sort_by`,
/// `sort_by_key`).
///
/// # Time Complexity
///
/// | Operation        | Complexity   |
/// |------------------|--------------|
/// | `add`            | O(log N)     |
/// | `remove`         | O(log N)     |
/// | `contains`       | O(log N)     |
/// | `at`/`index_of`  | O(log N)     |
/// | `first`/`last`   | O(log N)     |
/// | range queries    | O(log N)     |
/// | `take`/`drop`    | O(log N)     |
/// | set algebra      | O(N + M)     |
/// | `len`            | O(1)         |
///
/// # Examples
///
/// ```rust
/// use persistent_sorted_set::SortedSet;
///
/// let words = SortedSet::from_iter_by_key(
///     ["pear", "fig", "banana"],
///     |word: &&str| word.len(),
/// );
/// assert_eq!(words.iter().copied().collect::<Vec<_>>(), vec!["fig", "pear", "banana"]);
/// ```
pub struct SortedSet<T, K = Plain> {
    root: Link<T>,
    comparator: Comparator<T>,
    kind: PhantomData<fn() -> K>,
}

static_assertions::assert_impl_all!(SortedSet<i32>: Send, Sync, Clone);
static_assertions::assert_impl_all!(SortedSet<String>: Send, Sync, Clone);

// =============================================================================
// Construction (plain kind)
// =============================================================================

impl<T: Ord> SortedSet<T> {
    /// Returns the canonical empty set in natural order.
    ///
    /// No allocation takes place; every empty natural-order set is
    /// [`ptr_eq`](Self::ptr_eq) to this one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<i32> = SortedSet::new();
    /// assert!(set.is_empty());
    /// assert!(set.add(1).remove(&1).ptr_eq(&SortedSet::new()));
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::empty_with(Comparator::natural())
    }

    /// Alias of [`new`](Self::new).
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::new()
    }

    /// Creates a set containing a single value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set = SortedSet::singleton(42);
    /// assert_eq!(set.len(), 1);
    /// assert_eq!(set.first(), Some(&42));
    /// ```
    #[must_use]
    pub fn singleton(value: T) -> Self
    where
        T: Clone,
    {
        Self::new().add(value)
    }
}

impl<T> SortedSet<T> {
    /// Creates an empty set ordered by `comparator`.
    #[inline]
    #[must_use]
    pub fn with_comparator(comparator: Comparator<T>) -> Self {
        Self::empty_with(comparator)
    }

    /// Creates a set from `values` ordered by `comparator`.
    ///
    /// When several values are equivalent under the comparator, the last one
    /// produced by `values` is kept.
    #[must_use]
    pub fn from_iter_with<I: IntoIterator<Item = T>>(values: I, comparator: Comparator<T>) -> Self {
        Self::build_with(values, comparator)
    }

    /// Creates a set from `values` ordered by the natural order of a key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set = SortedSet::from_iter_by_key([-3, 1, -2], |value: &i32| value.abs());
    /// assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, -2, -3]);
    /// ```
    #[must_use]
    pub fn from_iter_by_key<I, Key, F>(values: I, key: F) -> Self
    where
        T: 'static,
        I: IntoIterator<Item = T>,
        Key: Ord,
        F: Fn(&T) -> Key + Send + Sync + 'static,
    {
        Self::build_with(values, Comparator::by_key(key))
    }

    /// Creates a set from `values` ordered by a two-argument comparison.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set = SortedSet::from_iter_by([1, 3, 2], |left: &i32, right: &i32| right.cmp(left));
    /// assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
    /// ```
    #[must_use]
    pub fn from_iter_by<I, F>(values: I, compare: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self::build_with(values, Comparator::by(compare))
    }
}

// =============================================================================
// Construction (any kind)
// =============================================================================

impl<T, K: SetKind> SortedSet<T, K> {
    const fn from_parts(root: Link<T>, comparator: Comparator<T>) -> Self {
        Self {
            root,
            comparator,
            kind: PhantomData,
        }
    }

    /// Creates an empty set of kind `K` ordered by `comparator`.
    #[inline]
    #[must_use]
    pub const fn empty_with(comparator: Comparator<T>) -> Self {
        Self::from_parts(None, comparator)
    }

    /// Creates a set of kind `K` from `values` ordered by `comparator`.
    ///
    /// Equivalent values collapse to the last one produced by `values`.
    #[must_use]
    pub fn build_with<I: IntoIterator<Item = T>>(values: I, comparator: Comparator<T>) -> Self {
        let mut values: Vec<T> = values.into_iter().collect();
        values.sort_by(|left, right| comparator.compare(left, right));
        let unique = dedup_keep_last(values, &comparator);
        Self::from_parts(node::from_sorted(unique), comparator)
    }

    /// Creates a natural-order set of kind `K` from values that are already
    /// strictly ascending.
    ///
    /// # Errors
    ///
    /// Returns [`SortedSetError::UnsortedInput`] with the position of the
    /// first value that is not greater than its predecessor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::{SortedSet, SortedSetError};
    ///
    /// let set: SortedSet<i32> = SortedSet::from_sorted_vec(vec![1, 2, 3]).unwrap();
    /// assert_eq!(set.len(), 3);
    ///
    /// let error = SortedSet::<i32>::from_sorted_vec(vec![1, 3, 3]).unwrap_err();
    /// assert_eq!(error, SortedSetError::UnsortedInput { position: 2 });
    /// ```
    pub fn from_sorted_vec(values: Vec<T>) -> Result<Self, SortedSetError>
    where
        T: Ord,
    {
        if let Some(position) = values
            .windows(2)
            .position(|pair| pair[0] >= pair[1])
        {
            return Err(SortedSetError::UnsortedInput {
                position: position + 1,
            });
        }
        Ok(Self::from_parts(
            node::from_sorted(values),
            Comparator::natural(),
        ))
    }

    /// Wraps `root` with this set's comparator and kind, collapsing an empty
    /// tree to [`clear`](Self::clear).
    fn derive(&self, root: Link<T>) -> Self {
        if root.is_none() {
            return self.clear();
        }
        Self::from_parts(root, self.comparator.clone())
    }

    fn derive_from_sorted(&self, values: Vec<T>) -> Self {
        self.derive(node::from_sorted(values))
    }

    /// Returns an empty set with this set's comparator and kind.
    ///
    /// For natural order this is the canonical empty set; a custom comparator
    /// is kept, so the empty set still orders later additions the same way.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let descending = SortedSet::from_iter_by([1, 2], |left: &i32, right: &i32| right.cmp(left));
    /// let cleared = descending.clear();
    /// assert!(cleared.is_empty());
    /// assert!(!cleared.ptr_eq(&SortedSet::new()));
    /// assert_eq!(cleared.add(1).add(5).first(), Some(&5));
    /// ```
    #[must_use]
    pub fn clear(&self) -> Self {
        Self::empty_with(self.comparator.clone())
    }
}

// =============================================================================
// Queries
// =============================================================================

impl<T, K: SetKind> SortedSet<T, K> {
    /// Returns the number of values in the set.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        node::size(&self.root)
    }

    /// Returns `true` if the set contains no values.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the comparator ordering this set.
    #[inline]
    #[must_use]
    pub const fn comparator(&self) -> &Comparator<T> {
        &self.comparator
    }

    /// Returns `true` if both sets are the very same version: the same root
    /// node (or both empty) and the same comparator.
    ///
    /// This is the identity check behind the "returns the receiver itself"
    /// guarantees of no-op updates.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        let same_root = match (&self.root, &other.root) {
            (None, None) => true,
            (Some(left), Some(right)) => Arc::ptr_eq(left, right),
            _ => false,
        };
        same_root && self.comparator.same_as(&other.comparator)
    }

    /// Returns `true` if the set contains a value equivalent to `value`.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.get(value).is_some()
    }

    /// Returns the stored value equivalent to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set = SortedSet::from_iter_by_key(["Apple", "pear"], |word: &&str| word.to_lowercase());
    /// assert_eq!(set.get(&"APPLE"), Some(&"Apple"));
    /// ```
    #[must_use]
    pub fn get(&self, value: &T) -> Option<&T> {
        node::find(&self.root, value, &self.comparator)
    }

    /// Returns the 0-based position of the value equivalent to `value`.
    #[must_use]
    pub fn index_of(&self, value: &T) -> Option<usize> {
        node::rank(&self.root, value, &self.comparator)
    }

    /// Returns the smallest value.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        node::first(&self.root)
    }

    /// Returns the largest value.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        node::last(&self.root)
    }

    /// Alias of [`first`](Self::first).
    #[must_use]
    pub fn min(&self) -> Option<&T> {
        self.first()
    }

    /// Alias of [`last`](Self::last).
    #[must_use]
    pub fn max(&self) -> Option<&T> {
        self.last()
    }

    /// Resolves a possibly negative index against the length.
    fn resolve_index(&self, index: isize) -> Option<usize> {
        let length = self.len();
        let resolved = if index < 0 {
            length.checked_sub(index.unsigned_abs())?
        } else {
            index.unsigned_abs()
        };
        (resolved < length).then_some(resolved)
    }

    /// Returns the value at `index`. Negative indices count from the end.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<i32> = [10, 20, 30].into_iter().collect();
    /// assert_eq!(set.at(0), Some(&10));
    /// assert_eq!(set.at(-1), Some(&30));
    /// assert_eq!(set.at(3), None);
    /// assert_eq!(set.at(-4), None);
    /// ```
    #[must_use]
    pub fn at(&self, index: isize) -> Option<&T> {
        self.resolve_index(index)
            .and_then(|resolved| node::select(&self.root, resolved))
    }

    /// Returns the value at `index`, failing when it is out of range.
    ///
    /// # Errors
    ///
    /// Returns [`SortedSetError::IndexOutOfRange`] if `index` is outside
    /// `-len..len`.
    pub fn fetch(&self, index: isize) -> Result<&T, SortedSetError> {
        self.at(index).ok_or(SortedSetError::IndexOutOfRange {
            index,
            length: self.len(),
        })
    }

    /// Returns a clone of the value at `index`, or `default` when out of range.
    #[must_use]
    pub fn fetch_or(&self, index: isize, default: T) -> T
    where
        T: Clone,
    {
        self.at(index).cloned().unwrap_or(default)
    }

    /// Returns a clone of the value at `index`, or the result of `fallback`
    /// called with the offending index when out of range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<isize> = [1, 2].into_iter().collect();
    /// assert_eq!(set.fetch_or_else(5, |index| index * 10), 50);
    /// ```
    pub fn fetch_or_else<F>(&self, index: isize, fallback: F) -> T
    where
        T: Clone,
        F: FnOnce(isize) -> T,
    {
        self.at(index).cloned().unwrap_or_else(|| fallback(index))
    }

    /// Returns an iterator over the values in ascending order.
    ///
    /// The iterator is double ended; `iter().rev()` walks in descending order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.root)
    }

    /// Returns the values in order as a `Vec`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Returns the values in order, refusing sets whose order cannot be
    /// reconstructed from the values alone.
    ///
    /// # Errors
    ///
    /// Returns [`SortedSetError::CustomComparator`] if the set is not in
    /// natural order.
    pub fn to_sorted_vec_checked(&self) -> Result<Vec<T>, SortedSetError>
    where
        T: Clone,
    {
        if !self.comparator.is_natural() {
            tracing::debug!(
                kind = K::NAME,
                length = self.len(),
                "refusing to dump a sorted set with a custom comparator"
            );
            return Err(SortedSetError::CustomComparator);
        }
        Ok(self.to_vec())
    }

    /// Returns `true` if both sets are of the same kind and hold the same
    /// values in the same order.
    ///
    /// Unlike `==`, this accepts a set of any kind and returns `false` when
    /// the kinds differ.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::{SortedSet, set_kind};
    ///
    /// set_kind!(Tagged);
    ///
    /// let plain: SortedSet<i32> = [1, 2, 3].into_iter().collect();
    /// let tagged: SortedSet<i32, Tagged> = [1, 2, 3].into_iter().collect();
    /// assert!(plain.collection_eq(&plain.clone()));
    /// assert!(!plain.collection_eq(&tagged));
    /// ```
    #[must_use]
    pub fn collection_eq<K2: SetKind>(&self, other: &SortedSet<T, K2>) -> bool
    where
        T: PartialEq,
    {
        TypeId::of::<K>() == TypeId::of::<K2>()
            && self.len() == other.len()
            && self.iter().eq(other.iter())
    }
}

// =============================================================================
// Derivations
// =============================================================================

impl<T: Clone, K: SetKind> SortedSet<T, K> {
    /// Returns a set that also contains `value`.
    ///
    /// If an equivalent value is already present, the receiver itself is
    /// returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set = SortedSet::new().add(1);
    /// let same = set.add(1);
    /// assert!(same.ptr_eq(&set));
    /// ```
    #[must_use]
    pub fn add(&self, value: T) -> Self {
        let (root, inserted) = node::insert(&self.root, value, &self.comparator);
        if inserted {
            Self::from_parts(Some(root), self.comparator.clone())
        } else {
            self.clone()
        }
    }

    /// Returns a set that also contains `value`, or `None` if an equivalent
    /// value is already present.
    #[must_use]
    pub fn add_checked(&self, value: T) -> Option<Self> {
        if self.contains(&value) {
            return None;
        }
        Some(self.add(value))
    }

    /// Returns a set without the value equivalent to `value`.
    ///
    /// If no such value is present, the receiver itself is returned.
    #[must_use]
    pub fn remove(&self, value: &T) -> Self {
        let (root, removed) = node::remove(&self.root, value, &self.comparator);
        if removed {
            self.derive(root)
        } else {
            self.clone()
        }
    }

    /// Returns a set without the value equivalent to `value`, or `None` if no
    /// such value is present.
    #[must_use]
    pub fn remove_checked(&self, value: &T) -> Option<Self> {
        let (root, removed) = node::remove(&self.root, value, &self.comparator);
        removed.then(|| self.derive(root))
    }

    /// Returns a set without the value at `index`. Negative indices count
    /// from the end; an out-of-range index returns the receiver itself.
    #[must_use]
    pub fn remove_at(&self, index: isize) -> Self {
        let Some(resolved) = self.resolve_index(index) else {
            return self.clone();
        };
        let (root, removed) = node::remove_at(&self.root, resolved);
        if removed {
            self.derive(root)
        } else {
            self.clone()
        }
    }

    // -------------------------------------------------------------------------
    // Range queries
    // -------------------------------------------------------------------------

    /// Returns the values strictly greater than `value`.
    #[must_use]
    pub fn above(&self, value: &T) -> Self {
        let (_, _, greater) = node::split_three(&self.root, value, &self.comparator);
        self.derive(greater)
    }

    /// Returns the values strictly less than `value`.
    #[must_use]
    pub fn below(&self, value: &T) -> Self {
        let (less, _, _) = node::split_three(&self.root, value, &self.comparator);
        self.derive(less)
    }

    /// Returns the values greater than or equal to `value`.
    #[must_use]
    pub fn from(&self, value: &T) -> Self {
        let (_, at_or_above) = node::split(&self.root, value, &self.comparator);
        self.derive(at_or_above)
    }

    /// Returns the values less than or equal to `value`.
    #[must_use]
    pub fn up_to(&self, value: &T) -> Self {
        let (less, found, _) = node::split_three(&self.root, value, &self.comparator);
        match found {
            Some(found) => self.derive(Some(node::join(less, found, None))),
            None => self.derive(less),
        }
    }

    /// Returns the values between `low` and `high`, both inclusive.
    ///
    /// Returns an empty set when `high` precedes `low`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<i32> = (1..=100).collect();
    /// assert_eq!(set.between(&60, &65).to_vec(), vec![60, 61, 62, 63, 64, 65]);
    /// assert!(set.between(&6, &5).is_empty());
    /// ```
    #[must_use]
    pub fn between(&self, low: &T, high: &T) -> Self {
        if self.comparator.compare(high, low) == Ordering::Less {
            return self.clear();
        }
        self.from(low).up_to(high)
    }

    // -------------------------------------------------------------------------
    // Positional slicing
    // -------------------------------------------------------------------------

    /// Returns the first `count` values.
    ///
    /// Returns the receiver itself when `count >= len`.
    #[must_use]
    pub fn take(&self, count: usize) -> Self {
        if count >= self.len() {
            return self.clone();
        }
        let (head, _) = node::split_at(&self.root, count);
        self.derive(head)
    }

    /// Returns all but the first `count` values.
    ///
    /// Returns the receiver itself when `count == 0`.
    #[must_use]
    pub fn drop(&self, count: usize) -> Self {
        if count == 0 {
            return self.clone();
        }
        if count >= self.len() {
            return self.clear();
        }
        let (_, tail) = node::split_at(&self.root, count);
        self.derive(tail)
    }

    /// Returns the longest prefix whose values all satisfy `predicate`.
    #[must_use]
    pub fn take_while<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let count = self.iter().take_while(|value| predicate(value)).count();
        self.take(count)
    }

    /// Returns the values after the longest prefix satisfying `predicate`.
    #[must_use]
    pub fn drop_while<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let count = self.iter().take_while(|value| predicate(value)).count();
        self.drop(count)
    }

    /// Returns up to `count` values starting at `start`, following array
    /// slicing rules.
    ///
    /// A negative `start` counts from the end. A `start` beyond the end (or
    /// before the beginning) yields `None`; a `start` equal to `len` yields
    /// an empty set; requests reaching past the end are clamped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<i32> = [1, 2, 3, 4].into_iter().collect();
    /// assert_eq!(set.slice(0, 2).map(|s| s.to_vec()), Some(vec![1, 2]));
    /// assert_eq!(set.slice(-1, 1).map(|s| s.to_vec()), Some(vec![4]));
    /// assert_eq!(set.slice(2, 10).map(|s| s.to_vec()), Some(vec![3, 4]));
    /// assert!(set.slice(5, 1).is_none());
    /// ```
    #[must_use]
    pub fn slice(&self, start: isize, count: usize) -> Option<Self> {
        let start = self.resolve_bound(start);
        self.subsequence(start, count)
    }

    /// Returns the values whose positions fall inside `range`, following
    /// array slicing rules. Negative bounds count from the end.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<i32> = [1, 2, 3, 4].into_iter().collect();
    /// assert_eq!(set.slice_range(1..3).map(|s| s.to_vec()), Some(vec![2, 3]));
    /// assert_eq!(set.slice_range(-2..).map(|s| s.to_vec()), Some(vec![3, 4]));
    /// assert_eq!(set.slice_range(..=-2).map(|s| s.to_vec()), Some(vec![1, 2, 3]));
    /// assert!(set.slice_range(6..).is_none());
    /// ```
    #[must_use]
    pub fn slice_range<R: RangeBounds<isize>>(&self, range: R) -> Option<Self> {
        let start = match range.start_bound() {
            Bound::Included(&start) => self.resolve_bound(start),
            Bound::Excluded(&start) => self.resolve_bound(start).saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => self.resolve_bound(end).saturating_add(1),
            Bound::Excluded(&end) => self.resolve_bound(end),
            Bound::Unbounded => self.signed_len(),
        };
        let count = usize::try_from(end.saturating_sub(start)).unwrap_or(0);
        self.subsequence(start, count)
    }

    fn signed_len(&self) -> isize {
        isize::try_from(self.len()).unwrap_or(isize::MAX)
    }

    fn resolve_bound(&self, index: isize) -> isize {
        if index < 0 {
            index.saturating_add(self.signed_len())
        } else {
            index
        }
    }

    fn subsequence(&self, start: isize, count: usize) -> Option<Self> {
        let start = usize::try_from(start).ok()?;
        let length = self.len();
        if start > length {
            return None;
        }
        let count = count.min(length - start);
        if count == 0 {
            return Some(self.clear());
        }
        Some(self.drop(start).take(count))
    }

    /// Returns the values at the given positions. Out-of-range positions are
    /// skipped; negative positions count from the end.
    #[must_use]
    pub fn values_at(&self, indices: &[isize]) -> Self {
        let values: Vec<T> = indices
            .iter()
            .filter_map(|&index| self.at(index).cloned())
            .collect();
        Self::build_with(values, self.comparator.clone())
    }

    // -------------------------------------------------------------------------
    // Transformations
    // -------------------------------------------------------------------------

    /// Returns the values produced by `transform`, ordered by this set's
    /// comparator. Values that become equivalent collapse into one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<i32> = [1, 2, 3].into_iter().collect();
    /// assert_eq!(set.map(|value| value / 2).to_vec(), vec![0, 1]);
    /// ```
    #[must_use]
    pub fn map<F>(&self, transform: F) -> Self
    where
        F: FnMut(&T) -> T,
    {
        if self.is_empty() {
            return self.clone();
        }
        Self::build_with(self.iter().map(transform), self.comparator.clone())
    }

    /// Returns the values satisfying `predicate`.
    ///
    /// Returns the receiver itself when every value satisfies it.
    #[must_use]
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let kept: Vec<T> = self
            .iter()
            .filter(|value| predicate(value))
            .cloned()
            .collect();
        if kept.len() == self.len() {
            return self.clone();
        }
        self.derive_from_sorted(kept)
    }

    /// Returns the values not satisfying `predicate`.
    #[must_use]
    pub fn reject<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        self.filter(|value| !predicate(value))
    }

    /// Splits into the values satisfying `predicate` and the rest.
    #[must_use]
    pub fn partition<P>(&self, mut predicate: P) -> (Self, Self)
    where
        P: FnMut(&T) -> bool,
    {
        let (matching, rest): (Vec<T>, Vec<T>) =
            self.iter().cloned().partition(|value| predicate(value));
        (
            self.derive_from_sorted(matching),
            self.derive_from_sorted(rest),
        )
    }

    /// Groups the values by the key computed by `classify`. Each group is a
    /// set of the same kind and comparator as the receiver.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<i32> = (1..=6).collect();
    /// let groups = set.group_by(|value| value % 2 == 0);
    /// assert_eq!(groups[&true].to_vec(), vec![2, 4, 6]);
    /// assert_eq!(groups[&false].to_vec(), vec![1, 3, 5]);
    /// ```
    #[must_use]
    pub fn group_by<G, F>(&self, mut classify: F) -> BTreeMap<G, Self>
    where
        G: Ord,
        F: FnMut(&T) -> G,
    {
        let mut groups: BTreeMap<G, Vec<T>> = BTreeMap::new();
        for value in self {
            groups
                .entry(classify(value))
                .or_default()
                .push(value.clone());
        }
        groups
            .into_iter()
            .map(|(key, values)| (key, self.derive_from_sorted(values)))
            .collect()
    }

    /// Returns the values re-ordered by their natural order.
    ///
    /// The receiver's comparator is discarded.
    #[must_use]
    pub fn sort(&self) -> Self
    where
        T: Ord,
    {
        if self.comparator.is_natural() {
            return self.clone();
        }
        Self::build_with(self.iter().cloned(), Comparator::natural())
    }

    /// Returns the values re-ordered by the natural order of a key.
    ///
    /// The receiver's comparator is discarded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::SortedSet;
    ///
    /// let set: SortedSet<i32> = [1, 2, 3].into_iter().collect();
    /// let descending = set.sort_by_key(|value: &i32| -value);
    /// assert_eq!(descending.to_vec(), vec![3, 2, 1]);
    /// assert!(!descending.comparator().is_natural());
    /// ```
    #[must_use]
    pub fn sort_by_key<Key, F>(&self, key: F) -> Self
    where
        T: 'static,
        Key: Ord,
        F: Fn(&T) -> Key + Send + Sync + 'static,
    {
        Self::build_with(self.iter().cloned(), Comparator::by_key(key))
    }

    /// Returns the values re-ordered by a two-argument comparison.
    ///
    /// The receiver's comparator is discarded.
    #[must_use]
    pub fn sort_by<F>(&self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self::build_with(self.iter().cloned(), Comparator::by(compare))
    }
}

/// Collapses runs of equivalent values in a sorted vector, keeping the last
/// value of each run.
fn dedup_keep_last<T>(values: Vec<T>, comparator: &Comparator<T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        if let Some(last) = unique.last_mut()
            && comparator.compare(last, &value) == Ordering::Equal
        {
            *last = value;
        } else {
            unique.push(value);
        }
    }
    unique
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T, K> Clone for SortedSet<T, K> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            comparator: self.comparator.clone(),
            kind: PhantomData,
        }
    }
}

impl<T: Ord, K: SetKind> Default for SortedSet<T, K> {
    #[inline]
    fn default() -> Self {
        Self::empty_with(Comparator::natural())
    }
}

impl<T: Ord, K: SetKind> FromIterator<T> for SortedSet<T, K> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::build_with(iter, Comparator::natural())
    }
}

impl<T: Clone, K: SetKind> IntoIterator for SortedSet<T, K> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.root)
    }
}

impl<'a, T, K: SetKind> IntoIterator for &'a SortedSet<T, K> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Positional access by rank.
///
/// Panics when `index >= len`, like slice indexing. For negative indices or
/// an `Option` instead of a panic, use [`SortedSet::at`].
impl<T, K: SetKind> Index<usize> for SortedSet<T, K> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        node::select(&self.root, index).unwrap_or_else(|| {
            panic!(
                "index out of bounds: the len is {} but the index is {index}",
                self.len()
            )
        })
    }
}

impl<T: PartialEq, K: SetKind> PartialEq for SortedSet<T, K> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, K: SetKind> Eq for SortedSet<T, K> {}

/// Hashes the length, then every value in order, so equal sets hash equally.
impl<T: Hash, K: SetKind> Hash for SortedSet<T, K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for value in self {
            value.hash(state);
        }
    }
}

impl<T: fmt::Debug, K: SetKind> fmt::Debug for SortedSet<T, K> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(K::NAME)?;
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display, K: SetKind> fmt::Display for SortedSet<T, K> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for value in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    crate::set_kind!(Evens);

    fn natural(values: impl IntoIterator<Item = i32>) -> SortedSet<i32> {
        values.into_iter().collect()
    }

    fn descending(values: impl IntoIterator<Item = i32>) -> SortedSet<i32> {
        SortedSet::from_iter_by(values, |left: &i32, right: &i32| right.cmp(left))
    }

    fn assert_valid<T, K: SetKind>(set: &SortedSet<T, K>) {
        node::check_invariants(&set.root, &set.comparator);
    }

    // =========================================================================
    // Construction Tests
    // =========================================================================

    #[rstest]
    fn test_new_is_canonical_empty() {
        let set: SortedSet<i32> = SortedSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(set.ptr_eq(&SortedSet::empty()));
        assert!(set.ptr_eq(&SortedSet::default()));
    }

    #[rstest]
    fn test_from_iter_sorts_and_deduplicates() {
        let set = natural([3, 1, 2, 3, 1]);
        assert_eq!(set.to_vec(), vec![1, 2, 3]);
        assert_valid(&set);
    }

    #[rstest]
    fn test_from_iter_with_equivalent_values_keeps_last() {
        let set = SortedSet::from_iter_by_key([1, -1, 2], |value: &i32| value.abs());
        assert_eq!(set.to_vec(), vec![-1, 2]);
    }

    #[rstest]
    fn test_singleton() {
        let set = SortedSet::singleton("one");
        assert_eq!(set.len(), 1);
        assert_eq!(set.first(), Some(&"one"));
    }

    // =========================================================================
    // Add / Remove Tests
    // =========================================================================

    #[rstest]
    fn test_add_preserves_original() {
        let set = natural([1, 2]);
        let added = set.add(3);
        assert_eq!(set.to_vec(), vec![1, 2]);
        assert_eq!(added.to_vec(), vec![1, 2, 3]);
    }

    #[rstest]
    fn test_add_present_value_returns_receiver() {
        let set = natural([1, 2, 3]);
        assert!(set.add(2).ptr_eq(&set));
        assert!(set.add_checked(2).is_none());
        assert_eq!(set.add_checked(4).map(|added| added.len()), Some(4));
    }

    #[rstest]
    fn test_remove_absent_value_returns_receiver() {
        let set = natural([1, 2, 3]);
        assert!(set.remove(&5).ptr_eq(&set));
        assert!(set.remove_checked(&5).is_none());
        assert_eq!(
            set.remove_checked(&2).map(|removed| removed.to_vec()),
            Some(vec![1, 3])
        );
    }

    #[rstest]
    fn test_emptied_natural_set_is_canonical_empty() {
        let set = SortedSet::new().add(1).remove(&1);
        assert!(set.ptr_eq(&SortedSet::new()));
    }

    #[rstest]
    fn test_emptied_custom_set_keeps_comparator() {
        let set = descending([1]).remove(&1);
        assert!(set.is_empty());
        assert!(!set.ptr_eq(&SortedSet::new()));
        assert_eq!(set.add(1).add(3).add(2).to_vec(), vec![3, 2, 1]);
    }

    #[rstest]
    #[case(0, vec![2, 3, 4])]
    #[case(-1, vec![1, 2, 3])]
    #[case(-4, vec![2, 3, 4])]
    fn test_remove_at(#[case] index: isize, #[case] expected: Vec<i32>) {
        assert_eq!(natural([1, 2, 3, 4]).remove_at(index).to_vec(), expected);
    }

    #[rstest]
    #[case(4)]
    #[case(-5)]
    fn test_remove_at_out_of_range_returns_receiver(#[case] index: isize) {
        let set = natural([1, 2, 3, 4]);
        assert!(set.remove_at(index).ptr_eq(&set));
    }

    // =========================================================================
    // Indexed Access Tests
    // =========================================================================

    #[rstest]
    #[case(0, Some(5))]
    #[case(2, Some(15))]
    #[case(-1, Some(15))]
    #[case(-3, Some(5))]
    #[case(3, None)]
    #[case(-4, None)]
    fn test_at(#[case] index: isize, #[case] expected: Option<i32>) {
        assert_eq!(natural([5, 10, 15]).at(index).copied(), expected);
    }

    #[rstest]
    fn test_fetch_out_of_range_is_error() {
        let set = natural([5, 10, 15]);
        assert_eq!(set.fetch(1), Ok(&10));
        assert_eq!(
            set.fetch(-4),
            Err(SortedSetError::IndexOutOfRange {
                index: -4,
                length: 3
            })
        );
    }

    #[rstest]
    fn test_fetch_with_default_and_fallback() {
        let set = natural([5, 10, 15]);
        assert_eq!(set.fetch_or(0, 99), 5);
        assert_eq!(set.fetch_or(7, 99), 99);
        assert_eq!(
            set.fetch_or_else(7, |index| i32::try_from(index).unwrap() * 2),
            14
        );
    }

    #[rstest]
    fn test_index_operator() {
        let set = natural([5, 10, 15]);
        assert_eq!(set[0], 5);
        assert_eq!(set[2], 15);
    }

    #[rstest]
    #[should_panic(expected = "index out of bounds")]
    fn test_index_operator_panics_out_of_range() {
        let set = natural([5, 10, 15]);
        let _ = set[3];
    }

    #[rstest]
    fn test_first_last_on_empty() {
        let set: SortedSet<i32> = SortedSet::new();
        assert_eq!(set.first(), None);
        assert_eq!(set.last(), None);
    }

    // =========================================================================
    // Range Query Tests
    // =========================================================================

    #[rstest]
    fn test_range_queries() {
        let set = natural(1..=10);
        assert_eq!(set.above(&7).to_vec(), vec![8, 9, 10]);
        assert_eq!(set.below(&3).to_vec(), vec![1, 2]);
        assert_eq!(set.from(&8).to_vec(), vec![8, 9, 10]);
        assert_eq!(set.up_to(&3).to_vec(), vec![1, 2, 3]);
        assert_eq!(set.between(&4, &6).to_vec(), vec![4, 5, 6]);
    }

    #[rstest]
    fn test_range_queries_with_absent_bounds() {
        let set = natural([10, 20, 30, 40]);
        assert_eq!(set.above(&25).to_vec(), vec![30, 40]);
        assert_eq!(set.from(&25).to_vec(), vec![30, 40]);
        assert_eq!(set.up_to(&25).to_vec(), vec![10, 20]);
        assert_eq!(set.between(&15, &35).to_vec(), vec![20, 30]);
    }

    #[rstest]
    fn test_empty_range_results_are_canonical() {
        let set = natural(1..=100);
        assert!(set.above(&100).ptr_eq(&SortedSet::new()));
        assert!(set.from(&101).ptr_eq(&SortedSet::new()));
        assert!(set.between(&6, &5).ptr_eq(&SortedSet::new()));
    }

    #[rstest]
    fn test_range_queries_follow_custom_order() {
        let set = descending(1..=5);
        assert_eq!(set.above(&3).to_vec(), vec![2, 1]);
        assert_eq!(set.between(&4, &2).to_vec(), vec![4, 3, 2]);
        assert!(set.between(&2, &4).is_empty());
    }

    // =========================================================================
    // Slicing Tests
    // =========================================================================

    #[rstest]
    #[case(0, vec![])]
    #[case(2, vec![1, 2])]
    #[case(4, vec![1, 2, 3, 4])]
    fn test_take(#[case] count: usize, #[case] expected: Vec<i32>) {
        assert_eq!(natural([1, 2, 3, 4]).take(count).to_vec(), expected);
    }

    #[rstest]
    fn test_take_and_drop_identity() {
        let set = natural([1, 2, 3, 4]);
        assert!(set.take(4).ptr_eq(&set));
        assert!(set.take(10).ptr_eq(&set));
        assert!(set.drop(0).ptr_eq(&set));
        assert!(set.drop(4).ptr_eq(&SortedSet::new()));
        assert!(set.take(0).ptr_eq(&SortedSet::new()));
    }

    #[rstest]
    fn test_take_while_and_drop_while() {
        let set = natural(1..=6);
        assert_eq!(set.take_while(|value| *value < 4).to_vec(), vec![1, 2, 3]);
        assert_eq!(set.drop_while(|value| *value < 4).to_vec(), vec![4, 5, 6]);
    }

    #[rstest]
    #[case(0, 2, Some(vec![1, 2]))]
    #[case(-1, 1, Some(vec![4]))]
    #[case(2, 10, Some(vec![3, 4]))]
    #[case(4, 1, Some(vec![]))]
    #[case(5, 1, None)]
    #[case(-5, 1, None)]
    #[case(1, 0, Some(vec![]))]
    fn test_slice(#[case] start: isize, #[case] count: usize, #[case] expected: Option<Vec<i32>>) {
        let set = natural([1, 2, 3, 4]);
        assert_eq!(set.slice(start, count).map(|slice| slice.to_vec()), expected);
    }

    #[rstest]
    fn test_slice_range() {
        let set = natural([1, 2, 3, 4]);
        assert_eq!(set.slice_range(..).map(|s| s.to_vec()), Some(vec![1, 2, 3, 4]));
        assert_eq!(set.slice_range(1..=2).map(|s| s.to_vec()), Some(vec![2, 3]));
        assert_eq!(set.slice_range(-3..-1).map(|s| s.to_vec()), Some(vec![2, 3]));
        assert_eq!(set.slice_range(3..1).map(|s| s.to_vec()), Some(vec![]));
        assert_eq!(set.slice_range(4..).map(|s| s.to_vec()), Some(vec![]));
        assert!(set.slice_range(5..).is_none());
    }

    #[rstest]
    fn test_values_at() {
        let set = natural([10, 20, 30, 40]);
        assert_eq!(set.values_at(&[3, 0, -1, 9]).to_vec(), vec![10, 40]);
    }

    // =========================================================================
    // Transformation Tests
    // =========================================================================

    #[rstest]
    fn test_map_keeps_comparator() {
        let set = descending([1, 2, 3]).map(|value| value * 10);
        assert_eq!(set.to_vec(), vec![30, 20, 10]);
        assert!(!set.comparator().is_natural());
    }

    #[rstest]
    fn test_filter_all_returns_receiver() {
        let set = natural([1, 2, 3]);
        assert!(set.filter(|_| true).ptr_eq(&set));
        assert!(set.filter(|_| false).ptr_eq(&SortedSet::new()));
        assert_eq!(set.reject(|value| *value == 2).to_vec(), vec![1, 3]);
    }

    #[rstest]
    fn test_partition() {
        let (even, odd) = natural(1..=5).partition(|value| value % 2 == 0);
        assert_eq!(even.to_vec(), vec![2, 4]);
        assert_eq!(odd.to_vec(), vec![1, 3, 5]);
        assert_valid(&odd);
    }

    #[rstest]
    fn test_group_by_keeps_kind_and_order() {
        let set: SortedSet<i32, Evens> = (1..=6).collect();
        let groups: BTreeMap<bool, SortedSet<i32, Evens>> = set.group_by(|value| *value > 3);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&false].to_vec(), vec![1, 2, 3]);
        assert_eq!(groups[&true].to_vec(), vec![4, 5, 6]);
    }

    #[rstest]
    fn test_sort_discards_custom_comparator() {
        let set = descending([1, 2, 3]);
        let sorted = set.sort();
        assert_eq!(sorted.to_vec(), vec![1, 2, 3]);
        assert!(sorted.comparator().is_natural());

        let by_parity = natural([1, 2, 3, 4]).sort_by(|left: &i32, right: &i32| {
            (left % 2).cmp(&(right % 2)).then(left.cmp(right))
        });
        assert_eq!(by_parity.to_vec(), vec![2, 4, 1, 3]);
    }

    // =========================================================================
    // Kind Tests
    // =========================================================================

    #[rstest]
    fn test_derivations_keep_kind() {
        fn kind_name<K: SetKind>(_: &SortedSet<i32, K>) -> &'static str {
            K::NAME
        }

        let set: SortedSet<i32, Evens> = [1, 2, 3].into_iter().collect();
        assert_eq!(kind_name(&set.filter(|_| true)), "Evens");
        assert_eq!(kind_name(&set.map(|value| value * 2)), "Evens");
        assert_eq!(kind_name(&set.add(4).remove(&1)), "Evens");
        assert_eq!(kind_name(&set.sort_by_key(|value: &i32| -value)), "Evens");
    }

    #[rstest]
    fn test_cross_kind_sets_are_not_equal() {
        let plain = natural([1, 2, 3]);
        let evens: SortedSet<i32, Evens> = [1, 2, 3].into_iter().collect();
        assert!(!plain.collection_eq(&evens));
        assert!(!evens.collection_eq(&plain));
        assert!(evens.collection_eq(&evens.clone()));
    }

    // =========================================================================
    // Equality / Formatting Tests
    // =========================================================================

    #[rstest]
    fn test_equality_ignores_construction_order() {
        assert_eq!(natural([3, 1, 2]), natural([1, 2, 3]));
        assert_ne!(natural([1, 2]), natural([1, 2, 3]));
    }

    #[rstest]
    fn test_equal_sets_hash_equally() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(set: &SortedSet<i32>) -> u64 {
            let mut hasher = DefaultHasher::new();
            set.hash(&mut hasher);
            hasher.finish()
        }

        assert_eq!(hash_of(&natural([2, 1])), hash_of(&natural([1, 2])));
    }

    #[rstest]
    fn test_debug_and_display() {
        let set = natural([2, 1]);
        assert_eq!(format!("{set:?}"), "SortedSet[1, 2]");
        assert_eq!(format!("{set}"), "{1, 2}");

        let evens: SortedSet<i32, Evens> = [4, 2].into_iter().collect();
        assert_eq!(format!("{evens:?}"), "Evens[2, 4]");

        let empty: SortedSet<i32> = SortedSet::new();
        assert_eq!(format!("{empty}"), "{}");
    }

    #[rstest]
    fn test_to_sorted_vec_checked() {
        assert_eq!(natural([2, 1]).to_sorted_vec_checked(), Ok(vec![1, 2]));
        assert_eq!(
            descending([2, 1]).to_sorted_vec_checked(),
            Err(SortedSetError::CustomComparator)
        );
    }

    #[rstest]
    fn test_from_sorted_vec_rejects_unsorted_input() {
        let set: Result<SortedSet<i32>, _> = SortedSet::from_sorted_vec(vec![1, 2, 3]);
        assert_eq!(set.map(|set| set.len()), Ok(3));
        assert_eq!(
            SortedSet::<i32>::from_sorted_vec(vec![2, 1]),
            Err(SortedSetError::UnsortedInput { position: 1 })
        );
    }

    #[rstest]
    fn test_many_versions_stay_valid() {
        let base = natural(0..64);
        let versions: Vec<SortedSet<i32>> = (0..64).map(|value| base.remove(&value)).collect();
        for (removed, version) in versions.iter().enumerate() {
            assert_valid(version);
            assert_eq!(version.len(), 63);
            assert!(!version.contains(&i32::try_from(removed).unwrap()));
        }
        assert_eq!(base.len(), 64);
    }
}
