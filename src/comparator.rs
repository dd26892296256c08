//! Total-order abstraction bound to a sorted set.
//!
//! A [`Comparator`] is either the natural order of an `Ord` element type or a
//! user-supplied ordering. User orderings come in two shapes, a one-argument
//! key extractor or a two-argument comparison, and both are normalized into a
//! single `(&T, &T) -> Ordering` closure when the comparator is built.
//!
//! # Identity
//!
//! Two comparators are [`same_as`](Comparator::same_as) each other when both
//! are the natural order, or when both point to the very same closure
//! allocation. Behaviourally equivalent closures built separately are *not*
//! the same comparator.
//!
//! # Examples
//!
//! ```rust
//! use persistent_sorted_set::Comparator;
//! use std::cmp::Ordering;
//!
//! let by_length = Comparator::by_key(|word: &String| word.len());
//! assert_eq!(
//!     by_length.compare(&"ab".to_string(), &"abc".to_string()),
//!     Ordering::Less
//! );
//!
//! let copy = by_length.clone();
//! assert!(copy.same_as(&by_length));
//! assert!(!by_length.same_as(&Comparator::by_key(|word: &String| word.len())));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type CompareFn<T> = dyn Fn(&T, &T) -> Ordering + Send + Sync;

enum Rule<T> {
    Natural(fn(&T, &T) -> Ordering),
    Custom(Arc<CompareFn<T>>),
}

/// A total order over `T`, immutable once bound to a set.
pub struct Comparator<T> {
    rule: Rule<T>,
}

impl<T: Ord> Comparator<T> {
    /// The natural ordering of `T`.
    #[inline]
    #[must_use]
    pub fn natural() -> Self {
        Self {
            rule: Rule::Natural(<T as Ord>::cmp),
        }
    }
}

impl<T> Comparator<T> {
    /// Orders elements by the natural order of a key computed from each element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::Comparator;
    /// use std::cmp::Ordering;
    ///
    /// let by_magnitude = Comparator::by_key(|value: &i32| value.abs());
    /// assert_eq!(by_magnitude.compare(&-7, &3), Ordering::Greater);
    /// ```
    #[must_use]
    pub fn by_key<Key, F>(key: F) -> Self
    where
        T: 'static,
        Key: Ord,
        F: Fn(&T) -> Key + Send + Sync + 'static,
    {
        Self {
            rule: Rule::Custom(Arc::new(move |left: &T, right: &T| {
                key(left).cmp(&key(right))
            })),
        }
    }

    /// Orders elements with an explicit two-argument comparison.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_sorted_set::Comparator;
    /// use std::cmp::Ordering;
    ///
    /// let descending = Comparator::by(|left: &i32, right: &i32| right.cmp(left));
    /// assert_eq!(descending.compare(&1, &2), Ordering::Greater);
    /// ```
    #[must_use]
    pub fn by<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            rule: Rule::Custom(Arc::new(compare)),
        }
    }

    /// Compares two elements.
    #[inline]
    pub fn compare(&self, left: &T, right: &T) -> Ordering {
        match &self.rule {
            Rule::Natural(compare) => compare(left, right),
            Rule::Custom(compare) => compare(left, right),
        }
    }

    /// Returns `true` if this is the natural order of the element type.
    #[inline]
    #[must_use]
    pub const fn is_natural(&self) -> bool {
        matches!(self.rule, Rule::Natural(_))
    }

    /// Returns `true` if both comparators are the identical ordering.
    ///
    /// Custom comparators are compared by allocation, so only clones of one
    /// comparator are the same as each other.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (&self.rule, &other.rule) {
            (Rule::Natural(_), Rule::Natural(_)) => true,
            (Rule::Custom(left), Rule::Custom(right)) => {
                Arc::as_ptr(left).cast::<()>() == Arc::as_ptr(right).cast::<()>()
            }
            _ => false,
        }
    }
}

impl<T> Clone for Comparator<T> {
    fn clone(&self) -> Self {
        let rule = match &self.rule {
            Rule::Natural(compare) => Rule::Natural(*compare),
            Rule::Custom(compare) => Rule::Custom(Arc::clone(compare)),
        };
        Self { rule }
    }
}

impl<T: Ord> Default for Comparator<T> {
    #[inline]
    fn default() -> Self {
        Self::natural()
    }
}

impl<T> fmt::Debug for Comparator<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Rule::Natural(_) => formatter.write_str("Comparator::Natural"),
            Rule::Custom(_) => formatter.write_str("Comparator::Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 2, Ordering::Less)]
    #[case(2, 2, Ordering::Equal)]
    #[case(3, 2, Ordering::Greater)]
    fn test_natural_order(#[case] left: i32, #[case] right: i32, #[case] expected: Ordering) {
        assert_eq!(Comparator::natural().compare(&left, &right), expected);
    }

    #[rstest]
    fn test_key_extractor_orders_by_key() {
        let comparator = Comparator::by_key(|word: &&str| word.len());
        assert_eq!(comparator.compare(&"aaa", &"b"), Ordering::Greater);
        assert_eq!(comparator.compare(&"aa", &"bb"), Ordering::Equal);
    }

    #[rstest]
    fn test_two_argument_comparison() {
        let comparator = Comparator::by(|left: &i32, right: &i32| right.cmp(left));
        assert_eq!(comparator.compare(&5, &1), Ordering::Less);
    }

    #[rstest]
    fn test_natural_comparators_are_the_same() {
        assert!(Comparator::<i32>::natural().same_as(&Comparator::natural()));
        assert!(Comparator::<i32>::natural().is_natural());
    }

    #[rstest]
    fn test_custom_comparator_identity_is_by_allocation() {
        let descending = Comparator::by(|left: &i32, right: &i32| right.cmp(left));
        let other = Comparator::by(|left: &i32, right: &i32| right.cmp(left));

        assert!(descending.same_as(&descending.clone()));
        assert!(!descending.same_as(&other));
        assert!(!descending.same_as(&Comparator::natural()));
        assert!(!descending.is_natural());
    }

    #[rstest]
    fn test_debug_names_the_rule() {
        assert_eq!(format!("{:?}", Comparator::<i32>::natural()), "Comparator::Natural");
        assert_eq!(
            format!("{:?}", Comparator::by_key(|value: &i32| -value)),
            "Comparator::Custom"
        );
    }
}
