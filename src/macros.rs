//! Literal construction macro.

/// Creates a natural-order [`SortedSet`](crate::SortedSet) from a list of
/// values.
///
/// Duplicates collapse into one value; an empty invocation is the canonical
/// empty set.
///
/// # Example
///
/// ```
/// use persistent_sorted_set::{SortedSet, sorted_set};
///
/// let set = sorted_set![3, 1, 2, 1];
/// assert_eq!(set.to_vec(), vec![1, 2, 3]);
///
/// let empty: SortedSet<i32> = sorted_set![];
/// assert!(empty.ptr_eq(&SortedSet::new()));
/// ```
#[macro_export]
macro_rules! sorted_set {
    () => {
        $crate::SortedSet::new()
    };
    ($($value:expr),+ $(,)?) => {
        <$crate::SortedSet<_> as ::core::iter::FromIterator<_>>::from_iter([$($value),+])
    };
}
