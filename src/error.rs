//! Error types for sorted set operations.
//!
//! Only misuse of the API contract is reported as an error. A missing value,
//! an empty result or an update that changes nothing are expressed through
//! `Option`, `bool` or by returning the receiver itself.

use std::fmt;

/// Represents errors that can occur when working with a [`SortedSet`].
///
/// # Examples
///
/// ```rust
/// use persistent_sorted_set::{SortedSet, SortedSetError};
///
/// let set: SortedSet<i32> = [5, 10, 15].into_iter().collect();
/// assert_eq!(
///     set.fetch(3),
///     Err(SortedSetError::IndexOutOfRange { index: 3, length: 3 })
/// );
/// ```
///
/// [`SortedSet`]: crate::SortedSet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortedSetError {
    /// An index was outside `-length..length` and no fallback was supplied.
    IndexOutOfRange {
        /// The index as passed by the caller.
        index: isize,
        /// The number of elements in the set at the time of the call.
        length: usize,
    },
    /// The set carries a custom comparator, which cannot be serialized.
    CustomComparator,
    /// Input handed to a pre-sorted constructor was not strictly ascending.
    UnsortedInput {
        /// Position of the first element that is not greater than its predecessor.
        position: usize,
    },
}

impl fmt::Display for SortedSetError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, length } => write!(
                formatter,
                "index {index} outside of sorted set bounds (length {length})"
            ),
            Self::CustomComparator => {
                write!(formatter, "can't dump a sorted set with a custom sort order")
            }
            Self::UnsortedInput { position } => write!(
                formatter,
                "input is not strictly ascending at position {position}"
            ),
        }
    }
}

impl std::error::Error for SortedSetError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        SortedSetError::IndexOutOfRange { index: -4, length: 3 },
        "index -4 outside of sorted set bounds (length 3)"
    )]
    #[case(
        SortedSetError::CustomComparator,
        "can't dump a sorted set with a custom sort order"
    )]
    #[case(
        SortedSetError::UnsortedInput { position: 2 },
        "input is not strictly ascending at position 2"
    )]
    fn test_error_display(#[case] error: SortedSetError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn test_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&SortedSetError::CustomComparator);
    }
}
