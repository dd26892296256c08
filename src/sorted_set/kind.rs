//! Derived container kinds.
//!
//! A [`SortedSet`] carries a kind marker `K` in its type. Every operation
//! that derives a new set from an existing one returns a set of the same
//! kind, so a domain-specific set type survives `filter`, `map`, set algebra
//! and the rest without ever being widened to the plain kind.
//!
//! Sets of different kinds never compare equal, even when they hold the
//! same values: `==` only type-checks within one kind, and
//! [`SortedSet::collection_eq`] returns `false` across kinds.
//!
//! # Examples
//!
//! ```rust
//! use persistent_sorted_set::{SortedSet, set_kind};
//!
//! set_kind! {
//!     /// Scores of a single round.
//!     pub Scores
//! }
//!
//! let scores: SortedSet<u32, Scores> = [30, 10, 20].into_iter().collect();
//! let high: SortedSet<u32, Scores> = scores.filter(|score| *score >= 20);
//! assert_eq!(format!("{high:?}"), "Scores[20, 30]");
//! ```
//!
//! [`SortedSet`]: super::SortedSet
//! [`SortedSet::collection_eq`]: super::SortedSet::collection_eq

/// Marker trait for sorted set kinds.
pub trait SetKind: 'static {
    /// Name used when formatting a set of this kind with `{:?}`.
    const NAME: &'static str;
}

/// The default kind of [`SortedSet`](super::SortedSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plain {}

impl SetKind for Plain {
    const NAME: &'static str = "SortedSet";
}

/// Declares a new [`SetKind`].
///
/// The kind is an uninhabited enum; it only exists at the type level.
///
/// # Examples
///
/// ```rust
/// use persistent_sorted_set::{SetKind, set_kind};
///
/// set_kind!(pub Evens);
/// assert_eq!(Evens::NAME, "Evens");
/// ```
#[macro_export]
macro_rules! set_kind {
    ($(#[$meta:meta])* $visibility:vis $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $visibility enum $name {}

        impl $crate::SetKind for $name {
            const NAME: &'static str = stringify!($name);
        }
    };
}
