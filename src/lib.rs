//! # persistent-sorted-set
//!
//! A persistent (immutable) sorted set for Rust with structural sharing.
//!
//! ## Overview
//!
//! [`SortedSet`] keeps its values unique and ordered under a [`Comparator`].
//! Every update returns a new version and leaves the old one intact; versions
//! share all the nodes an update did not touch, so keeping many of them is
//! cheap.
//!
//! - **Ordering**: natural order, a key extractor, or a two-argument comparison
//! - **Rank/select**: positional access and lookup in O(log N)
//! - **Ranges and slicing**: `above`, `below`, `between`, `take`, `slice`, ...
//! - **Set algebra**: union, intersection, difference and friends in O(N + M)
//! - **Kinds**: domain-specific set types that survive every derivation
//! - **Thread safety**: every version is `Send + Sync` and freely shareable
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for natural-order sets
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use persistent_sorted_set::prelude::*;
//!
//! let primes = sorted_set![7, 2, 5, 3];
//! let small = primes.below(&5);
//! assert_eq!(small.to_vec(), vec![2, 3]);
//! assert_eq!(primes.len(), 4);
//!
//! let odd = primes.filter(|prime| prime % 2 == 1);
//! assert_eq!(primes.difference(&odd).to_vec(), vec![2]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use persistent_sorted_set::prelude::*;
/// ```
pub mod prelude {
    pub use crate::comparator::Comparator;
    pub use crate::error::SortedSetError;
    pub use crate::sorted_set::{Plain, SetKind, SortedSet};
    pub use crate::{set_kind, sorted_set};
}

pub mod comparator;
pub mod error;
mod macros;
pub mod sorted_set;

pub use comparator::Comparator;
pub use error::SortedSetError;
pub use sorted_set::{IntoIter, Iter, Plain, SetKind, SortedSet};
