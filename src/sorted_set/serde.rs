//! Serde support.
//!
//! A set is written as a sequence of its values in order, preceded by its
//! length where the format records one. No comparator is written, so only
//! natural-order sets can be serialized; a set with a custom comparator
//! fails before anything is emitted. Deserialization always builds a
//! natural-order set.

use std::fmt;
use std::marker::PhantomData;

use ::serde::de::{SeqAccess, Visitor};
use ::serde::ser::{Error as _, SerializeSeq};
use ::serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{SetKind, SortedSet};
use crate::comparator::Comparator;
use crate::error::SortedSetError;

impl<T: Serialize, K: SetKind> Serialize for SortedSet<T, K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if !self.comparator.is_natural() {
            tracing::debug!(
                kind = K::NAME,
                length = self.len(),
                "refusing to serialize a sorted set with a custom comparator"
            );
            return Err(S::Error::custom(SortedSetError::CustomComparator));
        }

        let mut sequence = serializer.serialize_seq(Some(self.len()))?;
        for value in self {
            sequence.serialize_element(value)?;
        }
        sequence.end()
    }
}

struct SortedSetVisitor<T, K> {
    marker: PhantomData<fn() -> SortedSet<T, K>>,
}

impl<T, K> SortedSetVisitor<T, K> {
    const fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<'de, T, K> Visitor<'de> for SortedSetVisitor<T, K>
where
    T: Deserialize<'de> + Ord,
    K: SetKind,
{
    type Value = SortedSet<T, K>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut values = Vec::with_capacity(access.size_hint().unwrap_or(0).min(4096));
        while let Some(value) = access.next_element()? {
            values.push(value);
        }
        Ok(SortedSet::build_with(values, Comparator::natural()))
    }
}

impl<'de, T, K> Deserialize<'de> for SortedSet<T, K>
where
    T: Deserialize<'de> + Ord,
    K: SetKind,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(SortedSetVisitor::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_serialize_natural_order() {
        let set: SortedSet<i32> = [15, 5, 10].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[5,10,15]");
    }

    #[rstest]
    fn test_serialize_custom_comparator_fails() {
        let set = SortedSet::from_iter_by([1, 2], |left: &i32, right: &i32| right.cmp(left));
        let error = serde_json::to_string(&set).unwrap_err();
        assert!(error.to_string().contains("custom sort order"));
    }

    #[rstest]
    fn test_deserialize_sorts_and_deduplicates() {
        let set: SortedSet<i32> = serde_json::from_str("[3, 1, 2, 1]").unwrap();
        assert_eq!(set.to_vec(), vec![1, 2, 3]);
        assert!(set.comparator().is_natural());
    }

    #[rstest]
    fn test_deserialize_empty_is_canonical() {
        let set: SortedSet<i32> = serde_json::from_str("[]").unwrap();
        assert!(set.ptr_eq(&SortedSet::new()));
    }
}
