#![cfg(feature = "serde")]

//! Integration tests for serde support.
//!
//! These tests verify that natural-order sets round trip through JSON and
//! that sets with a custom comparator refuse to serialize.

use persistent_sorted_set::{SortedSet, set_kind, sorted_set};
use rstest::rstest;

set_kind!(Snapshot);

// =============================================================================
// Round Trip Tests
// =============================================================================

#[rstest]
fn test_json_roundtrip() {
    let set = sorted_set![5, 10, 15];
    let json = serde_json::to_string(&set).unwrap();
    assert_eq!(json, "[5,10,15]");

    let restored: SortedSet<i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, set);
    assert!(restored.comparator().is_natural());
}

#[rstest]
fn test_empty_roundtrip() {
    let set: SortedSet<String> = SortedSet::new();
    let json = serde_json::to_string(&set).unwrap();
    assert_eq!(json, "[]");

    let restored: SortedSet<String> = serde_json::from_str(&json).unwrap();
    assert!(restored.ptr_eq(&SortedSet::new()));
}

#[rstest]
fn test_roundtrip_keeps_kind() {
    let set: SortedSet<String, Snapshot> = ["b", "a"].into_iter().map(String::from).collect();
    let json = serde_json::to_string(&set).unwrap();
    let restored: SortedSet<String, Snapshot> = serde_json::from_str(&json).unwrap();
    assert_eq!(format!("{restored:?}"), r#"Snapshot["a", "b"]"#);
}

#[rstest]
fn test_deserialize_unordered_input() {
    let restored: SortedSet<i32> = serde_json::from_str("[15, 5, 10, 5]").unwrap();
    assert_eq!(restored.to_vec(), vec![5, 10, 15]);
}

#[rstest]
fn test_deserialize_rejects_non_sequence() {
    let result: Result<SortedSet<i32>, _> = serde_json::from_str(r#"{"a": 1}"#);
    assert!(result.is_err());
}

// =============================================================================
// Custom Comparator Tests
// =============================================================================

#[rstest]
fn test_custom_comparator_is_refused() {
    let set = SortedSet::from_iter_by_key([5, 10, 15], |value: &i32| -value);
    let error = serde_json::to_string(&set).unwrap_err();
    assert_eq!(
        error.to_string(),
        "can't dump a sorted set with a custom sort order"
    );
}

#[rstest]
fn test_custom_comparator_writes_nothing() {
    let set = SortedSet::from_iter_by([1, 2], |left: &i32, right: &i32| right.cmp(left));
    let mut buffer = Vec::new();
    assert!(serde_json::to_writer(&mut buffer, &set).is_err());
    assert!(buffer.is_empty());
}

#[rstest]
fn test_sorting_back_to_natural_order_allows_serialization() {
    let set = SortedSet::from_iter_by([1, 2], |left: &i32, right: &i32| right.cmp(left));
    assert_eq!(serde_json::to_string(&set.sort()).unwrap(), "[1,2]");
}
