//! Immutable AVL tree engine.
//!
//! Every function in this module is pure: input nodes are never modified and
//! results share every untouched subtree with their inputs by reference.
//! Only the nodes on the path from the root to the point of change are
//! rebuilt (path copying).
//!
//! Each node caches its height (for balancing) and the size of its subtree
//! (for rank/select in O(log N)).
//!
//! # Invariants
//!
//! 1. `size == 1 + size(left) + size(right)`
//! 2. `height == 1 + max(height(left), height(right))`
//! 3. `|height(left) - height(right)| <= 1` at every node
//! 4. In-order values are strictly increasing under the comparator

use std::cmp::Ordering;
use std::sync::Arc;

use crate::comparator::Comparator;

/// An optional shared subtree.
pub(crate) type Link<T> = Option<Arc<Node<T>>>;

/// Internal node structure for the AVL tree.
pub(crate) struct Node<T> {
    pub(crate) value: T,
    pub(crate) left: Link<T>,
    pub(crate) right: Link<T>,
    height: u8,
    size: usize,
}

impl<T> Node<T> {
    /// Creates a node over two subtrees, computing the cached height and size.
    fn new(value: T, left: Link<T>, right: Link<T>) -> Arc<Self> {
        Arc::new(Self {
            height: height(&left).max(height(&right)) + 1,
            size: size(&left) + size(&right) + 1,
            value,
            left,
            right,
        })
    }

    fn leaf(value: T) -> Arc<Self> {
        Self::new(value, None, None)
    }

    /// Number of values in the subtree rooted here.
    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.size
    }
}

#[inline]
fn height<T>(link: &Link<T>) -> u8 {
    link.as_ref().map_or(0, |node| node.height)
}

/// Number of values in an optional subtree.
#[inline]
pub(crate) fn size<T>(link: &Link<T>) -> usize {
    link.as_ref().map_or(0, |node| node.size)
}

// =============================================================================
// Balancing
// =============================================================================

/// Builds a node whose subtrees differ in height by at most two, rotating
/// once or twice so that the result satisfies the AVL invariant.
fn balance<T: Clone>(value: T, left: Link<T>, right: Link<T>) -> Arc<Node<T>> {
    let left_height = height(&left);
    let right_height = height(&right);

    if left_height > right_height + 1 {
        if let Some(pivot) = &left {
            if height(&pivot.left) >= height(&pivot.right) {
                return Node::new(
                    pivot.value.clone(),
                    pivot.left.clone(),
                    Some(Node::new(value, pivot.right.clone(), right)),
                );
            }
            if let Some(inner) = &pivot.right {
                return Node::new(
                    inner.value.clone(),
                    Some(Node::new(
                        pivot.value.clone(),
                        pivot.left.clone(),
                        inner.left.clone(),
                    )),
                    Some(Node::new(value, inner.right.clone(), right)),
                );
            }
        }
    } else if right_height > left_height + 1
        && let Some(pivot) = &right
    {
        if height(&pivot.right) >= height(&pivot.left) {
            return Node::new(
                pivot.value.clone(),
                Some(Node::new(value, left, pivot.left.clone())),
                pivot.right.clone(),
            );
        }
        if let Some(inner) = &pivot.left {
            return Node::new(
                inner.value.clone(),
                Some(Node::new(value, left, inner.left.clone())),
                Some(Node::new(
                    pivot.value.clone(),
                    inner.right.clone(),
                    pivot.right.clone(),
                )),
            );
        }
    }

    Node::new(value, left, right)
}

/// Concatenates `left`, `value` and `right`, where every value of `left`
/// precedes `value` and every value of `right` follows it. The subtrees may
/// have any heights; the taller one is descended along its inner spine.
///
/// O(|height(left) - height(right)|)
pub(crate) fn join<T: Clone>(left: Link<T>, value: T, right: Link<T>) -> Arc<Node<T>> {
    let left_height = height(&left);
    let right_height = height(&right);

    if left_height > right_height + 1 {
        if let Some(node) = &left {
            let joined = join(node.right.clone(), value, right);
            return balance(node.value.clone(), node.left.clone(), Some(joined));
        }
    } else if right_height > left_height + 1
        && let Some(node) = &right
    {
        let joined = join(left, value, node.left.clone());
        return balance(node.value.clone(), Some(joined), node.right.clone());
    }

    Node::new(value, left, right)
}

/// Concatenates two trees where every value of `left` precedes every value
/// of `right`.
///
/// O(log N)
pub(crate) fn merge_disjoint<T: Clone>(left: &Link<T>, right: &Link<T>) -> Link<T> {
    match (left, right) {
        (None, _) => right.clone(),
        (_, None) => left.clone(),
        (Some(_), Some(right_node)) => {
            let (minimum, rest) = pop_first(right_node);
            Some(join(left.clone(), minimum, rest))
        }
    }
}

/// Splices two siblings of a removed node back together. Their heights differ
/// by at most one, so the replacement is taken from the taller side.
fn merge_siblings<T: Clone>(left: &Link<T>, right: &Link<T>) -> Link<T> {
    match (left, right) {
        (None, _) => right.clone(),
        (_, None) => left.clone(),
        (Some(left_node), Some(right_node)) => {
            if height(left) > height(right) {
                let (predecessor, rest) = pop_last(left_node);
                Some(balance(predecessor, rest, right.clone()))
            } else {
                let (successor, rest) = pop_first(right_node);
                Some(balance(successor, left.clone(), rest))
            }
        }
    }
}

fn pop_first<T: Clone>(node: &Node<T>) -> (T, Link<T>) {
    match &node.left {
        None => (node.value.clone(), node.right.clone()),
        Some(left) => {
            let (minimum, rest) = pop_first(left);
            (
                minimum,
                Some(balance(node.value.clone(), rest, node.right.clone())),
            )
        }
    }
}

fn pop_last<T: Clone>(node: &Node<T>) -> (T, Link<T>) {
    match &node.right {
        None => (node.value.clone(), node.left.clone()),
        Some(right) => {
            let (maximum, rest) = pop_last(right);
            (
                maximum,
                Some(balance(node.value.clone(), node.left.clone(), rest)),
            )
        }
    }
}

// =============================================================================
// Construction
// =============================================================================

/// Builds a perfectly balanced tree from values that are already strictly
/// increasing under the comparator the tree will be used with.
///
/// O(N)
pub(crate) fn from_sorted<T>(values: Vec<T>) -> Link<T> {
    let count = values.len();
    build_balanced(&mut values.into_iter(), count)
}

fn build_balanced<T, I: Iterator<Item = T>>(values: &mut I, count: usize) -> Link<T> {
    if count == 0 {
        return None;
    }
    let left_count = count / 2;
    let left = build_balanced(values, left_count);
    let Some(value) = values.next() else {
        return left;
    };
    let right = build_balanced(values, count - left_count - 1);
    Some(Node::new(value, left, right))
}

// =============================================================================
// Insert / Remove
// =============================================================================

/// Inserts `value`, replacing a comparator-equivalent occupant.
///
/// Returns the new root and `true` if the value was not present before.
pub(crate) fn insert<T: Clone>(
    link: &Link<T>,
    value: T,
    comparator: &Comparator<T>,
) -> (Arc<Node<T>>, bool) {
    let Some(node) = link else {
        return (Node::leaf(value), true);
    };

    match comparator.compare(&value, &node.value) {
        Ordering::Less => {
            let (new_left, inserted) = insert(&node.left, value, comparator);
            (
                balance(node.value.clone(), Some(new_left), node.right.clone()),
                inserted,
            )
        }
        Ordering::Greater => {
            let (new_right, inserted) = insert(&node.right, value, comparator);
            (
                balance(node.value.clone(), node.left.clone(), Some(new_right)),
                inserted,
            )
        }
        Ordering::Equal => (
            Node::new(value, node.left.clone(), node.right.clone()),
            false,
        ),
    }
}

/// Removes the value equivalent to `value`.
///
/// Returns the new root and `true` if something was removed. When nothing
/// matches, the returned link is the input link itself.
pub(crate) fn remove<T: Clone>(
    link: &Link<T>,
    value: &T,
    comparator: &Comparator<T>,
) -> (Link<T>, bool) {
    let Some(node) = link else {
        return (None, false);
    };

    match comparator.compare(value, &node.value) {
        Ordering::Less => {
            let (new_left, removed) = remove(&node.left, value, comparator);
            if !removed {
                return (link.clone(), false);
            }
            (
                Some(balance(node.value.clone(), new_left, node.right.clone())),
                true,
            )
        }
        Ordering::Greater => {
            let (new_right, removed) = remove(&node.right, value, comparator);
            if !removed {
                return (link.clone(), false);
            }
            (
                Some(balance(node.value.clone(), node.left.clone(), new_right)),
                true,
            )
        }
        Ordering::Equal => (merge_siblings(&node.left, &node.right), true),
    }
}

/// Removes the value at in-order position `index`.
///
/// Returns the input link itself and `false` when `index` is out of bounds.
pub(crate) fn remove_at<T: Clone>(link: &Link<T>, index: usize) -> (Link<T>, bool) {
    let Some(node) = link else {
        return (None, false);
    };

    let left_size = size(&node.left);
    match index.cmp(&left_size) {
        Ordering::Less => {
            let (new_left, removed) = remove_at(&node.left, index);
            if !removed {
                return (link.clone(), false);
            }
            (
                Some(balance(node.value.clone(), new_left, node.right.clone())),
                true,
            )
        }
        Ordering::Greater => {
            let (new_right, removed) = remove_at(&node.right, index - left_size - 1);
            if !removed {
                return (link.clone(), false);
            }
            (
                Some(balance(node.value.clone(), node.left.clone(), new_right)),
                true,
            )
        }
        Ordering::Equal => (merge_siblings(&node.left, &node.right), true),
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Returns the stored value equivalent to `value`.
pub(crate) fn find<'a, T>(
    link: &'a Link<T>,
    value: &T,
    comparator: &Comparator<T>,
) -> Option<&'a T> {
    let mut current = link.as_deref();
    while let Some(node) = current {
        match comparator.compare(value, &node.value) {
            Ordering::Less => current = node.left.as_deref(),
            Ordering::Greater => current = node.right.as_deref(),
            Ordering::Equal => return Some(&node.value),
        }
    }
    None
}

/// Returns the 0-based in-order position of the value equivalent to `value`.
pub(crate) fn rank<T>(link: &Link<T>, value: &T, comparator: &Comparator<T>) -> Option<usize> {
    let mut current = link.as_deref();
    let mut offset = 0;
    while let Some(node) = current {
        match comparator.compare(value, &node.value) {
            Ordering::Less => current = node.left.as_deref(),
            Ordering::Greater => {
                offset += size(&node.left) + 1;
                current = node.right.as_deref();
            }
            Ordering::Equal => return Some(offset + size(&node.left)),
        }
    }
    None
}

/// Returns the value at 0-based in-order position `index`.
pub(crate) fn select<T>(link: &Link<T>, mut index: usize) -> Option<&T> {
    let mut current = link.as_deref();
    while let Some(node) = current {
        let left_size = size(&node.left);
        match index.cmp(&left_size) {
            Ordering::Less => current = node.left.as_deref(),
            Ordering::Greater => {
                index -= left_size + 1;
                current = node.right.as_deref();
            }
            Ordering::Equal => return Some(&node.value),
        }
    }
    None
}

pub(crate) fn first<T>(link: &Link<T>) -> Option<&T> {
    let mut node = link.as_deref()?;
    while let Some(left) = node.left.as_deref() {
        node = left;
    }
    Some(&node.value)
}

pub(crate) fn last<T>(link: &Link<T>) -> Option<&T> {
    let mut node = link.as_deref()?;
    while let Some(right) = node.right.as_deref() {
        node = right;
    }
    Some(&node.value)
}

// =============================================================================
// Split
// =============================================================================

/// Splits into the values less than `value`, the stored value equivalent to
/// `value` (if any) and the values greater than `value`.
///
/// O(log N)
pub(crate) fn split_three<T: Clone>(
    link: &Link<T>,
    value: &T,
    comparator: &Comparator<T>,
) -> (Link<T>, Option<T>, Link<T>) {
    let Some(node) = link else {
        return (None, None, None);
    };

    match comparator.compare(value, &node.value) {
        Ordering::Equal => (
            node.left.clone(),
            Some(node.value.clone()),
            node.right.clone(),
        ),
        Ordering::Less => {
            let (less, found, greater) = split_three(&node.left, value, comparator);
            let greater = join(greater, node.value.clone(), node.right.clone());
            (less, found, Some(greater))
        }
        Ordering::Greater => {
            let (less, found, greater) = split_three(&node.right, value, comparator);
            let less = join(node.left.clone(), node.value.clone(), less);
            (Some(less), found, greater)
        }
    }
}

/// Partitions into the values `< value` and the values `>= value`.
///
/// O(log N)
pub(crate) fn split<T: Clone>(
    link: &Link<T>,
    value: &T,
    comparator: &Comparator<T>,
) -> (Link<T>, Link<T>) {
    let (less, found, greater) = split_three(link, value, comparator);
    match found {
        Some(found) => (less, Some(join(None, found, greater))),
        None => (less, greater),
    }
}

/// Partitions into the first `index` values and the rest.
///
/// O(log N)
pub(crate) fn split_at<T: Clone>(link: &Link<T>, index: usize) -> (Link<T>, Link<T>) {
    let Some(node) = link else {
        return (None, None);
    };
    if index == 0 {
        return (None, link.clone());
    }
    if index >= node.size {
        return (link.clone(), None);
    }

    let left_size = size(&node.left);
    if index <= left_size {
        let (head, tail) = split_at(&node.left, index);
        (
            head,
            Some(join(tail, node.value.clone(), node.right.clone())),
        )
    } else {
        let (head, tail) = split_at(&node.right, index - left_size - 1);
        (
            Some(join(node.left.clone(), node.value.clone(), head)),
            tail,
        )
    }
}

// =============================================================================
// Invariant Checking
// =============================================================================

/// Verifies every structural invariant and returns the height of the tree.
#[cfg(test)]
pub(crate) fn check_invariants<T>(link: &Link<T>, comparator: &Comparator<T>) -> u8 {
    let Some(node) = link else {
        return 0;
    };

    let left_height = check_invariants(&node.left, comparator);
    let right_height = check_invariants(&node.right, comparator);

    assert!(left_height.abs_diff(right_height) <= 1, "AVL balance violated");
    assert_eq!(node.height, left_height.max(right_height) + 1, "stale height");
    assert_eq!(
        node.size,
        size(&node.left) + size(&node.right) + 1,
        "stale size"
    );
    if let Some(maximum) = last(&node.left) {
        assert_eq!(comparator.compare(maximum, &node.value), Ordering::Less);
    }
    if let Some(minimum) = first(&node.right) {
        assert_eq!(comparator.compare(&node.value, minimum), Ordering::Less);
    }

    node.height
}
