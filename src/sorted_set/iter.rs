//! In-order traversal over a sorted set snapshot.
//!
//! Nodes carry no parent links (a subtree may be shared by many versions),
//! so traversal keeps its own path. Each iterator holds two explicit stacks,
//! one for the front and one for the back, and a count of values still to be
//! produced so the two ends never cross. No intermediate array is built.

use smallvec::SmallVec;
use std::iter::FusedIterator;
use std::sync::Arc;

use super::node::{Link, Node};

/// Inline stack capacity. An AVL tree of height 48 holds far more values than
/// can be addressed, so the stacks never spill in practice.
const STACK_CAPACITY: usize = 48;

/// A borrowing iterator over the values of a [`SortedSet`] in order.
///
/// Created by [`SortedSet::iter`]. Use [`Iterator::rev`] for descending order.
///
/// [`SortedSet`]: super::SortedSet
/// [`SortedSet::iter`]: super::SortedSet::iter
pub struct Iter<'a, T> {
    front: SmallVec<[&'a Node<T>; STACK_CAPACITY]>,
    back: SmallVec<[&'a Node<T>; STACK_CAPACITY]>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(root: &'a Link<T>) -> Self {
        let root = root.as_deref();
        let mut iterator = Self {
            front: SmallVec::new(),
            back: SmallVec::new(),
            remaining: root.map_or(0, Node::len),
        };
        iterator.descend_left(root);
        iterator.descend_right(root);
        iterator
    }

    fn descend_left(&mut self, mut node: Option<&'a Node<T>>) {
        while let Some(current) = node {
            self.front.push(current);
            node = current.left.as_deref();
        }
    }

    fn descend_right(&mut self, mut node: Option<&'a Node<T>>) {
        while let Some(current) = node {
            self.back.push(current);
            node = current.right.as_deref();
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front.pop()?;
        self.descend_left(node.right.as_deref());
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back.pop()?;
        self.descend_right(node.left.as_deref());
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            front: self.front.clone(),
            back: self.back.clone(),
            remaining: self.remaining,
        }
    }
}

/// An owning iterator over the values of a [`SortedSet`] in order.
///
/// Keeps the traversed nodes alive through their reference counts and clones
/// each value as it is produced.
///
/// [`SortedSet`]: super::SortedSet
pub struct IntoIter<T> {
    front: SmallVec<[Arc<Node<T>>; STACK_CAPACITY]>,
    back: SmallVec<[Arc<Node<T>>; STACK_CAPACITY]>,
    remaining: usize,
}

impl<T> IntoIter<T> {
    pub(crate) fn new(root: Link<T>) -> Self {
        let mut iterator = Self {
            front: SmallVec::new(),
            back: SmallVec::new(),
            remaining: root.as_deref().map_or(0, Node::len),
        };
        iterator.descend_left(root.clone());
        iterator.descend_right(root);
        iterator
    }

    fn descend_left(&mut self, mut node: Link<T>) {
        while let Some(current) = node {
            node = current.left.clone();
            self.front.push(current);
        }
    }

    fn descend_right(&mut self, mut node: Link<T>) {
        while let Some(current) = node {
            node = current.right.clone();
            self.back.push(current);
        }
    }
}

impl<T: Clone> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front.pop()?;
        self.descend_left(node.right.clone());
        self.remaining -= 1;
        Some(node.value.clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Clone> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back.pop()?;
        self.descend_right(node.left.clone());
        self.remaining -= 1;
        Some(node.value.clone())
    }
}

impl<T: Clone> ExactSizeIterator for IntoIter<T> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<T: Clone> FusedIterator for IntoIter<T> {}
