//! Fixed-capacity binary heap over borrowed entries.
//!
//! [`BoundedHeap`] keeps the top-K candidates of a scored stream without
//! copying them. It stores `&T` only and orders entries with a caller
//! supplied comparator; the entry that compares least sits at the root.
//!
//! Two admission modes exist:
//!
//! - [`insert`](BoundedHeap::insert) fills the heap and silently drops
//!   anything past capacity;
//! - [`offer`](BoundedHeap::offer) keeps the K greatest entries seen so far
//!   by evicting the root when a better entry arrives.
//!
//! # Example
//!
//! ```
//! use watchwire::heap::select_top_k;
//!
//! let scores = [5, 1, 9, 3];
//! let best = select_top_k(&scores, 3, |a: &i32, b: &i32| a.cmp(b));
//! assert_eq!(best, vec![&9, &5, &3]);
//! ```

use std::cmp::Ordering;
use std::fmt;

/// Min-heap of `&'a T` with a capacity fixed at construction.
///
/// For every parent/child pair `compare(parent, child) != Ordering::Greater`.
/// Storage is allocated once; the heap never grows.
pub struct BoundedHeap<'a, T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    entries: Vec<&'a T>,
    capacity: usize,
    compare: F,
}

impl<'a, T, F> BoundedHeap<'a, T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Create an empty heap holding at most `capacity` entries.
    pub fn new(capacity: usize, compare: F) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            compare,
        }
    }

    /// Number of entries held.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Least entry, without removing it.
    pub fn peek(&self) -> Option<&'a T> {
        self.entries.first().copied()
    }

    /// Add `value`. Returns `false` and drops it if the heap is full.
    pub fn insert(&mut self, value: &'a T) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(value);
        self.sift_up(self.entries.len() - 1);
        true
    }

    /// Remove and return the least entry.
    pub fn extract(&mut self) -> Option<&'a T> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let top = self.entries.pop();
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        top
    }

    /// Top-K admission.
    ///
    /// Below capacity this is [`insert`](Self::insert). At capacity, a
    /// `value` ordering strictly after the root replaces it. Returns the
    /// entry that fell out of the heap: the old root, `value` itself when
    /// it was not admitted, or `None` when nothing was displaced.
    pub fn offer(&mut self, value: &'a T) -> Option<&'a T> {
        if !self.is_full() {
            self.insert(value);
            return None;
        }
        match self.entries.first().copied() {
            Some(root) if (self.compare)(value, root) == Ordering::Greater => {
                self.entries[0] = value;
                self.sift_down(0);
                Some(root)
            }
            _ => Some(value),
        }
    }

    /// Drain the heap, least entry first.
    pub fn into_sorted_vec(mut self) -> Vec<&'a T> {
        let mut out = Vec::with_capacity(self.entries.len());
        while let Some(entry) = self.extract() {
            out.push(entry);
        }
        out
    }

    #[inline]
    fn before(&self, a: usize, b: usize) -> bool {
        (self.compare)(self.entries[a], self.entries[b]) == Ordering::Less
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.before(idx, parent) {
                break;
            }
            self.entries.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.before(right, left) {
                right
            } else {
                left
            };
            if !self.before(child, idx) {
                break;
            }
            self.entries.swap(idx, child);
            idx = child;
        }
    }
}

impl<T, F> fmt::Debug for BoundedHeap<'_, T, F>
where
    T: fmt::Debug,
    F: Fn(&T, &T) -> Ordering,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedHeap")
            .field("entries", &self.entries)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// The `k` greatest items under `compare`, greatest first.
pub fn select_top_k<'a, T, I, F>(items: I, k: usize, compare: F) -> Vec<&'a T>
where
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T, &T) -> Ordering,
{
    let mut heap = BoundedHeap::new(k, compare);
    for item in items {
        heap.offer(item);
    }
    let mut best = heap.into_sorted_vec();
    best.reverse();
    best
}
