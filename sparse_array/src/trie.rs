//! Unbalanced 16-way trie over absolute `u64` indices.
use std::{fmt, mem::take};

use fractal_util::{
    fmt::fmt_indexed,
    indexed::Iter,
    nibble::{
        common_shift, diff_shift, from_high_bits, high_bits, low_mask, nibble, FANOUT, NIBBLE_BITS,
    },
    IndexedArray,
};

/// A sparse array storing each element together with its absolute index.
///
/// Tries only branch where indices diverge: a node with child shift `s` exists only when at
/// least two of its children are non-empty, so the depth is bounded by the number of nibbles
/// in which the stored indices differ, and at most 16.
///
/// ```
/// use sparse_array::SparseArray;
///
/// let array = SparseArray::new().set(3, 'a').set(1 << 50, 'b');
/// assert_eq!(array.ceiling(4), Some((1 << 50, &'b')));
/// assert_eq!(array.len(), 2);
/// ```
#[derive(Clone)]
pub enum SparseArray<E> {
    /// No elements.
    Empty,
    /// A single element.
    Unary {
        /// Index of the element.
        index: u64,
        /// The element.
        element: E,
    },
    /// Two or more elements.
    Trie(Box<Trie<E>>),
}

/// Inner trie node with [`FANOUT`] children, each itself a [`SparseArray`].
#[derive(Clone)]
pub struct Trie<E> {
    shift: u32,
    prefix: u64,
    count: u8,
    len: usize,
    children: [SparseArray<E>; FANOUT],
}

impl<E> Default for SparseArray<E> {
    fn default() -> Self {
        SparseArray::Empty
    }
}

impl<E: fmt::Debug> fmt::Debug for SparseArray<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&fmt_indexed(|| self.iter()), f)
    }
}

impl<E> SparseArray<E> {
    /// Returns an empty array.
    pub const fn new() -> Self {
        SparseArray::Empty
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        match self {
            SparseArray::Empty => 0,
            SparseArray::Unary { .. } => 1,
            SparseArray::Trie(trie) => trie.len,
        }
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        matches!(self, SparseArray::Empty)
    }

    /// Returns the element at `index`, if any.
    pub fn get(&self, index: u64) -> Option<&E> {
        let mut node = self;
        loop {
            match node {
                SparseArray::Empty => return None,
                SparseArray::Unary { index: found, element } => {
                    return (*found == index).then_some(element)
                }
                SparseArray::Trie(trie) => {
                    if !trie.contains(index) {
                        return None;
                    }
                    node = &trie.children[nibble(index, trie.shift)];
                }
            }
        }
    }

    /// Returns a mutable reference to the element at `index`, if any.
    pub fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        match self {
            SparseArray::Empty => None,
            SparseArray::Unary { index: found, element } => (*found == index).then_some(element),
            SparseArray::Trie(trie) => {
                if !trie.contains(index) {
                    return None;
                }
                trie.children[nibble(index, trie.shift)].get_mut(index)
            }
        }
    }

    /// Stores `element` at `index`, returning the updated array.
    #[must_use]
    pub fn set(self, index: u64, element: E) -> Self {
        self.put(index, Some(element)).0
    }

    /// Stores `element` at `index` or clears `index` when `element` is `None`.
    #[must_use]
    pub fn set_opt(self, index: u64, element: Option<E>) -> Self {
        self.put(index, element).0
    }

    /// Removes the element at `index`, returning the updated array.
    #[must_use]
    pub fn clear(self, index: u64) -> Self {
        self.put(index, None).0
    }

    /// Stores `element` at `index` in place, returning the element previously stored there.
    pub fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        let (array, previous) = take(self).put(index, element);
        *self = array;
        previous
    }

    /// Removes and returns the element at `index` in place.
    pub fn take(&mut self, index: u64) -> Option<E> {
        self.replace(index, None)
    }

    fn put(self, index: u64, element: Option<E>) -> (Self, Option<E>) {
        match (self, element) {
            (SparseArray::Empty, None) => (SparseArray::Empty, None),
            (SparseArray::Empty, Some(element)) => (SparseArray::Unary { index, element }, None),
            (SparseArray::Unary { index: found, element }, None) => {
                if found == index {
                    (SparseArray::Empty, Some(element))
                } else {
                    (SparseArray::Unary { index: found, element }, None)
                }
            }
            (SparseArray::Unary { index: found, element: previous }, Some(element)) => {
                if found == index {
                    (SparseArray::Unary { index, element }, Some(previous))
                } else {
                    let shift = common_shift(found, index);
                    let mut trie = Trie::empty(shift, index);
                    trie.children[nibble(found, shift)] = SparseArray::Unary {
                        index: found,
                        element: previous,
                    };
                    trie.children[nibble(index, shift)] = SparseArray::Unary { index, element };
                    trie.count = 2;
                    trie.len = 2;
                    (SparseArray::Trie(trie), None)
                }
            }
            (SparseArray::Trie(mut trie), element) => {
                if trie.contains(index) {
                    let previous = trie.put(index, element);
                    (trie.normalize(), previous)
                } else if let Some(element) = element {
                    let base = trie.base();
                    let shift = diff_shift(base ^ index);
                    log::trace!("wrapping trie with shift {} into shift {shift}", trie.shift);
                    let len = trie.len;
                    let mut outer = Trie::empty(shift, index);
                    outer.children[nibble(base, shift)] = SparseArray::Trie(trie);
                    outer.children[nibble(index, shift)] = SparseArray::Unary { index, element };
                    outer.count = 2;
                    outer.len = len + 1;
                    (SparseArray::Trie(outer), None)
                } else {
                    (SparseArray::Trie(trie), None)
                }
            }
        }
    }

    /// Returns the element with the smallest index `>= min`, together with its index.
    pub fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        match self {
            SparseArray::Empty => None,
            SparseArray::Unary { index, element } => (*index >= min).then_some((*index, element)),
            SparseArray::Trie(trie) => trie.ceiling(min),
        }
    }

    /// Returns the element with the largest index `<= max`, together with its index.
    pub fn floor(&self, max: u64) -> Option<(u64, &E)> {
        match self {
            SparseArray::Empty => None,
            SparseArray::Unary { index, element } => (*index <= max).then_some((*index, element)),
            SparseArray::Trie(trie) => trie.floor(max),
        }
    }

    /// Returns the element with the smallest index.
    pub fn first(&self) -> Option<(u64, &E)> {
        self.ceiling(0)
    }

    /// Returns the element with the largest index.
    pub fn last(&self) -> Option<(u64, &E)> {
        self.floor(u64::MAX)
    }

    /// Returns an iterator over all `(index, element)` pairs in ascending index order.
    pub fn iter(&self) -> Iter<'_, Self, E> {
        Iter::new(self, 0, u64::MAX)
    }

    /// Returns an iterator over the `(index, element)` pairs with indices in `lo..=hi`.
    pub fn range(&self, lo: u64, hi: u64) -> Iter<'_, Self, E> {
        Iter::new(self, lo, hi)
    }

    /// Returns the number of trie levels, `0` for an empty array.
    pub fn depth(&self) -> usize {
        match self {
            SparseArray::Empty => 0,
            SparseArray::Unary { .. } => 1,
            SparseArray::Trie(trie) => 1 + trie.children.iter().map(Self::depth).max().unwrap_or(0),
        }
    }

    /// Verifies the internal invariants, panicking when one is violated.
    ///
    /// Returns the number of elements.
    pub fn check(&self) -> usize {
        match self {
            SparseArray::Empty => 0,
            SparseArray::Unary { .. } => 1,
            SparseArray::Trie(trie) => trie.check(),
        }
    }
}

impl<E> Trie<E> {
    fn empty(shift: u32, index: u64) -> Box<Self> {
        Box::new(Trie {
            shift,
            prefix: high_bits(index, shift + NIBBLE_BITS),
            count: 0,
            len: 0,
            children: Default::default(),
        })
    }

    fn base(&self) -> u64 {
        from_high_bits(self.prefix, self.shift + NIBBLE_BITS)
    }

    fn span_mask(&self) -> u64 {
        low_mask(self.shift + NIBBLE_BITS)
    }

    fn contains(&self, index: u64) -> bool {
        high_bits(index, self.shift + NIBBLE_BITS) == self.prefix
    }

    fn put(&mut self, index: u64, element: Option<E>) -> Option<E> {
        let child = nibble(index, self.shift);
        let node = take(&mut self.children[child]);
        let (was_empty, added) = (node.is_empty(), element.is_some());
        let (node, previous) = node.put(index, element);
        self.count = self.count + was_empty as u8 - node.is_empty() as u8;
        self.len = self.len + added as usize - previous.is_some() as usize;
        self.children[child] = node;
        previous
    }

    /// Returns the sole child of a trie left with one non-empty child, otherwise the trie.
    fn normalize(mut self: Box<Self>) -> SparseArray<E> {
        match self.count {
            0 => SparseArray::Empty,
            1 => {
                let Some(child) = self.children.iter_mut().find(|node| !node.is_empty()) else {
                    unreachable!("trie child count out of sync")
                };
                log::trace!("collapsing trie with shift {}", self.shift);
                take(child)
            }
            _ => SparseArray::Trie(self),
        }
    }

    fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        let base = self.base();
        if min > base | self.span_mask() {
            return None;
        }
        let start = if min < base { 0 } else { nibble(min, self.shift) };
        self.children[start..]
            .iter()
            .find_map(|node| node.ceiling(min))
    }

    fn floor(&self, max: u64) -> Option<(u64, &E)> {
        let base = self.base();
        if max < base {
            return None;
        }
        let end = if max > base | self.span_mask() {
            FANOUT - 1
        } else {
            nibble(max, self.shift)
        };
        self.children[..=end]
            .iter()
            .rev()
            .find_map(|node| node.floor(max))
    }

    fn check(&self) -> usize {
        assert!(self.shift % NIBBLE_BITS == 0 && self.shift < u64::BITS);
        let non_empty = self.children.iter().filter(|node| !node.is_empty()).count();
        assert_eq!(non_empty, self.count as usize, "trie child count out of sync");
        assert!(non_empty >= 2, "trie with {non_empty} children should have collapsed");
        let mut len = 0;
        for (child, node) in self.children.iter().enumerate() {
            len += node.check();
            for (index, _) in node.iter() {
                assert!(self.contains(index), "index {index:#x} outside of its trie");
                assert_eq!(nibble(index, self.shift), child, "index {index:#x} in the wrong child");
            }
        }
        assert_eq!(len, self.len, "trie length out of sync");
        len
    }
}

impl<E> FromIterator<(u64, E)> for SparseArray<E> {
    fn from_iter<T: IntoIterator<Item = (u64, E)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(SparseArray::new(), |array, (index, element)| array.set(index, element))
    }
}

impl<E> IndexedArray<E> for SparseArray<E> {
    fn get(&self, index: u64) -> Option<&E> {
        SparseArray::get(self, index)
    }

    fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        SparseArray::get_mut(self, index)
    }

    fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        SparseArray::replace(self, index, element)
    }

    fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        SparseArray::ceiling(self, min)
    }

    fn floor(&self, max: u64) -> Option<(u64, &E)> {
        SparseArray::floor(self, max)
    }

    fn len(&self) -> usize {
        SparseArray::len(self)
    }

    fn is_empty(&self) -> bool {
        SparseArray::is_empty(self)
    }
}
