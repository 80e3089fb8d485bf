//! Two-level sparse array splitting each index into a high and a low half.
use fractal_util::{
    indexed::Iter,
    nibble::{low_mask, INDEX_BITS},
    IndexedArray,
};

use crate::{compact::CompactSparseArray, trie::SparseArray};

/// A sparse array storing the high half of each index in an outer [`SparseArray`] and the low
/// half in inner [`CompactSparseArray`]s.
///
/// The inner arrays only store the low `split = bits / 2` bits of their indices, which lets
/// them use smaller probed tables. Inner arrays are never empty; the total number of elements
/// is kept up to date on every mutation.
#[derive(Clone)]
pub struct FractalSparse<E> {
    bits: u32,
    split: u32,
    len: usize,
    outer: SparseArray<CompactSparseArray<E>>,
}

impl<E> Default for FractalSparse<E> {
    fn default() -> Self {
        Self::new(INDEX_BITS)
    }
}

impl<E> FractalSparse<E> {
    /// Returns an empty array for indices of at most `bits` bits.
    pub fn new(bits: u32) -> Self {
        assert!(bits >= 2 && bits <= INDEX_BITS);
        FractalSparse {
            bits,
            split: bits / 2,
            len: 0,
            outer: SparseArray::new(),
        }
    }

    /// Returns the number of index bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    fn split_index(&self, index: u64) -> (u64, u64) {
        (index >> self.split, index & low_mask(self.split))
    }

    #[inline(always)]
    fn join_index(&self, high: u64, low: u64) -> u64 {
        (high << self.split) | low
    }

    /// Returns the element at `index`, if any.
    pub fn get(&self, index: u64) -> Option<&E> {
        let (high, low) = self.split_index(index);
        self.outer.get(high)?.get(low)
    }

    /// Returns a mutable reference to the element at `index`, if any.
    pub fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        let (high, low) = self.split_index(index);
        self.outer.get_mut(high)?.get_mut(low)
    }

    /// Stores `element` at `index` (removing the element when `None`), returning the element
    /// previously stored at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` has more than [`bits`][Self::bits] bits.
    pub fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        let (high, low) = self.split_index(index);
        assert!(
            high <= low_mask(self.bits - self.split),
            "index {index:#x} exceeds {} bits",
            self.bits
        );
        let Some(inner) = self.outer.get_mut(high) else {
            let element = element?;
            let mut inner = CompactSparseArray::new(self.split);
            inner.replace(low, Some(element));
            self.outer.replace(high, Some(inner));
            self.len += 1;
            return None;
        };

        let added = element.is_some();
        let previous = inner.replace(low, element);
        let emptied = inner.is_empty();
        self.len = self.len + added as usize - previous.is_some() as usize;
        if emptied {
            self.outer.take(high);
        }
        previous
    }

    /// Returns the element with the smallest index `>= min`, together with its index.
    pub fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        let (high, low) = self.split_index(min);
        if let Some((low, element)) = self.outer.get(high).and_then(|inner| inner.ceiling(low)) {
            return Some((self.join_index(high, low), element));
        }
        let (high, inner) = self.outer.ceiling(high.checked_add(1)?)?;
        let (low, element) = inner.first()?;
        Some((self.join_index(high, low), element))
    }

    /// Returns the element with the largest index `<= max`, together with its index.
    pub fn floor(&self, max: u64) -> Option<(u64, &E)> {
        let (high, low) = self.split_index(max);
        if let Some((low, element)) = self.outer.get(high).and_then(|inner| inner.floor(low)) {
            return Some((self.join_index(high, low), element));
        }
        let (high, inner) = self.outer.floor(high.checked_sub(1)?)?;
        let (low, element) = inner.last()?;
        Some((self.join_index(high, low), element))
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

    pub(crate) fn inner_depth(&self) -> usize {
        self.outer
            .iter()
            .map(|(_, inner)| inner.depth())
            .max()
            .unwrap_or(0)
    }

    /// Verifies the internal invariants, panicking when one is violated.
    ///
    /// Returns the number of elements.
    pub fn check(&self) -> usize {
        self.outer.check();
        let mut len = 0;
        for (high, inner) in self.outer.iter() {
            assert!(
                high <= low_mask(self.bits - self.split),
                "high index {high:#x} exceeds {} bits",
                self.bits - self.split
            );
            assert!(!inner.is_empty(), "empty inner array at {high:#x}");
            assert_eq!(inner.bits(), self.split);
            len += inner.check();
        }
        assert_eq!(len, self.len, "fractal length out of sync");
        len
    }
}

impl<E> IndexedArray<E> for FractalSparse<E> {
    fn get(&self, index: u64) -> Option<&E> {
        FractalSparse::get(self, index)
    }

    fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        FractalSparse::get_mut(self, index)
    }

    fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        FractalSparse::replace(self, index, element)
    }

    fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        FractalSparse::ceiling(self, min)
    }

    fn floor(&self, max: u64) -> Option<(u64, &E)> {
        FractalSparse::floor(self, max)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn is_empty(&self) -> bool {
        FractalSparse::is_empty(self)
    }
}
