//! Ordered open addressing table for small sparse arrays.
use std::{fmt, mem::replace};

use fractal_util::{
    fmt::fmt_indexed,
    indexed::Iter,
    nibble::{low_mask, INDEX_BITS},
    IndexedArray,
};

/// The table grows when more than `capacity >> MAX_CAPACITY_SHIFT` slots are in use.
pub const MAX_CAPACITY_SHIFT: u32 = 1;

/// Smallest capacity of a non-empty table.
pub const MIN_CAPACITY: usize = 16;

type Slot<E> = Option<(u64, E)>;

/// A sparse array stored in a linearly probed table whose slots are ordered by index.
///
/// Indices have at most `bits` bits. The home slot of an index is its position scaled to the
/// capacity, `(index * capacity) >> bits`, so home slots grow monotonically with the index.
/// Insertion carries displaced entries forward instead of searching for a free slot, which keeps
/// all entries sorted by index. Every entry lies at or after its home slot, and all slots
/// between its home slot and its position are occupied. Entries pushed past the last home slot
/// are kept in overflow slots appended at the end.
///
/// This keeps lookups, as well as [`ceiling`][Self::ceiling] and [`floor`][Self::floor], close
/// to the home slot of the requested index, and allows iterating in index order by scanning the
/// slots.
#[derive(Clone)]
pub struct ProbedArray<E> {
    bits: u32,
    capacity: usize,
    len: usize,
    slots: Vec<Slot<E>>,
}

impl<E: fmt::Debug> fmt::Debug for ProbedArray<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&fmt_indexed(|| self.iter()), f)
    }
}

impl<E> Default for ProbedArray<E> {
    fn default() -> Self {
        Self::new(INDEX_BITS)
    }
}

impl<E> ProbedArray<E> {
    /// Returns an empty array for indices of at most `bits` bits.
    pub fn new(bits: u32) -> Self {
        assert!(bits > 0 && bits <= INDEX_BITS);
        ProbedArray {
            bits,
            capacity: 0,
            len: 0,
            slots: vec![],
        }
    }

    /// Returns the number of index bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns the number of home slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the largest index this array can hold.
    pub fn max_index(&self) -> u64 {
        low_mask(self.bits)
    }

    #[inline(always)]
    fn home(&self, index: u64) -> usize {
        debug_assert!(self.bits == INDEX_BITS || index >> self.bits == 0);
        ((index as u128 * self.capacity as u128) >> self.bits) as usize
    }

    /// Returns the position of the entry for `index`, or where it would have to be inserted.
    fn search(&self, index: u64) -> Result<usize, usize> {
        let mut pos = self.home(index);
        while let Some(slot) = self.slots.get(pos) {
            match slot {
                None => return Err(pos),
                Some((found, _)) if *found == index => return Ok(pos),
                Some((found, _)) if *found > index => return Err(pos),
                Some(_) => pos += 1,
            }
        }
        Err(pos)
    }

    /// Returns the element at `index`, if any.
    pub fn get(&self, index: u64) -> Option<&E> {
        if self.is_empty() {
            return None;
        }
        let pos = self.search(index).ok()?;
        self.slots[pos].as_ref().map(|(_, element)| element)
    }

    /// Returns a mutable reference to the element at `index`, if any.
    pub fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        if self.is_empty() {
            return None;
        }
        let pos = self.search(index).ok()?;
        self.slots[pos].as_mut().map(|(_, element)| element)
    }

    /// Stores `element` at `index` (removing the element when `None`), returning the element
    /// previously stored at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` exceeds [`max_index`][Self::max_index].
    pub fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        assert!(index <= self.max_index(), "index {index:#x} exceeds {} bits", self.bits);
        match element {
            Some(element) => self.insert(index, element),
            None => self.remove(index),
        }
    }

    /// Removes and returns the element at `index`.
    pub fn take(&mut self, index: u64) -> Option<E> {
        self.replace(index, None)
    }

    fn insert(&mut self, index: u64, element: E) -> Option<E> {
        if self.capacity == 0 {
            self.resize(MIN_CAPACITY);
        }
        match self.search(index) {
            Ok(pos) => self.slots[pos]
                .as_mut()
                .map(|(_, slot)| replace(slot, element)),
            Err(mut pos) => {
                let mut carry = Some((index, element));
                while carry.is_some() {
                    if pos == self.slots.len() {
                        self.slots.push(None);
                    }
                    carry = replace(&mut self.slots[pos], carry);
                    pos += 1;
                }
                self.len += 1;
                if self.len << MAX_CAPACITY_SHIFT > self.capacity {
                    self.resize(self.capacity * 2);
                }
                None
            }
        }
    }

    fn remove(&mut self, index: u64) -> Option<E> {
        if self.is_empty() {
            return None;
        }
        let mut pos = self.search(index).ok()?;
        let (_, removed) = self.slots[pos].take()?;
        self.len -= 1;

        // Pull back the displaced entries that follow, so no entry is separated from its home
        // slot by an empty slot.
        while let Some(Some((next, _))) = self.slots.get(pos + 1) {
            if self.home(*next) > pos {
                break;
            }
            self.slots[pos] = self.slots[pos + 1].take();
            pos += 1;
        }
        while self.slots.len() > self.capacity && matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }

        if self.len == 0 {
            log::trace!("releasing probed table of capacity {}", self.capacity);
            *self = Self::new(self.bits);
        } else if self.len << (MAX_CAPACITY_SHIFT + 2) < self.capacity
            && self.capacity > MIN_CAPACITY
        {
            self.resize(self.capacity / 2);
        }
        Some(removed)
    }

    /// Rebuilds the table with `capacity` home slots.
    fn resize(&mut self, capacity: usize) {
        log::trace!(
            "resizing probed table with {} elements from {} to {capacity}",
            self.len,
            self.capacity
        );
        let slots = std::mem::take(&mut self.slots);
        self.capacity = capacity;
        self.slots.resize_with(capacity, || None);
        let mut pos = 0;
        for (index, element) in slots.into_iter().flatten() {
            pos = pos.max(self.home(index));
            if pos == self.slots.len() {
                self.slots.push(None);
            }
            self.slots[pos] = Some((index, element));
            pos += 1;
        }
    }

    /// Returns the element with the smallest index `>= min`, together with its index.
    pub fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        if self.is_empty() {
            return None;
        }
        let start = self.home(min.min(self.max_index()));
        self.slots[start..]
            .iter()
            .flatten()
            .find(|(index, _)| *index >= min)
            .map(|(index, element)| (*index, element))
    }

    /// Returns the element with the largest index `<= max`, together with its index.
    pub fn floor(&self, max: u64) -> Option<(u64, &E)> {
        if self.is_empty() {
            return None;
        }
        let start = self.home(max.min(self.max_index()));

        // Entries displaced from home slots up to `start` follow it without a gap.
        let mut found = None;
        for slot in &self.slots[start..] {
            match slot {
                Some((index, element)) if *index <= max => found = Some((*index, element)),
                _ => break,
            }
        }
        found.or_else(|| {
            self.slots[..start]
                .iter()
                .rev()
                .flatten()
                .next()
                .map(|(index, element)| (*index, element))
        })
    }

    /// Returns the element with the smallest index.
    pub fn first(&self) -> Option<(u64, &E)> {
        self.slots.iter().flatten().next().map(|(index, element)| (*index, element))
    }

    /// Returns the element with the largest index.
    pub fn last(&self) -> Option<(u64, &E)> {
        self.slots.iter().rev().flatten().next().map(|(index, element)| (*index, element))
    }

    /// Returns an iterator over all `(index, element)` pairs in ascending index order.
    pub fn iter(&self) -> Iter<'_, Self, E> {
        Iter::new(self, 0, u64::MAX)
    }

    /// Removes and returns all entries in ascending index order.
    pub fn drain(&mut self) -> impl Iterator<Item = (u64, E)> {
        let slots = std::mem::take(&mut self.slots);
        *self = Self::new(self.bits);
        slots.into_iter().flatten()
    }

    /// Verifies the internal invariants, panicking when one is violated.
    ///
    /// Returns the number of elements.
    pub fn check(&self) -> usize {
        assert!(self.slots.len() >= self.capacity);
        if self.capacity == 0 {
            assert!(self.slots.is_empty() && self.len == 0);
            return 0;
        }
        assert!(self.capacity >= MIN_CAPACITY);
        assert!(self.len << MAX_CAPACITY_SHIFT <= self.capacity, "probed table overfull");
        let mut len = 0;
        let mut previous = None;
        for (pos, slot) in self.slots.iter().enumerate() {
            let Some((index, _)) = slot else { continue };
            len += 1;
            assert!(*index <= self.max_index(), "index {index:#x} exceeds {} bits", self.bits);
            assert!(previous < Some(*index), "probed table entries out of order");
            previous = Some(*index);
            let home = self.home(*index);
            assert!(home <= pos, "entry {index:#x} before its home slot");
            assert!(
                self.slots[home..pos].iter().all(Option::is_some),
                "entry {index:#x} separated from its home slot"
            );
        }
        assert_eq!(len, self.len, "probed table length out of sync");
        assert!(
            self.slots.len() == self.capacity || matches!(self.slots.last(), Some(Some(_))),
            "trailing empty overflow slot"
        );
        len
    }
}

impl<E> IndexedArray<E> for ProbedArray<E> {
    fn get(&self, index: u64) -> Option<&E> {
        ProbedArray::get(self, index)
    }

    fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        ProbedArray::get_mut(self, index)
    }

    fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        ProbedArray::replace(self, index, element)
    }

    fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        ProbedArray::ceiling(self, min)
    }

    fn floor(&self, max: u64) -> Option<(u64, &E)> {
        ProbedArray::floor(self, max)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn is_empty(&self) -> bool {
        ProbedArray::is_empty(self)
    }
}
