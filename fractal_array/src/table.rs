//! Positional list built on a [`FractalArray`].
use std::{
    cmp::Ordering,
    fmt,
    mem::take,
    ops::{Index, IndexMut},
};

use fractal_util::fmt::fmt_list;

use crate::array::{self, FractalArray};

/// Error returned by the checked table operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum TableError {
    /// A position outside of the table was accessed.
    #[error("index {index} out of bounds for table of length {len}")]
    OutOfBounds {
        /// The requested position.
        index: usize,
        /// The length of the table at the time of the access.
        len: usize,
    },
}

/// A list supporting insertion and removal at any position, including the front, without
/// moving the other elements one by one.
///
/// The elements are stored at the positions `0..len` of a [`FractalArray`], which turns
/// inserting or removing in the middle into a single [`shift`][FractalArray::shift] of the
/// elements behind it. Indexed access takes time proportional to the array's depth, which is
/// at most 16.
///
/// The plain positional methods panic on out-of-bounds positions like the corresponding
/// methods of `Vec`. The `try_*` variants return a [`TableError`] instead.
#[derive(Clone)]
pub struct FractalTable<E> {
    array: FractalArray<E>,
    len: usize,
}

impl<E> Default for FractalTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> fmt::Debug for FractalTable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&fmt_list(|| self.iter()), f)
    }
}

impl<E: PartialEq> PartialEq for FractalTable<E> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<E: Eq> Eq for FractalTable<E> {}

fn occupied<E>(element: Option<E>) -> E {
    element.unwrap_or_else(|| unreachable!("table position without an element"))
}

impl<E> FractalTable<E> {
    /// Returns an empty table.
    pub const fn new() -> Self {
        FractalTable {
            array: FractalArray::new(),
            len: 0,
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the table holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the underlying array, which holds the elements at the indices `0..len`.
    pub fn as_array(&self) -> &FractalArray<E> {
        &self.array
    }

    fn update<R>(&mut self, f: impl FnOnce(FractalArray<E>) -> (FractalArray<E>, R)) -> R {
        let (array, result) = f(take(&mut self.array));
        self.array = array;
        result
    }

    /// Returns the element at position `index`.
    pub fn get(&self, index: usize) -> Option<&E> {
        if index >= self.len {
            return None;
        }
        self.array.get(index as u64)
    }

    /// Returns a mutable reference to the element at position `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut E> {
        if index >= self.len {
            return None;
        }
        self.array.get_mut(index as u64)
    }

    /// Returns the first element.
    pub fn first(&self) -> Option<&E> {
        self.get(0)
    }

    /// Returns the last element.
    pub fn last(&self) -> Option<&E> {
        self.get(self.len.checked_sub(1)?)
    }

    /// Replaces the element at position `index`, returning the previous element.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn set(&mut self, index: usize, element: E) -> E {
        match self.try_set(index, element) {
            Ok(previous) => previous,
            Err(err) => panic!("{err}"),
        }
    }

    /// Replaces the element at position `index`, returning the previous element.
    pub fn try_set(&mut self, index: usize, element: E) -> Result<E, TableError> {
        self.bounds_check(index, self.len)?;
        Ok(occupied(self.array.replace(index as u64, Some(element))))
    }

    /// Appends an element at the end.
    pub fn push(&mut self, element: E) {
        self.array.replace(self.len as u64, Some(element));
        self.len += 1;
    }

    /// Prepends an element, moving all other elements one position back.
    pub fn push_front(&mut self, element: E) {
        self.insert(0, element)
    }

    /// Inserts an element at position `index`, moving all elements after it one position back.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, element: E) {
        let len = self.len;
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        self.insert_unchecked(index, element);
    }

    /// Inserts an element at position `index`, moving all elements after it one position back.
    pub fn try_insert(&mut self, index: usize, element: E) -> Result<(), TableError> {
        self.bounds_check(index, self.len + 1)?;
        self.insert_unchecked(index, element);
        Ok(())
    }

    fn insert_unchecked(&mut self, index: usize, element: E) {
        let len = self.len as u64;
        let displaced = self.update(|array| array.shift(index as u64, len, Some(element)));
        debug_assert!(displaced.is_none());
        self.len += 1;
    }

    /// Removes and returns the element at position `index`, moving all elements after it one
    /// position forward.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> E {
        let len = self.len;
        assert!(
            index < len,
            "removal index (is {index}) should be < len (is {len})"
        );
        self.remove_unchecked(index)
    }

    /// Removes and returns the element at position `index`, moving all elements after it one
    /// position forward.
    pub fn try_remove(&mut self, index: usize) -> Result<E, TableError> {
        self.bounds_check(index, self.len)?;
        Ok(self.remove_unchecked(index))
    }

    fn remove_unchecked(&mut self, index: usize) -> E {
        let last = (self.len - 1) as u64;
        let removed = self.update(|array| array.shift(last, index as u64, None));
        self.len -= 1;
        occupied(removed)
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<E> {
        self.len = self.len.checked_sub(1)?;
        Some(occupied(self.array.take(self.len as u64)))
    }

    /// Removes and returns the first element.
    pub fn pop_front(&mut self) -> Option<E> {
        if self.is_empty() {
            return None;
        }
        Some(self.remove_unchecked(0))
    }

    /// Removes all elements.
    pub fn clear(&mut self) {
        self.array = FractalArray::new();
        self.len = 0;
    }

    /// Shortens the table to `len` elements, dropping the rest.
    pub fn truncate(&mut self, len: usize) {
        while self.len > len {
            self.pop();
        }
    }

    /// Swaps the elements at positions `a` and `b`.
    ///
    /// # Panics
    ///
    /// Panics if either position is out of bounds.
    pub fn swap(&mut self, a: usize, b: usize) {
        let len = self.len;
        assert!(
            a < len && b < len,
            "swap positions (are {a} and {b}) should be < len (is {len})"
        );
        if a == b {
            return;
        }
        let x = self.array.take(a as u64);
        let y = self.array.replace(b as u64, x);
        self.array.replace(a as u64, y);
    }

    /// Keeps only the elements for which `keep` returns `true`, preserving their order.
    pub fn retain(&mut self, mut keep: impl FnMut(&E) -> bool) {
        for element in take(self) {
            if keep(&element) {
                self.push(element);
            }
        }
    }

    /// Returns an iterator over the elements in order.
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            inner: self.array.iter(),
            remaining: self.len,
        }
    }

    /// Sorts the table using `compare`.
    ///
    /// This is an unstable in-place quicksort that only reads and swaps positions, so it never
    /// shifts elements through the underlying array.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&E, &E) -> Ordering) {
        if self.len > 1 {
            self.quicksort(0, self.len - 1, &mut compare);
        }
    }

    /// Sorts the table in ascending order.
    pub fn sort(&mut self)
    where
        E: Ord,
    {
        self.sort_by(E::cmp)
    }

    fn at(&self, index: usize) -> &E {
        occupied(self.array.get(index as u64))
    }

    fn quicksort(
        &mut self,
        mut lo: usize,
        mut hi: usize,
        compare: &mut impl FnMut(&E, &E) -> Ordering,
    ) {
        const INSERTION_SORT_LEN: usize = 8;

        while hi - lo >= INSERTION_SORT_LEN {
            // Median position as pivot, parked at `hi` during partitioning.
            self.swap(lo + (hi - lo) / 2, hi);
            let mut store = lo;
            for i in lo..hi {
                if compare(self.at(i), self.at(hi)) == Ordering::Less {
                    self.swap(i, store);
                    store += 1;
                }
            }
            self.swap(store, hi);

            // Recurse into the smaller side to bound the stack depth.
            if store - lo < hi - store {
                if store > lo {
                    self.quicksort(lo, store - 1, compare);
                }
                lo = store + 1;
            } else {
                if store < hi {
                    self.quicksort(store + 1, hi, compare);
                }
                if store == lo {
                    return;
                }
                hi = store - 1;
            }
            if lo >= hi {
                return;
            }
        }

        for i in lo + 1..=hi {
            let mut j = i;
            while j > lo && compare(self.at(j - 1), self.at(j)) == Ordering::Greater {
                self.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    /// Returns `true` if the table contains an element equal to `element`.
    pub fn contains(&self, element: &E) -> bool
    where
        E: PartialEq,
    {
        self.iter().any(|found| found == element)
    }

    /// Returns the position of the first element equal to `element`.
    pub fn index_of(&self, element: &E) -> Option<usize>
    where
        E: PartialEq,
    {
        self.iter().position(|found| found == element)
    }

    /// Returns the position of the last element equal to `element`.
    pub fn last_index_of(&self, element: &E) -> Option<usize>
    where
        E: PartialEq,
    {
        self.iter().rposition(|found| found == element)
    }

    fn bounds_check(&self, index: usize, limit: usize) -> Result<(), TableError> {
        if index < limit {
            Ok(())
        } else {
            Err(TableError::OutOfBounds {
                index,
                len: self.len,
            })
        }
    }

    /// Verifies the internal invariants, panicking when one is violated.
    pub fn check(&self) {
        assert_eq!(self.array.check(), self.len, "table length out of sync");
        if let Some((last, _)) = self.array.last() {
            assert_eq!(last + 1, self.len as u64, "table has a gap");
        }
    }
}

impl<E> Index<usize> for FractalTable<E> {
    type Output = E;

    fn index(&self, index: usize) -> &E {
        let len = self.len;
        self.get(index).unwrap_or_else(|| {
            panic!("index out of bounds: the len is {len} but the index is {index}")
        })
    }
}

impl<E> IndexMut<usize> for FractalTable<E> {
    fn index_mut(&mut self, index: usize) -> &mut E {
        let len = self.len;
        self.get_mut(index).unwrap_or_else(|| {
            panic!("index out of bounds: the len is {len} but the index is {index}")
        })
    }
}

impl<E> Extend<E> for FractalTable<E> {
    fn extend<T: IntoIterator<Item = E>>(&mut self, iter: T) {
        for element in iter {
            self.push(element);
        }
    }
}

impl<E> FromIterator<E> for FractalTable<E> {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

/// Iterator over the elements of a [`FractalTable`].
pub struct Iter<'a, E> {
    inner: array::Iter<'a, E>,
    remaining: usize,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<&'a E> {
        let (_, element) = self.inner.next()?;
        self.remaining -= 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, E> DoubleEndedIterator for Iter<'a, E> {
    fn next_back(&mut self) -> Option<&'a E> {
        let (_, element) = self.inner.next_back()?;
        self.remaining -= 1;
        Some(element)
    }
}

impl<'a, E> ExactSizeIterator for Iter<'a, E> {}

impl<'a, E> IntoIterator for &'a FractalTable<E> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator over the elements of a [`FractalTable`].
pub struct IntoIter<E> {
    array: FractalArray<E>,
    front: u64,
    back: u64,
}

impl<E> Iterator for IntoIter<E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        if self.front == self.back {
            return None;
        }
        self.front += 1;
        Some(occupied(self.array.take(self.front - 1)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.back - self.front) as usize;
        (remaining, Some(remaining))
    }
}

impl<E> DoubleEndedIterator for IntoIter<E> {
    fn next_back(&mut self) -> Option<E> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(occupied(self.array.take(self.back)))
    }
}

impl<E> ExactSizeIterator for IntoIter<E> {}

impl<E> IntoIterator for FractalTable<E> {
    type Item = E;
    type IntoIter = IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            array: self.array,
            front: 0,
            back: self.len as u64,
        }
    }
}
