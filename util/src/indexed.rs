//! The common interface of the indexed array families.
use std::marker::PhantomData;

/// A collection mapping unsigned 64-bit indices to elements, each index holding at most one
/// element.
///
/// This is implemented by the positional `FractalArray` as well as by all sparse arrays. Most
/// indexed arrays change their representation on mutation, so their own API consumes `self`
/// and returns the replacement. This trait exposes the in-place view of those operations,
/// which is what generic consumers (reference model tests, the workload driver) need.
pub trait IndexedArray<E> {
    /// Returns the element at `index`, if any.
    fn get(&self, index: u64) -> Option<&E>;

    /// Returns a mutable reference to the element at `index`, if any.
    fn get_mut(&mut self, index: u64) -> Option<&mut E>;

    /// Stores `element` at `index` (removing the element when `None`) and returns the element
    /// previously stored at `index`.
    fn replace(&mut self, index: u64, element: Option<E>) -> Option<E>;

    /// Returns the element with the smallest index `>= min`, together with its index.
    fn ceiling(&self, min: u64) -> Option<(u64, &E)>;

    /// Returns the element with the largest index `<= max`, together with its index.
    fn floor(&self, max: u64) -> Option<(u64, &E)>;

    /// Returns the number of stored elements.
    ///
    /// This is constant time for the sparse families, but linear in the number of nodes for
    /// positional arrays, whose users are expected to track the length themselves.
    fn len(&self) -> usize;

    /// Returns `true` when no element is stored.
    fn is_empty(&self) -> bool;

    /// Removes and returns the element at `index`, if any.
    fn take(&mut self, index: u64) -> Option<E> {
        self.replace(index, None)
    }

    /// Returns the element at `index` or `default` when there is none.
    fn get_or<'a>(&'a self, index: u64, default: &'a E) -> &'a E {
        self.get(index).unwrap_or(default)
    }

    /// Returns the element with the smallest index.
    fn first(&self) -> Option<(u64, &E)> {
        self.ceiling(0)
    }

    /// Returns the element with the largest index.
    fn last(&self) -> Option<(u64, &E)> {
        self.floor(u64::MAX)
    }

    /// Returns the element with the smallest index strictly greater than `index`.
    fn higher(&self, index: u64) -> Option<(u64, &E)> {
        self.ceiling(index.checked_add(1)?)
    }

    /// Returns the element with the largest index strictly less than `index`.
    fn lower(&self, index: u64) -> Option<(u64, &E)> {
        self.floor(index.checked_sub(1)?)
    }

    /// Returns an iterator over all `(index, element)` pairs in ascending index order, driven
    /// by [`ceiling`][Self::ceiling] and [`floor`][Self::floor].
    fn iter(&self) -> Iter<'_, Self, E>
    where
        Self: Sized,
    {
        Iter::new(self, 0, u64::MAX)
    }
}

/// Iterator over the elements of an [`IndexedArray`] within an inclusive index range.
///
/// Each step performs one [`ceiling`][IndexedArray::ceiling] (or [`floor`][IndexedArray::floor]
/// from the back) lookup.
pub struct Iter<'a, A, E> {
    array: &'a A,
    front: u64,
    back: u64,
    done: bool,
    _phantom: PhantomData<&'a E>,
}

impl<'a, A: IndexedArray<E>, E> Iter<'a, A, E> {
    /// Returns an iterator over the elements of `array` with indices in `lo..=hi`.
    pub fn new(array: &'a A, lo: u64, hi: u64) -> Self {
        Iter {
            array,
            front: lo,
            back: hi,
            done: lo > hi,
            _phantom: PhantomData,
        }
    }
}

impl<'a, A: IndexedArray<E>, E: 'a> Iterator for Iter<'a, A, E> {
    type Item = (u64, &'a E);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.array.ceiling(self.front) {
            Some((index, element)) if index <= self.back => {
                if index == self.back {
                    self.done = true;
                } else {
                    self.front = index + 1;
                }
                Some((index, element))
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

impl<'a, A: IndexedArray<E>, E: 'a> DoubleEndedIterator for Iter<'a, A, E> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.array.floor(self.back) {
            Some((index, element)) if index >= self.front => {
                if index == self.front {
                    self.done = true;
                } else {
                    self.back = index - 1;
                }
                Some((index, element))
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

impl<'a, A: IndexedArray<E>, E: 'a> std::iter::FusedIterator for Iter<'a, A, E> {}
