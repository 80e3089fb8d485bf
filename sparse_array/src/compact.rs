//! Memory compact sparse array switching between a probed table and a fractal split.
use std::{fmt, mem::take};

use fractal_util::{fmt::fmt_indexed, indexed::Iter, nibble::INDEX_BITS, IndexedArray};

use crate::{fractal::FractalSparse, probed::ProbedArray};

/// Number of elements above which a probed table is split into a [`FractalSparse`].
pub const MAX_SIZE: usize = 256;

/// Number of elements below which a [`FractalSparse`] is merged back into a probed table.
pub const MIN_SIZE: usize = MAX_SIZE / 2;

/// A sparse array over indices of a fixed bit width that stays compact at any size.
///
/// Up to [`MAX_SIZE`] elements are kept in a single [`ProbedArray`]. Beyond that the index is
/// split in two halves, see [`FractalSparse`], whose low halves are again stored in compact
/// sparse arrays. Shrinking below [`MIN_SIZE`] elements merges everything back into a probed
/// table, so alternating around a single size never rebuilds the array on every operation.
///
/// ```
/// use sparse_array::CompactSparseArray;
///
/// let mut array = CompactSparseArray::new(32);
/// for i in 0..1000u64 {
///     array.replace(i * 4099, Some(i));
/// }
/// assert_eq!(array.variant(), "Fractal");
/// assert_eq!(array.get(4099 * 7), Some(&7));
/// assert_eq!(array.ceiling(4100), Some((8198, &2)));
/// ```
#[derive(Clone)]
pub enum CompactSparseArray<E> {
    /// A single probed table.
    Probed(ProbedArray<E>),
    /// An index split into high and low halves.
    Fractal(Box<FractalSparse<E>>),
}

impl<E> Default for CompactSparseArray<E> {
    fn default() -> Self {
        Self::new(INDEX_BITS)
    }
}

impl<E: fmt::Debug> fmt::Debug for CompactSparseArray<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&fmt_indexed(|| self.iter()), f)
    }
}

impl<E> CompactSparseArray<E> {
    /// Returns an empty array for indices of at most `bits` bits.
    pub fn new(bits: u32) -> Self {
        CompactSparseArray::Probed(ProbedArray::new(bits))
    }

    /// Returns the number of index bits.
    pub fn bits(&self) -> u32 {
        match self {
            CompactSparseArray::Probed(probed) => probed.bits(),
            CompactSparseArray::Fractal(fractal) => fractal.bits(),
        }
    }

    /// Returns the name of the current representation.
    pub fn variant(&self) -> &'static str {
        match self {
            CompactSparseArray::Probed(_) => "Probed",
            CompactSparseArray::Fractal(_) => "Fractal",
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        match self {
            CompactSparseArray::Probed(probed) => probed.len(),
            CompactSparseArray::Fractal(fractal) => fractal.len(),
        }
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`, if any.
    pub fn get(&self, index: u64) -> Option<&E> {
        match self {
            CompactSparseArray::Probed(probed) => probed.get(index),
            CompactSparseArray::Fractal(fractal) => fractal.get(index),
        }
    }

    /// Returns a mutable reference to the element at `index`, if any.
    pub fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        match self {
            CompactSparseArray::Probed(probed) => probed.get_mut(index),
            CompactSparseArray::Fractal(fractal) => fractal.get_mut(index),
        }
    }

    /// Stores `element` at `index` (removing the element when `None`), returning the element
    /// previously stored at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` has more than [`bits`][Self::bits] bits.
    pub fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        let previous = match self {
            CompactSparseArray::Probed(probed) => probed.replace(index, element),
            CompactSparseArray::Fractal(fractal) => fractal.replace(index, element),
        };
        match self {
            CompactSparseArray::Probed(probed) if probed.len() > MAX_SIZE => {
                let bits = probed.bits();
                log::trace!("splitting {bits} bit probed table with {} elements", probed.len());
                let mut fractal = FractalSparse::new(bits);
                for (index, element) in probed.drain() {
                    fractal.replace(index, Some(element));
                }
                *self = CompactSparseArray::Fractal(Box::new(fractal));
            }
            CompactSparseArray::Fractal(fractal) if fractal.len() < MIN_SIZE => {
                let mut fractal = take(fractal);
                log::trace!(
                    "merging {} bit fractal with {} elements",
                    fractal.bits(),
                    fractal.len()
                );
                let mut probed = ProbedArray::new(fractal.bits());
                while let Some(index) = fractal.first().map(|(index, _)| index) {
                    let element = fractal.replace(index, None);
                    probed.replace(index, element);
                }
                *self = CompactSparseArray::Probed(probed);
            }
            _ => (),
        }
        previous
    }

    /// Removes and returns the element at `index`.
    pub fn take(&mut self, index: u64) -> Option<E> {
        self.replace(index, None)
    }

    /// Returns the element with the smallest index `>= min`, together with its index.
    pub fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        match self {
            CompactSparseArray::Probed(probed) => probed.ceiling(min),
            CompactSparseArray::Fractal(fractal) => fractal.ceiling(min),
        }
    }

    /// Returns the element with the largest index `<= max`, together with its index.
    pub fn floor(&self, max: u64) -> Option<(u64, &E)> {
        match self {
            CompactSparseArray::Probed(probed) => probed.floor(max),
            CompactSparseArray::Fractal(fractal) => fractal.floor(max),
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

    /// Returns the number of nested fractal splits, `0` for a probed table.
    pub fn depth(&self) -> usize {
        match self {
            CompactSparseArray::Probed(_) => 0,
            CompactSparseArray::Fractal(fractal) => 1 + fractal.inner_depth(),
        }
    }

    /// Verifies the internal invariants, panicking when one is violated.
    ///
    /// Returns the number of elements.
    pub fn check(&self) -> usize {
        match self {
            CompactSparseArray::Probed(probed) => {
                assert!(probed.len() <= MAX_SIZE, "probed table should have been split");
                probed.check()
            }
            CompactSparseArray::Fractal(fractal) => {
                assert!(fractal.len() >= MIN_SIZE, "fractal should have been merged");
                fractal.check()
            }
        }
    }
}

impl<E> FromIterator<(u64, E)> for CompactSparseArray<E> {
    fn from_iter<T: IntoIterator<Item = (u64, E)>>(iter: T) -> Self {
        let mut array = Self::default();
        for (index, element) in iter {
            array.replace(index, Some(element));
        }
        array
    }
}

impl<E> IndexedArray<E> for CompactSparseArray<E> {
    fn get(&self, index: u64) -> Option<&E> {
        CompactSparseArray::get(self, index)
    }

    fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        CompactSparseArray::get_mut(self, index)
    }

    fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        CompactSparseArray::replace(self, index, element)
    }

    fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        CompactSparseArray::ceiling(self, min)
    }

    fn floor(&self, max: u64) -> Option<(u64, &E)> {
        CompactSparseArray::floor(self, max)
    }

    fn len(&self) -> usize {
        CompactSparseArray::len(self)
    }

    fn is_empty(&self) -> bool {
        CompactSparseArray::is_empty(self)
    }
}
