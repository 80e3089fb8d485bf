//! Self-resizing positional array over unsigned 64-bit indices.
use std::{fmt, mem::take};

use fractal_util::{
    fmt::fmt_indexed,
    nibble::{common_shift, NIBBLE_MASK},
    IndexedArray,
};

mod block;
mod fractal;

pub use block::{Block, ARRAY_LENGTH};
pub use fractal::Fractal;

/// A fractal array: a sparse, trie structured, fast rotating array indexed by `u64`.
///
/// The representation adapts to the number of elements and to the spread of their indices:
///
/// * [`Empty`][Self::Empty] holds nothing,
/// * [`Single`][Self::Single] holds one element,
/// * [`Block`][Self::Block] holds up to 16 elements whose indices only differ in the low 4
///   bits,
/// * [`Fractal`][Self::Fractal] holds 16 child arrays, each covering a 16th of the node's span,
///   nesting at most 16 levels deep.
///
/// Every mutating operation consumes the array and returns its new representation, which may be
/// a different variant. The in-place wrappers [`replace`][Self::replace] and
/// [`take`][Self::take] do the same behind a `&mut`.
///
/// Besides setting and clearing individual indices, the array supports [`shift`][Self::shift]
/// which moves a range of elements by one position. Both blocks and fractals store their
/// contents in a rotated ring, so a shift covering a whole node only updates that node's
/// rotation offset. A shift spanning many nodes rotates all nodes in between and only touches
/// elements in the two boundary nodes, recursively, which keeps insertion and removal at
/// arbitrary positions logarithmic.
///
/// ```
/// use fractal_array::FractalArray;
///
/// let array = FractalArray::new().set(5, "a").set(5_000_000, "b");
/// assert_eq!(array.get(5), Some(&"a"));
/// assert_eq!(array.get(5_000_000), Some(&"b"));
/// assert_eq!(array.get(6), None);
///
/// let array = array.clear(5).clear(5_000_000);
/// assert!(array.is_empty());
/// ```
#[derive(Clone)]
pub enum FractalArray<E> {
    /// No elements.
    Empty,
    /// A single element.
    Single {
        /// Index of the element.
        index: u64,
        /// The element.
        element: E,
    },
    /// Up to 16 elements sharing all but the lowest 4 index bits.
    Block(Box<Block<E>>),
    /// A node with 16 children.
    Fractal(Box<Fractal<E>>),
}

impl<E> Default for FractalArray<E> {
    fn default() -> Self {
        FractalArray::Empty
    }
}

impl<E: fmt::Debug> fmt::Debug for FractalArray<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&fmt_indexed(|| self.iter()), f)
    }
}

impl<E: PartialEq> PartialEq for FractalArray<E> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<E: Eq> Eq for FractalArray<E> {}

impl<E> FractalArray<E> {
    /// Returns an empty array.
    pub const fn new() -> Self {
        FractalArray::Empty
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        matches!(self, FractalArray::Empty)
    }

    /// Returns the name of the current representation.
    pub fn variant(&self) -> &'static str {
        match self {
            FractalArray::Empty => "Empty",
            FractalArray::Single { .. } => "Single",
            FractalArray::Block(_) => "Block",
            FractalArray::Fractal(_) => "Fractal",
        }
    }

    /// Returns the number of node levels, `0` for an empty array.
    pub fn depth(&self) -> usize {
        match self {
            FractalArray::Empty => 0,
            FractalArray::Single { .. } | FractalArray::Block(_) => 1,
            FractalArray::Fractal(fractal) => fractal.depth(),
        }
    }

    /// Counts the stored elements.
    ///
    /// This visits every node; positional users should track their length instead.
    pub fn element_count(&self) -> usize {
        match self {
            FractalArray::Empty => 0,
            FractalArray::Single { .. } => 1,
            FractalArray::Block(block) => block.count(),
            FractalArray::Fractal(fractal) => fractal.element_count(),
        }
    }

    /// Returns the element at `index`, if any.
    pub fn get(&self, index: u64) -> Option<&E> {
        match self {
            FractalArray::Empty => None,
            FractalArray::Single { index: found, element } => (*found == index).then_some(element),
            FractalArray::Block(block) => block.get(index),
            FractalArray::Fractal(fractal) => fractal.get(index),
        }
    }

    /// Returns a mutable reference to the element at `index`, if any.
    pub fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        match self {
            FractalArray::Empty => None,
            FractalArray::Single { index: found, element } => (*found == index).then_some(element),
            FractalArray::Block(block) => block.get_mut(index),
            FractalArray::Fractal(fractal) => fractal.get_mut(index),
        }
    }

    /// Returns the element at `index` or `default` when there is none.
    pub fn get_or<'a>(&'a self, index: u64, default: &'a E) -> &'a E {
        self.get(index).unwrap_or(default)
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

    pub(crate) fn put(self, index: u64, element: Option<E>) -> (Self, Option<E>) {
        match (self, element) {
            (FractalArray::Empty, None) => (FractalArray::Empty, None),
            (FractalArray::Empty, Some(element)) => (FractalArray::Single { index, element }, None),
            (FractalArray::Single { index: found, element }, None) => {
                if found == index {
                    (FractalArray::Empty, Some(element))
                } else {
                    (FractalArray::Single { index: found, element }, None)
                }
            }
            (FractalArray::Single { index: found, element: previous }, Some(element)) => {
                if found == index {
                    (FractalArray::Single { index, element }, Some(previous))
                } else {
                    (Self::pair(found, previous, index, element), None)
                }
            }
            (FractalArray::Block(mut block), element) => {
                if block.contains(index) {
                    let previous = block.put(index, element);
                    (Self::from_block(block), previous)
                } else if element.is_some() {
                    let base = block.base();
                    let mut fractal = Fractal::wrap(FractalArray::Block(block), base, index, index);
                    fractal.put(index, element);
                    (FractalArray::Fractal(fractal), None)
                } else {
                    (FractalArray::Block(block), None)
                }
            }
            (FractalArray::Fractal(mut fractal), element) => {
                if fractal.contains(index) {
                    let previous = fractal.put(index, element);
                    (fractal.normalize(), previous)
                } else if element.is_some() {
                    let base = fractal.base();
                    let mut fractal =
                        Fractal::wrap(FractalArray::Fractal(fractal), base, index, index);
                    fractal.put(index, element);
                    (FractalArray::Fractal(fractal), None)
                } else {
                    (FractalArray::Fractal(fractal), None)
                }
            }
        }
    }

    /// Returns the smallest representation holding two elements at distinct indices.
    fn pair(a: u64, x: E, b: u64, y: E) -> Self {
        match common_shift(a, b) {
            0 => {
                log::trace!("escalating single to block at {:#x}", a & !NIBBLE_MASK);
                FractalArray::Block(Box::new(Block::pair(a, x, b, y)))
            }
            shift => {
                log::trace!("escalating single to fractal with shift {shift}");
                FractalArray::Fractal(Fractal::pair(shift, a, x, b, y))
            }
        }
    }

    fn from_block(block: Box<Block<E>>) -> Self {
        match block.count() {
            0 => FractalArray::Empty,
            1 => {
                let (index, element) = block.into_sole();
                log::trace!("degrading block to single at {index:#x}");
                FractalArray::Single { index, element }
            }
            _ => FractalArray::Block(block),
        }
    }

    /// Moves the array's elements into a window of `mask + 1` indices.
    fn rebase(self, mask: u64) -> Self {
        match self {
            FractalArray::Empty => FractalArray::Empty,
            FractalArray::Single { index, element } => FractalArray::Single {
                index: index & mask,
                element,
            },
            FractalArray::Block(mut block) => {
                block.rebase(mask);
                FractalArray::Block(block)
            }
            FractalArray::Fractal(mut fractal) => {
                fractal.rebase(mask);
                FractalArray::Fractal(fractal)
            }
        }
    }

    /// Moves the array's elements by `delta`, a multiple of the window they live in.
    fn lift(self, delta: u64) -> Self {
        match self {
            FractalArray::Empty => FractalArray::Empty,
            FractalArray::Single { index, element } => FractalArray::Single {
                index: index | delta,
                element,
            },
            FractalArray::Block(mut block) => {
                block.lift(delta);
                FractalArray::Block(block)
            }
            FractalArray::Fractal(mut fractal) => {
                fractal.lift(delta);
                FractalArray::Fractal(fractal)
            }
        }
    }

    /// Shifts the elements between `from` and `to` by one position towards `to`.
    ///
    /// The element at `to` is removed and returned, every element at an index from `from` up to
    /// (but excluding) `to` moves one position towards `to`, and `inserted` is stored at `from`.
    /// For `from < to` this is a right shift, as used for inserting at `from`; for `from > to`
    /// it is a left shift, as used for removing the element at `to`. When `from == to` the
    /// element at that index is replaced. Elements outside the range are not affected.
    ///
    /// ```
    /// use fractal_array::FractalArray;
    ///
    /// let array = (0..4).fold(FractalArray::new(), |array, i| array.set(i, b'A' + i as u8));
    /// let (array, removed) = array.shift(2, 4, Some(b'X'));
    /// assert_eq!(removed, None);
    /// let (array, removed) = array.shift(4, 0, None);
    /// assert_eq!(removed, Some(b'A'));
    /// assert!(array.iter().map(|(_, &c)| c).eq(*b"BXCD"));
    /// ```
    #[must_use]
    pub fn shift(self, from: u64, to: u64, inserted: Option<E>) -> (Self, Option<E>) {
        if from == to {
            return self.put(from, inserted);
        }
        let (lo, hi) = (from.min(to), from.max(to));

        match self {
            FractalArray::Empty => (FractalArray::Empty.put(from, inserted).0, None),
            FractalArray::Single { index, element } => {
                if index < lo || index > hi {
                    (FractalArray::Single { index, element }.put(from, inserted).0, None)
                } else if index == to {
                    (FractalArray::Empty.put(from, inserted).0, Some(element))
                } else {
                    let index = if from < to { index + 1 } else { index - 1 };
                    (FractalArray::Single { index, element }.put(from, inserted).0, None)
                }
            }
            FractalArray::Block(mut block) => {
                if block.contains(lo) && block.contains(hi) {
                    let removed = block.shift(from, to, inserted);
                    (Self::from_block(block), removed)
                } else {
                    let base = block.base();
                    let fractal = Fractal::wrap(FractalArray::Block(block), base, lo, hi);
                    FractalArray::Fractal(fractal).shift(from, to, inserted)
                }
            }
            FractalArray::Fractal(mut fractal) => {
                if fractal.contains(lo) && fractal.contains(hi) {
                    let removed = fractal.shift(from, to, inserted);
                    (fractal.normalize(), removed)
                } else {
                    let base = fractal.base();
                    let fractal = Fractal::wrap(FractalArray::Fractal(fractal), base, lo, hi);
                    FractalArray::Fractal(fractal).shift(from, to, inserted)
                }
            }
        }
    }

    /// Inserts `element` at `index`, shifting all elements at `index` or above one position to
    /// the right.
    ///
    /// # Panics
    ///
    /// Panics when an element would be shifted beyond the largest index.
    #[must_use]
    pub fn insert(self, index: u64, element: E) -> Self {
        match self.last() {
            Some((last, _)) if last >= index => {
                let end = last
                    .checked_add(1)
                    .expect("insertion shifts an element beyond the largest index");
                self.shift(index, end, Some(element)).0
            }
            _ => self.set(index, element),
        }
    }

    /// Removes the element at `index`, shifting all elements above `index` one position to the
    /// left. Returns the updated array and the removed element.
    #[must_use]
    pub fn remove(self, index: u64) -> (Self, Option<E>) {
        match self.last() {
            Some((last, _)) if last > index => self.shift(last, index, None),
            _ => self.put(index, None),
        }
    }

    /// Returns the element with the smallest index `>= min`, together with its index.
    pub fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        self.first_in(min, u64::MAX)
    }

    /// Returns the element with the largest index `<= max`, together with its index.
    pub fn floor(&self, max: u64) -> Option<(u64, &E)> {
        self.last_in(0, max)
    }

    /// Returns the element with the smallest index.
    pub fn first(&self) -> Option<(u64, &E)> {
        self.ceiling(0)
    }

    /// Returns the element with the largest index.
    pub fn last(&self) -> Option<(u64, &E)> {
        self.floor(u64::MAX)
    }

    fn first_in(&self, lo: u64, hi: u64) -> Option<(u64, &E)> {
        match self {
            FractalArray::Empty => None,
            FractalArray::Single { index, element } => {
                (lo..=hi).contains(index).then_some((*index, element))
            }
            FractalArray::Block(block) => block.first_in(lo, hi),
            FractalArray::Fractal(fractal) => fractal.first_in(lo, hi),
        }
    }

    fn last_in(&self, lo: u64, hi: u64) -> Option<(u64, &E)> {
        match self {
            FractalArray::Empty => None,
            FractalArray::Single { index, element } => {
                (lo..=hi).contains(index).then_some((*index, element))
            }
            FractalArray::Block(block) => block.last_in(lo, hi),
            FractalArray::Fractal(fractal) => fractal.last_in(lo, hi),
        }
    }

    /// Returns an iterator over all `(index, element)` pairs in ascending index order.
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            array: self,
            front: 0,
            back: u64::MAX,
            done: self.is_empty(),
        }
    }

    /// Returns an iterator over the `(index, element)` pairs with indices in `lo..=hi`.
    pub fn range(&self, lo: u64, hi: u64) -> Iter<'_, E> {
        Iter {
            array: self,
            front: lo,
            back: hi,
            done: lo > hi || self.is_empty(),
        }
    }

    /// Verifies the internal invariants, panicking when one is violated.
    ///
    /// Returns the number of elements. This is meant for tests and debugging.
    pub fn check(&self) -> usize {
        self.check_within(u64::MAX)
    }

    fn check_within(&self, window: u64) -> usize {
        match self {
            FractalArray::Empty => 0,
            FractalArray::Single { index, .. } => {
                assert!(*index <= window, "single {index:#x} exceeds its window {window:#x}");
                1
            }
            FractalArray::Block(block) => {
                block.check(window);
                block.count()
            }
            FractalArray::Fractal(fractal) => fractal.check(window),
        }
    }
}

/// Iterator over the elements of a [`FractalArray`], see [`FractalArray::iter`].
pub struct Iter<'a, E> {
    array: &'a FractalArray<E>,
    front: u64,
    back: u64,
    done: bool,
}

impl<'a, E> Clone for Iter<'a, E> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = (u64, &'a E);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some((index, element)) = self.array.first_in(self.front, self.back) else {
            self.done = true;
            return None;
        };
        if index == self.back {
            self.done = true;
        } else {
            self.front = index + 1;
        }
        Some((index, element))
    }
}

impl<'a, E> DoubleEndedIterator for Iter<'a, E> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some((index, element)) = self.array.last_in(self.front, self.back) else {
            self.done = true;
            return None;
        };
        if index == self.front {
            self.done = true;
        } else {
            self.back = index - 1;
        }
        Some((index, element))
    }
}

impl<'a, E> std::iter::FusedIterator for Iter<'a, E> {}

impl<'a, E> IntoIterator for &'a FractalArray<E> {
    type Item = (u64, &'a E);
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E> FromIterator<(u64, E)> for FractalArray<E> {
    fn from_iter<T: IntoIterator<Item = (u64, E)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(FractalArray::new(), |array, (index, element)| array.set(index, element))
    }
}

impl<E> IndexedArray<E> for FractalArray<E> {
    fn get(&self, index: u64) -> Option<&E> {
        FractalArray::get(self, index)
    }

    fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        FractalArray::get_mut(self, index)
    }

    fn replace(&mut self, index: u64, element: Option<E>) -> Option<E> {
        FractalArray::replace(self, index, element)
    }

    fn ceiling(&self, min: u64) -> Option<(u64, &E)> {
        FractalArray::ceiling(self, min)
    }

    fn floor(&self, max: u64) -> Option<(u64, &E)> {
        FractalArray::floor(self, max)
    }

    fn len(&self) -> usize {
        self.element_count()
    }

    fn is_empty(&self) -> bool {
        FractalArray::is_empty(self)
    }
}
