use std::mem::take;

use fractal_util::nibble::{from_high_bits, high_bits, low_mask, nibble, FANOUT, NIBBLE_BITS};

use super::FractalArray;

/// Inner node with [`FANOUT`] children.
///
/// A fractal with child shift `shift` covers the aligned span of `1 << (shift + 4)` indices
/// whose bits above `shift + 4` equal `prefix`. Children live in windows of `1 << shift`
/// indices and store indices relative to their window.
///
/// Like a [`Block`][super::Block], the node is a ring: the logical index `i` (relative to the
/// span) is found at the physical position `(i + offset) mod span`, whose high nibble selects
/// the child. Rotating the whole span by one position only updates the offset, which is what
/// makes shifts across many children cheap.
#[derive(Clone)]
pub struct Fractal<E> {
    shift: u32,
    prefix: u64,
    offset: u64,
    count: u8,
    children: [FractalArray<E>; FANOUT],
}

impl<E> Fractal<E> {
    /// Creates an empty fractal with child shift `shift` covering `index`.
    pub(super) fn empty(shift: u32, index: u64) -> Box<Self> {
        debug_assert!(shift % NIBBLE_BITS == 0 && shift > 0 && shift < u64::BITS);
        Box::new(Fractal {
            shift,
            prefix: high_bits(index, shift + NIBBLE_BITS),
            offset: 0,
            count: 0,
            children: Default::default(),
        })
    }

    /// Wraps `node`, whose elements lie in an aligned span starting at `base`, into a new
    /// fractal large enough to also cover `lo..=hi`.
    pub(super) fn wrap(node: FractalArray<E>, base: u64, lo: u64, hi: u64) -> Box<Self> {
        let shift = fractal_util::nibble::diff_shift((base ^ lo) | (base ^ hi));
        log::trace!("escalating {} at {base:#x} into a fractal with shift {shift}", node.variant());
        let mut fractal = Self::empty(shift, base);
        let child = nibble(base, shift);
        fractal.children[child] = node.rebase(low_mask(shift));
        fractal.count = 1;
        fractal
    }

    /// Creates a fractal holding two elements with the given common shift.
    pub(super) fn pair(shift: u32, a: u64, x: E, b: u64, y: E) -> Box<Self> {
        let mut fractal = Self::empty(shift, a);
        let mask = low_mask(shift);
        fractal.children[nibble(a, shift)] = FractalArray::Single {
            index: a & mask,
            element: x,
        };
        fractal.children[nibble(b, shift)] = FractalArray::Single {
            index: b & mask,
            element: y,
        };
        fractal.count = 2;
        fractal
    }

    #[inline(always)]
    fn span_mask(&self) -> u64 {
        low_mask(self.shift + NIBBLE_BITS)
    }

    #[inline(always)]
    fn child_mask(&self) -> u64 {
        low_mask(self.shift)
    }

    #[inline(always)]
    pub(super) fn base(&self) -> u64 {
        from_high_bits(self.prefix, self.shift + NIBBLE_BITS)
    }

    #[inline(always)]
    pub(super) fn contains(&self, index: u64) -> bool {
        high_bits(index, self.shift + NIBBLE_BITS) == self.prefix
    }

    /// Maps an index within the span to its child and the index relative to that child.
    #[inline(always)]
    fn locate(&self, index: u64) -> (usize, u64) {
        let physical = index.wrapping_add(self.offset) & self.span_mask();
        (nibble(physical, self.shift), physical & self.child_mask())
    }

    /// Maps a child and an index relative to that child back to an index relative to the span.
    #[inline(always)]
    fn logical(&self, child: usize, index: u64) -> u64 {
        (((child as u64) << self.shift) | index).wrapping_sub(self.offset) & self.span_mask()
    }

    pub(super) fn get(&self, index: u64) -> Option<&E> {
        if !self.contains(index) {
            return None;
        }
        let (child, index) = self.locate(index);
        self.children[child].get(index)
    }

    pub(super) fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        if !self.contains(index) {
            return None;
        }
        let (child, index) = self.locate(index);
        self.children[child].get_mut(index)
    }

    pub(super) fn element_count(&self) -> usize {
        self.children.iter().map(FractalArray::element_count).sum()
    }

    pub(super) fn depth(&self) -> usize {
        1 + self.children.iter().map(FractalArray::depth).max().unwrap_or(0)
    }

    /// Replaces a child, keeping the count of non-empty children in sync.
    fn set_child(&mut self, child: usize, node: FractalArray<E>, was_empty: bool) {
        self.count = self.count + was_empty as u8 - node.is_empty() as u8;
        self.children[child] = node;
    }

    /// Stores `element` at `index`, which must be covered by this fractal.
    pub(super) fn put(&mut self, index: u64, element: Option<E>) -> Option<E> {
        debug_assert!(self.contains(index));
        let (child, index) = self.locate(index);
        let node = take(&mut self.children[child]);
        let was_empty = node.is_empty();
        let (node, previous) = node.put(index, element);
        self.set_child(child, node, was_empty);
        previous
    }

    fn shift_child(&mut self, child: usize, from: u64, to: u64, inserted: Option<E>) -> Option<E> {
        let node = take(&mut self.children[child]);
        let was_empty = node.is_empty();
        let (node, removed) = node.shift(from, to, inserted);
        self.set_child(child, node, was_empty);
        removed
    }

    /// Shifts the elements between `from` and `to` (both covered by this fractal) one position
    /// towards `to`, returning the element at `to` and storing `inserted` at `from`.
    pub(super) fn shift(&mut self, from: u64, to: u64, inserted: Option<E>) -> Option<E> {
        debug_assert!(self.contains(from) && self.contains(to));
        let mask = self.span_mask();
        self.ring_shift(from & mask, to & mask, from < to, inserted)
    }

    /// Shift on the ring of indices relative to the span, see [`Block`][super::Block] for the
    /// flat version.
    fn ring_shift(&mut self, from: u64, to: u64, right: bool, inserted: Option<E>) -> Option<E> {
        let mask = self.span_mask();
        let distance = if right { to.wrapping_sub(from) } else { from.wrapping_sub(to) } & mask;

        if distance > mask / 2 {
            // Rotate everything and move the shorter complement back.
            return if right {
                self.offset = self.offset.wrapping_sub(1) & mask;
                self.ring_shift(from, to.wrapping_add(1) & mask, false, inserted)
            } else {
                self.offset = self.offset.wrapping_add(1) & mask;
                self.ring_shift(from, to.wrapping_sub(1) & mask, true, inserted)
            };
        }

        let (first, first_index) = self.locate(from);
        let (last, last_index) = self.locate(to);

        if first == last {
            // A range of at most half the span cannot wrap around within a single child.
            debug_assert!(if right {
                first_index <= last_index
            } else {
                first_index >= last_index
            });
            return self.shift_child(first, first_index, last_index, inserted);
        }

        // The range covers the tail of `first`, all children in between (which are rotated
        // as a whole) and the head of `last`, in ring order.
        let child_mask = self.child_mask();
        let (head, tail, step) = if right {
            (0, child_mask, 1)
        } else {
            (child_mask, 0, FANOUT - 1)
        };

        let mut carry = self.shift_child(first, first_index, tail, inserted);
        let mut child = (first + step) % FANOUT;
        while child != last {
            carry = self.shift_child(child, head, tail, carry);
            child = (child + step) % FANOUT;
        }
        self.shift_child(last, head, last_index, carry)
    }

    /// Returns the element with the smallest index in `lo..=hi`.
    pub(super) fn first_in(&self, lo: u64, hi: u64) -> Option<(u64, &E)> {
        let base = self.base();
        let lo = lo.max(base) - base;
        let hi = hi.min(base | self.span_mask()).checked_sub(base)?;
        if lo > hi {
            return None;
        }

        let child_mask = self.child_mask();
        let mut current = lo;
        loop {
            let (child, index) = self.locate(current);
            let len = (child_mask - index).min(hi - current);
            if let Some((found, element)) = self.children[child].first_in(index, index + len) {
                return Some((base | self.logical(child, found), element));
            }
            if len == hi - current {
                return None;
            }
            current += len + 1;
        }
    }

    /// Returns the element with the largest index in `lo..=hi`.
    pub(super) fn last_in(&self, lo: u64, hi: u64) -> Option<(u64, &E)> {
        let base = self.base();
        let lo = lo.max(base) - base;
        let hi = hi.min(base | self.span_mask()).checked_sub(base)?;
        if lo > hi {
            return None;
        }

        let mut current = hi;
        loop {
            let (child, index) = self.locate(current);
            let len = index.min(current - lo);
            if let Some((found, element)) = self.children[child].last_in(index - len, index) {
                return Some((base | self.logical(child, found), element));
            }
            if len == current - lo {
                return None;
            }
            current -= len + 1;
        }
    }

    /// Rebases the fractal into a window of `mask + 1` indices.
    pub(super) fn rebase(&mut self, mask: u64) {
        self.prefix = high_bits(self.base() & mask, self.shift + NIBBLE_BITS);
    }

    /// Moves the fractal by `delta`, a multiple of the window it currently lives in.
    pub(super) fn lift(&mut self, delta: u64) {
        self.prefix |= high_bits(delta, self.shift + NIBBLE_BITS);
    }

    /// Returns the simplest representation of this fractal's elements.
    ///
    /// A fractal left with a single non-empty child degrades to a `Single` or, when its
    /// rotation keeps the child's window aligned, to the child itself.
    pub(super) fn normalize(mut self: Box<Self>) -> FractalArray<E> {
        match self.count {
            0 => FractalArray::Empty,
            1 => {
                let Some(child) = self.children.iter().position(|node| !node.is_empty()) else {
                    unreachable!("fractal child count out of sync")
                };
                let aligned = self.offset & self.child_mask() == 0;
                match take(&mut self.children[child]) {
                    FractalArray::Single { index, element } => {
                        let index = self.base() | self.logical(child, index);
                        log::trace!("degrading fractal with shift {} to single", self.shift);
                        FractalArray::Single { index, element }
                    }
                    node if aligned => {
                        let delta = self.base() | self.logical(child, 0);
                        log::trace!("collapsing fractal with shift {} into its child", self.shift);
                        node.lift(delta)
                    }
                    node => {
                        self.children[child] = node;
                        FractalArray::Fractal(self)
                    }
                }
            }
            _ => FractalArray::Fractal(self),
        }
    }

    pub(super) fn check(&self, window: u64) -> usize {
        assert!(self.shift % NIBBLE_BITS == 0 && self.shift > 0 && self.shift < u64::BITS);
        assert!(
            self.base() | self.span_mask() <= window,
            "fractal {:#x} with shift {} exceeds its window {window:#x}",
            self.base(),
            self.shift,
        );
        assert!(self.offset <= self.span_mask());
        let non_empty = self.children.iter().filter(|node| !node.is_empty()).count();
        assert_eq!(non_empty, self.count as usize, "fractal child count out of sync");
        assert!(non_empty >= 1, "empty fractal should have degraded");
        if non_empty == 1 {
            let node = self.children.iter().find(|node| !node.is_empty());
            assert!(
                !matches!(node, Some(FractalArray::Single { .. })),
                "fractal holding a single element should have degraded"
            );
            assert!(
                self.offset & self.child_mask() != 0,
                "fractal with one aligned child should have collapsed"
            );
        }
        self.children
            .iter()
            .map(|node| node.check_within(self.child_mask()))
            .sum()
    }
}
