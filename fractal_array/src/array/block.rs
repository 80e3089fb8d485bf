use fractal_util::nibble::{FANOUT, NIBBLE_BITS, NIBBLE_MASK};

/// Number of slots of a [`Block`].
pub const ARRAY_LENGTH: usize = FANOUT;

/// Flat leaf node holding up to [`ARRAY_LENGTH`] elements with consecutive indices.
///
/// The block covers the 16 indices sharing `prefix` as their high bits. Slots are addressed
/// through a rotation `offset`: the element with low nibble `j` lives in slot
/// `(j + offset) & 0xf`. Rotating the whole block by one position therefore only updates the
/// offset.
#[derive(Clone)]
pub struct Block<E> {
    prefix: u64,
    offset: u8,
    count: u8,
    slots: [Option<E>; ARRAY_LENGTH],
}

impl<E> Block<E> {
    /// Creates a block holding two elements. Both indices must share the same prefix.
    pub(super) fn pair(a: u64, x: E, b: u64, y: E) -> Self {
        debug_assert_eq!(a >> NIBBLE_BITS, b >> NIBBLE_BITS);
        debug_assert_ne!(a, b);
        let mut slots: [Option<E>; ARRAY_LENGTH] = Default::default();
        slots[(a & NIBBLE_MASK) as usize] = Some(x);
        slots[(b & NIBBLE_MASK) as usize] = Some(y);
        Block {
            prefix: a >> NIBBLE_BITS,
            offset: 0,
            count: 2,
            slots,
        }
    }

    #[inline(always)]
    pub(super) fn base(&self) -> u64 {
        self.prefix << NIBBLE_BITS
    }

    #[inline(always)]
    pub(super) fn count(&self) -> usize {
        self.count as usize
    }

    #[inline(always)]
    pub(super) fn contains(&self, index: u64) -> bool {
        index >> NIBBLE_BITS == self.prefix
    }

    #[inline(always)]
    fn slot(&self, index: u64) -> usize {
        (index.wrapping_add(self.offset as u64) & NIBBLE_MASK) as usize
    }

    #[inline(always)]
    fn logical(&self, slot: usize) -> u64 {
        (slot as u64).wrapping_sub(self.offset as u64) & NIBBLE_MASK
    }

    pub(super) fn get(&self, index: u64) -> Option<&E> {
        if !self.contains(index) {
            return None;
        }
        self.slots[self.slot(index)].as_ref()
    }

    pub(super) fn get_mut(&mut self, index: u64) -> Option<&mut E> {
        if !self.contains(index) {
            return None;
        }
        let slot = self.slot(index);
        self.slots[slot].as_mut()
    }

    /// Stores `element` at `index`, which must be covered by this block.
    pub(super) fn put(&mut self, index: u64, element: Option<E>) -> Option<E> {
        debug_assert!(self.contains(index));
        let slot = self.slot(index);
        let added = element.is_some() as u8;
        let previous = std::mem::replace(&mut self.slots[slot], element);
        self.count = self.count + added - previous.is_some() as u8;
        previous
    }

    /// Rebases the block into a window of `mask + 1` indices.
    pub(super) fn rebase(&mut self, mask: u64) {
        self.prefix = (self.base() & mask) >> NIBBLE_BITS;
    }

    /// Moves the block by `delta`, a multiple of the window it currently lives in.
    pub(super) fn lift(&mut self, delta: u64) {
        self.prefix |= delta >> NIBBLE_BITS;
    }

    /// Shifts the elements between `from` and `to` (both covered by this block) one position
    /// towards `to`, returning the element at `to` and storing `inserted` at `from`.
    pub(super) fn shift(&mut self, from: u64, to: u64, inserted: Option<E>) -> Option<E> {
        debug_assert!(self.contains(from) && self.contains(to));
        let removed = self.ring_shift(from & NIBBLE_MASK, to & NIBBLE_MASK, from < to, inserted);
        self.recount();
        removed
    }

    /// Shift on the ring of low nibbles.
    ///
    /// `right` means elements move towards higher indices, and the range wraps around when `to`
    /// lies on the other side of `from`.
    fn ring_shift(&mut self, from: u64, to: u64, right: bool, inserted: Option<E>) -> Option<E> {
        let distance = if right {
            to.wrapping_sub(from)
        } else {
            from.wrapping_sub(to)
        } & NIBBLE_MASK;

        if distance > NIBBLE_MASK / 2 {
            // Rotate everything and move the shorter complement back.
            return if right {
                self.offset = self.offset.wrapping_sub(1) & NIBBLE_MASK as u8;
                self.ring_shift(from, to.wrapping_add(1) & NIBBLE_MASK, false, inserted)
            } else {
                self.offset = self.offset.wrapping_add(1) & NIBBLE_MASK as u8;
                self.ring_shift(from, to.wrapping_sub(1) & NIBBLE_MASK, true, inserted)
            };
        }

        let to_slot = self.slot(to);
        let removed = self.slots[to_slot].take();
        let mut pos = to;
        while pos != from {
            let next = if right { pos.wrapping_sub(1) } else { pos.wrapping_add(1) } & NIBBLE_MASK;
            let (src, dst) = (self.slot(next), self.slot(pos));
            self.slots[dst] = self.slots[src].take();
            pos = next;
        }
        let from_slot = self.slot(from);
        self.slots[from_slot] = inserted;
        removed
    }

    fn recount(&mut self) {
        self.count = self.slots.iter().filter(|slot| slot.is_some()).count() as u8;
    }

    /// Returns the element with the smallest index in `lo..=hi`.
    pub(super) fn first_in(&self, lo: u64, hi: u64) -> Option<(u64, &E)> {
        let base = self.base();
        let lo = lo.max(base);
        let hi = hi.min(base | NIBBLE_MASK);
        if lo > hi {
            return None;
        }
        (lo..=hi).find_map(|index| Some((index, self.slots[self.slot(index)].as_ref()?)))
    }

    /// Returns the element with the largest index in `lo..=hi`.
    pub(super) fn last_in(&self, lo: u64, hi: u64) -> Option<(u64, &E)> {
        let base = self.base();
        let lo = lo.max(base);
        let hi = hi.min(base | NIBBLE_MASK);
        if lo > hi {
            return None;
        }
        (lo..=hi)
            .rev()
            .find_map(|index| Some((index, self.slots[self.slot(index)].as_ref()?)))
    }

    /// Consumes a block holding a single element and returns that element with its index.
    pub(super) fn into_sole(self) -> (u64, E) {
        debug_assert_eq!(self.count, 1);
        let base = self.base();
        let offset = self.offset;
        for (slot, element) in self.slots.into_iter().enumerate() {
            if let Some(element) = element {
                let index = base | ((slot as u64).wrapping_sub(offset as u64) & NIBBLE_MASK);
                return (index, element);
            }
        }
        unreachable!("block element count out of sync")
    }

    pub(super) fn check(&self, window: u64) {
        assert!(
            self.base() | NIBBLE_MASK <= window,
            "block {:#x} exceeds its window {window:#x}",
            self.base()
        );
        assert!(self.offset as u64 <= NIBBLE_MASK);
        let live = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(live, self.count as usize, "block count out of sync");
        assert!(live >= 2, "block with {live} elements should have degraded");
        for slot in 0..ARRAY_LENGTH {
            let index = self.base() | self.logical(slot);
            assert_eq!(self.get(index).is_some(), self.slots[slot].is_some());
        }
    }
}
