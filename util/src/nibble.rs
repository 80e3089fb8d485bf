//! Index arithmetic for 16-way tries over unsigned 64-bit indices.
//!
//! All trie nodes in this workspace split an index into groups of [`NIBBLE_BITS`] bits. A node
//! with child shift `s` selects its child with the nibble `(index >> s) & 0xf` and covers the
//! aligned span of `1 << (s + 4)` indices sharing the bits above `s + 4`.
//!
//! Shifts can reach the full width of the index (a root node covering the whole `u64` space),
//! where the plain `>>` and `<<` operators would overflow, so the helpers here saturate instead.

/// Number of index bits consumed by one trie level.
pub const NIBBLE_BITS: u32 = 4;

/// Number of children of a trie node (and slots of a flat block).
pub const FANOUT: usize = 1 << NIBBLE_BITS;

/// Mask selecting a nibble.
pub const NIBBLE_MASK: u64 = FANOUT as u64 - 1;

/// Number of bits of an index.
pub const INDEX_BITS: u32 = u64::BITS;

/// Returns a mask with the low `bits` bits set, saturating at the full index width.
#[inline(always)]
pub fn low_mask(bits: u32) -> u64 {
    if bits >= INDEX_BITS {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Returns `index >> bits`, or zero when `bits` covers the whole index.
#[inline(always)]
pub fn high_bits(index: u64, bits: u32) -> u64 {
    index.checked_shr(bits).unwrap_or(0)
}

/// Returns `prefix << bits`, or zero when `bits` covers the whole index.
#[inline(always)]
pub fn from_high_bits(prefix: u64, bits: u32) -> u64 {
    prefix.checked_shl(bits).unwrap_or(0)
}

/// Returns the nibble of `index` selected by `shift`.
#[inline(always)]
pub fn nibble(index: u64, shift: u32) -> usize {
    (high_bits(index, shift) & NIBBLE_MASK) as usize
}

/// Returns the shift of the highest nibble in which the set bits of `diff` lie.
///
/// This is the child shift of the smallest trie node that can hold indices differing by `diff`
/// (in the XOR sense). Returns `0` when `diff` is zero or fits into the lowest nibble.
#[inline(always)]
pub fn diff_shift(diff: u64) -> u32 {
    if diff == 0 {
        0
    } else {
        (INDEX_BITS - 1 - diff.leading_zeros()) / NIBBLE_BITS * NIBBLE_BITS
    }
}

/// Returns the child shift of the smallest trie node holding both indices.
///
/// Both indices map to distinct children of such a node, unless they are equal.
///
/// ```
/// use fractal_util::nibble::common_shift;
/// assert_eq!(common_shift(5, 7), 0);
/// assert_eq!(common_shift(5, 21), 4);
/// assert_eq!(common_shift(0, u64::MAX), 60);
/// ```
#[inline(always)]
pub fn common_shift(a: u64, b: u64) -> u32 {
    diff_shift(a ^ b)
}
