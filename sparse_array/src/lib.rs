//! Sparse arrays map `u64` indices to elements and support ordered navigation.
//!
//! Two families are provided, both implementing [`IndexedArray`]:
//!
//! * [`SparseArray`] is a 16-way trie storing absolute indices, which only branches where
//!   indices diverge.
//! * [`CompactSparseArray`] starts out as an ordered open addressing table ([`ProbedArray`])
//!   and recursively splits its indices in half ([`FractalSparse`]) once it grows beyond
//!   [`compact::MAX_SIZE`] elements.
//!
//! Both adapt their representation as elements are added and removed and return to an empty
//! representation once all elements are removed.
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod compact;
pub mod fractal;
pub mod probed;
pub mod trie;

pub use compact::CompactSparseArray;
pub use fractal::FractalSparse;
pub use fractal_util::IndexedArray;
pub use probed::ProbedArray;
pub use trie::SparseArray;

#[cfg(test)]
mod test_sparse;
