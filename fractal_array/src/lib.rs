//! Fractal arrays are sparse, self-resizing arrays indexed by `u64` which support shifting a
//! range of elements by one position in logarithmic time.
//!
//! [`FractalArray`] adapts its representation to its contents, from a single element over a
//! flat block of 16 slots up to a 16-ary tree of rotated rings. [`FractalTable`] builds a
//! positional list on top of it, where inserting or removing at any position, including the
//! front, does not move the remaining elements one by one.
//!
//! ```
//! use fractal_array::FractalTable;
//!
//! let mut table: FractalTable<char> = "ABCD".chars().collect();
//! table.insert(2, 'X');
//! assert_eq!(table.remove(0), 'A');
//! assert_eq!(table.iter().collect::<String>(), "BXCD");
//! ```
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod array;
pub mod table;

pub use array::FractalArray;
pub use table::{FractalTable, TableError};

#[cfg(test)]
mod test_array;
#[cfg(test)]
mod test_table;
