#![cfg(test)]
#![allow(missing_docs)]
use rand::prelude::*;

use crate::{test_util::weighted_choose, FractalTable, TableError};

struct CheckedTable<T> {
    dut: FractalTable<T>,
    ref_vec: Vec<T>,
}

impl<T: Eq + Clone + std::fmt::Debug> CheckedTable<T> {
    fn new() -> Self {
        CheckedTable {
            dut: FractalTable::new(),
            ref_vec: Vec::new(),
        }
    }
    fn get(&mut self, index: usize) -> Option<&T> {
        let ref_result = self.ref_vec.get(index);
        let dut_result = self.dut.get(index);
        assert_eq!(ref_result, dut_result);
        ref_result
    }
    fn push(&mut self, value: T) {
        self.ref_vec.push(value.clone());
        self.dut.push(value);
    }
    fn push_front(&mut self, value: T) {
        self.ref_vec.insert(0, value.clone());
        self.dut.push_front(value);
    }
    fn try_insert(&mut self, index: usize, value: T) -> Result<(), TableError> {
        let len = self.ref_vec.len();
        let ref_result = if index <= len {
            self.ref_vec.insert(index, value.clone());
            Ok(())
        } else {
            Err(TableError::OutOfBounds { index, len })
        };
        let dut_result = self.dut.try_insert(index, value);
        assert_eq!(ref_result, dut_result);
        ref_result
    }
    fn try_remove(&mut self, index: usize) -> Result<T, TableError> {
        let len = self.ref_vec.len();
        let ref_result = if index < len {
            Ok(self.ref_vec.remove(index))
        } else {
            Err(TableError::OutOfBounds { index, len })
        };
        let dut_result = self.dut.try_remove(index);
        assert_eq!(ref_result, dut_result);
        ref_result
    }
    fn try_set(&mut self, index: usize, value: T) -> Result<T, TableError> {
        let len = self.ref_vec.len();
        let ref_result = match self.ref_vec.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, value.clone())),
            None => Err(TableError::OutOfBounds { index, len }),
        };
        let dut_result = self.dut.try_set(index, value);
        assert_eq!(ref_result, dut_result);
        ref_result
    }
    fn pop(&mut self) -> Option<T> {
        let ref_result = self.ref_vec.pop();
        let dut_result = self.dut.pop();
        assert_eq!(ref_result, dut_result);
        ref_result
    }
    fn pop_front(&mut self) -> Option<T> {
        let ref_result = (!self.ref_vec.is_empty()).then(|| self.ref_vec.remove(0));
        let dut_result = self.dut.pop_front();
        assert_eq!(ref_result, dut_result);
        ref_result
    }
    fn swap(&mut self, a: usize, b: usize) {
        self.ref_vec.swap(a, b);
        self.dut.swap(a, b);
    }
    fn retain(&mut self, fun: impl Fn(&T) -> bool) {
        self.ref_vec.retain(&fun);
        self.dut.retain(&fun);
        self.check();
    }
    fn check(&mut self) {
        self.dut.check();
        assert_eq!(self.ref_vec.len(), self.dut.len());
        assert!(self.ref_vec.iter().eq(&self.dut));
        assert!(self.ref_vec.iter().rev().eq(self.dut.iter().rev()));
    }
}

fn test_suite<T: Eq + Clone + std::fmt::Debug>(
    mut rand_t: impl FnMut(&mut rand_pcg::Pcg64) -> T,
    retain_fn: impl Fn(&T) -> bool,
) {
    let mut table: CheckedTable<T> = CheckedTable::new();
    let mut rng = rand_pcg::Pcg64::seed_from_u64(25);
    let mut max_size = 0;
    let verbosity = 0;
    for _ in 0..5000 {
        weighted_choose! {&mut rng,
            Push: 1.0 => {
                let item = rand_t(&mut rng);
                if verbosity > 0 {
                    println!("pushing {item:?}");
                }
                table.push(item);
            },
            PushFront: 0.5 => {
                let item = rand_t(&mut rng);
                if verbosity > 0 {
                    println!("pushing {item:?} to the front");
                }
                table.push_front(item);
            },
            Insert: 1.0 => {
                let len = table.ref_vec.len();
                // try to generate invalid indices sometimes
                let index = rng.gen_range(0..=(len + len.div_ceil(10)));
                let item = rand_t(&mut rng);
                let result = table.try_insert(index, item);
                if verbosity > 0 {
                    println!("inserting at {index} -> {result:?}");
                }
            },
            Remove: 0.8 => {
                let len = table.ref_vec.len();
                let index = rng.gen_range(0..=(len + len.div_ceil(10)));
                let result = table.try_remove(index);
                if verbosity > 0 {
                    println!("removing at {index} -> {result:?}");
                }
            },
            Set: 0.3 => {
                let len = table.ref_vec.len();
                let index = rng.gen_range(0..=len);
                let item = rand_t(&mut rng);
                let result = table.try_set(index, item);
                if verbosity > 0 {
                    println!("setting {index} -> {result:?}");
                }
            },
            Get: 0.5 => {
                let len = table.ref_vec.len();
                let index = rng.gen_range(0..=len);
                table.get(index);
            },
            Swap: 0.2 => {
                let len = table.ref_vec.len();
                if len > 0 {
                    let (a, b) = (rng.gen_range(0..len), rng.gen_range(0..len));
                    table.swap(a, b);
                }
            },
            Pop: 0.3 => {
                let result = table.pop();
                if verbosity > 0 {
                    println!("popping -> {result:?}");
                }
            },
            PopFront: 0.3 => {
                let result = table.pop_front();
                if verbosity > 0 {
                    println!("popping front -> {result:?}");
                }
            },
            Retain: 0.02 => {
                table.retain(&retain_fn);
            },
            Check: 0.1 => {
                table.check();
            }
        };
        max_size = std::cmp::max(max_size, table.ref_vec.len());
    }
    table.check();
    println!("max size: {max_size}");
}

#[test]
fn test_suite_u32() {
    test_suite(|rng| rng.gen::<u32>(), |item| item % 17 < 15);
}

#[test]
fn test_suite_string() {
    test_suite(
        |rng| {
            let len = rng.gen_range(1..8);
            String::from_iter((0..len).map(|_| rng.gen_range('!'..'~')))
        },
        |item| !item.contains('!'),
    );
}

#[test]
fn test_insert_remove_scenario() {
    let mut table: FractalTable<_> = ["A", "B", "C", "D"].into_iter().collect();
    table.insert(2, "X");
    assert_eq!(table.remove(0), "A");
    assert!(table.iter().eq(&["B", "X", "C", "D"]));
    assert_eq!(format!("{table:?}"), r#"["B", "X", "C", "D"]"#);
    table.check();
}

#[test]
fn test_deque_ends() {
    let mut table = FractalTable::new();
    for i in 0..100 {
        table.push(i);
        table.push_front(-i - 1);
    }
    assert_eq!(table.first(), Some(&-100));
    assert_eq!(table.last(), Some(&99));
    assert!(table.iter().copied().eq(-100..100));
    table.check();
    for i in 0..100 {
        assert_eq!(table.pop_front(), Some(-100 + i));
        assert_eq!(table.pop(), Some(99 - i));
    }
    assert!(table.is_empty());
    assert_eq!(table.pop(), None);
    assert_eq!(table.pop_front(), None);
}

#[test]
fn test_sort() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(58);
    for len in [0, 1, 2, 7, 8, 9, 100, 1000] {
        let mut reference: Vec<u16> = (0..len).map(|_| rng.gen_range(0..50)).collect();
        let mut table: FractalTable<u16> = reference.iter().copied().collect();
        reference.sort();
        table.sort();
        assert!(table.iter().eq(&reference));
        table.sort_by(|a, b| b.cmp(a));
        assert!(table.iter().eq(reference.iter().rev()));
        table.check();
    }
}

#[test]
fn test_search() {
    let table: FractalTable<_> = [3, 1, 4, 1, 5, 9, 2, 6].into_iter().collect();
    assert!(table.contains(&9));
    assert!(!table.contains(&7));
    assert_eq!(table.index_of(&1), Some(1));
    assert_eq!(table.last_index_of(&1), Some(3));
    assert_eq!(table.index_of(&7), None);
}

#[test]
fn test_truncate_extend() {
    let mut table: FractalTable<_> = (0..500).collect();
    table.truncate(100);
    assert_eq!(table.len(), 100);
    table.extend(0..10);
    assert_eq!(table[105], 5);
    table[105] = 42;
    assert_eq!(table.get(105), Some(&42));
    table.check();
    assert!(table.clone().into_iter().rev().eq(table.iter().rev().copied()));
}

#[test]
fn test_out_of_bounds() {
    let mut table: FractalTable<_> = (0..3).collect();
    assert_eq!(
        table.try_remove(3),
        Err(TableError::OutOfBounds { index: 3, len: 3 })
    );
    assert_eq!(
        table.try_insert(5, 0).unwrap_err().to_string(),
        "index 5 out of bounds for table of length 3"
    );
    assert_eq!(table.try_set(2, 7), Ok(2));
}

#[test]
#[should_panic(expected = "insertion index (is 4) should be <= len (is 3)")]
fn test_insert_panics() {
    let mut table: FractalTable<_> = (0..3).collect();
    table.insert(4, 0);
}

#[test]
fn test_clone_isolation() {
    let original: FractalTable<_> = (0..2000).collect();
    let mut copy = original.clone();
    copy.insert(0, -1);
    copy.remove(1000);
    copy.set(5, 5000);
    assert!(original.iter().copied().eq(0..2000));
    assert_ne!(original, copy);
    original.check();
    copy.check();

    let mut original = original;
    let copied: Vec<_> = copy.iter().copied().collect();
    original.push_front(-7);
    original.remove(500);
    original.set(10, 9999);
    original.truncate(1500);
    assert!(copy.iter().eq(copied.iter()));
    assert_eq!(copy.len(), 2000);
    original.check();
    copy.check();
}
