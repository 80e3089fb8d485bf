#![cfg(test)]
#![allow(missing_docs)]
use std::collections::BTreeMap;

use rand::prelude::*;

use crate::{
    test_util::{weighted_choose, Spread},
    FractalArray,
};

struct CheckedArray {
    dut: FractalArray<u64>,
    ref_map: BTreeMap<u64, u64>,
}

impl CheckedArray {
    fn new() -> Self {
        CheckedArray {
            dut: FractalArray::new(),
            ref_map: BTreeMap::new(),
        }
    }

    fn get(&mut self, index: u64) -> Option<u64> {
        let ref_result = self.ref_map.get(&index).copied();
        let dut_result = self.dut.get(index).copied();
        assert_eq!(ref_result, dut_result);
        ref_result
    }

    fn replace(&mut self, index: u64, element: Option<u64>) -> Option<u64> {
        let ref_result = match element {
            Some(element) => self.ref_map.insert(index, element),
            None => self.ref_map.remove(&index),
        };
        let dut_result = self.dut.replace(index, element);
        assert_eq!(ref_result, dut_result);
        ref_result
    }

    fn ceiling(&mut self, min: u64) -> Option<(u64, u64)> {
        let ref_result = self.ref_map.range(min..).next().map(|(&i, &e)| (i, e));
        let dut_result = self.dut.ceiling(min).map(|(i, &e)| (i, e));
        assert_eq!(ref_result, dut_result);
        ref_result
    }

    fn floor(&mut self, max: u64) -> Option<(u64, u64)> {
        let ref_result = self.ref_map.range(..=max).next_back().map(|(&i, &e)| (i, e));
        let dut_result = self.dut.floor(max).map(|(i, &e)| (i, e));
        assert_eq!(ref_result, dut_result);
        ref_result
    }

    fn shift(&mut self, from: u64, to: u64, inserted: Option<u64>) -> Option<u64> {
        let ref_result = self.ref_map.remove(&to);
        if from < to {
            let moved: Vec<_> = self.ref_map.range(from..to).map(|(&i, _)| i).rev().collect();
            for index in moved {
                let element = self.ref_map.remove(&index).unwrap();
                self.ref_map.insert(index + 1, element);
            }
        } else if from > to {
            let moved: Vec<_> = self.ref_map.range(to + 1..=from).map(|(&i, _)| i).collect();
            for index in moved {
                let element = self.ref_map.remove(&index).unwrap();
                self.ref_map.insert(index - 1, element);
            }
        }
        if let Some(element) = inserted {
            self.ref_map.insert(from, element);
        }

        let (dut, dut_result) = std::mem::take(&mut self.dut).shift(from, to, inserted);
        self.dut = dut;
        assert_eq!(ref_result, dut_result);
        ref_result
    }

    fn check(&mut self) {
        assert_eq!(self.dut.check(), self.ref_map.len());
        assert!(self
            .ref_map
            .iter()
            .map(|(&i, &e)| (i, e))
            .eq(self.dut.iter().map(|(i, &e)| (i, e))));
        assert!(self
            .ref_map
            .iter()
            .rev()
            .map(|(&i, &e)| (i, e))
            .eq(self.dut.iter().rev().map(|(i, &e)| (i, e))));
    }
}

fn test_suite(spread: Spread, seed: u64) {
    let mut array = CheckedArray::new();
    let mut rng = rand_pcg::Pcg64::seed_from_u64(seed);
    let mut max_size = 0;
    let mut max_depth = 0;
    let verbosity = 0;
    for _ in 0..5000 {
        weighted_choose! {&mut rng,
            Set: 1.0 => {
                let index = spread.index(&mut rng);
                let element = rng.gen();
                let result = array.replace(index, Some(element));
                if verbosity > 0 {
                    println!("setting {index:#x} to {element} -> {result:?}");
                }
            },
            ClearPresent: 0.4 => {
                if let Some(index) = array.ref_map.keys().choose(&mut rng).copied() {
                    let result = array.replace(index, None);
                    if verbosity > 0 {
                        println!("clearing {index:#x} -> {result:?}");
                    }
                }
            },
            ClearRandom: 0.2 => {
                let index = spread.index(&mut rng);
                let result = array.replace(index, None);
                if verbosity > 0 {
                    println!("clearing {index:#x} -> {result:?}");
                }
            },
            Get: 0.5 => {
                let index = spread.index(&mut rng);
                array.get(index);
            },
            Ceiling: 0.3 => {
                let index = spread.index(&mut rng);
                array.ceiling(index);
            },
            Floor: 0.3 => {
                let index = spread.index(&mut rng);
                array.floor(index);
            },
            Shift: 0.4 => {
                let from = spread.index(&mut rng);
                let to = spread.index(&mut rng);
                let inserted = rng.gen_bool(0.5).then(|| rng.gen());
                let result = array.shift(from, to, inserted);
                if verbosity > 0 {
                    println!("shifting {from:#x} -> {to:#x} with {inserted:?} -> {result:?}");
                }
            },
            Insert: 0.3 => {
                let index = spread.index(&mut rng);
                if let Some(&last) = array.ref_map.keys().next_back() {
                    if last >= index && last < u64::MAX {
                        let element = rng.gen();
                        array.shift(index, last + 1, Some(element));
                        if verbosity > 0 {
                            println!("inserting {element} at {index:#x}");
                        }
                    }
                }
            },
            Remove: 0.3 => {
                if let Some(index) = array.ref_map.keys().choose(&mut rng).copied() {
                    let last = *array.ref_map.keys().next_back().unwrap();
                    let result = array.shift(last, index, None);
                    if verbosity > 0 {
                        println!("removing {index:#x} -> {result:?}");
                    }
                }
            },
            Check: 0.1 => {
                array.check();
            }
        };
        max_size = max_size.max(array.ref_map.len());
        max_depth = max_depth.max(array.dut.depth());
    }
    array.check();
    println!("max size: {max_size}, max depth: {max_depth}");
}

#[test]
fn test_suite_dense() {
    test_suite(Spread::Dense(300), 25);
}

#[test]
fn test_suite_tiny() {
    test_suite(Spread::Dense(20), 26);
}

#[test]
fn test_suite_clustered() {
    test_suite(Spread::Clustered, 27);
}

#[test]
fn test_suite_wide() {
    test_suite(Spread::Wide, 28);
}

#[test]
fn test_escalation_steps() {
    let array = FractalArray::new();
    assert_eq!(array.variant(), "Empty");
    let array = array.set(17, 'a');
    assert_eq!(array.variant(), "Single");
    let array = array.set(18, 'b');
    assert_eq!(array.variant(), "Block");
    let array = array.set(1 << 40, 'c');
    assert_eq!(array.variant(), "Fractal");
    array.check();

    let array = array.clear(1 << 40);
    assert_eq!(array.variant(), "Block");
    let array = array.clear(17);
    assert_eq!(array.variant(), "Single");
    assert_eq!(array.get(18), Some(&'b'));
    let array = array.clear(18);
    assert_eq!(array.variant(), "Empty");
}

#[test]
fn test_distant_pair() {
    let array = FractalArray::new().set(0, 0).set(u64::MAX, 1);
    assert_eq!(array.variant(), "Fractal");
    assert_eq!(array.depth(), 2);
    array.check();
    assert_eq!(array.first(), Some((0, &0)));
    assert_eq!(array.last(), Some((u64::MAX, &1)));
    assert_eq!(array.ceiling(1), Some((u64::MAX, &1)));
    assert_eq!(array.floor(u64::MAX - 1), Some((0, &0)));
}

#[test]
fn test_rotation_preserves_contents() {
    // Repeated front insertions rotate every level of the tree.
    let mut array = FractalArray::new();
    let mut reference = Vec::new();
    for i in 0..1000u64 {
        let len = reference.len() as u64;
        array = array.shift(0, len, Some(i)).0;
        reference.insert(0, i);
        if i % 97 == 0 {
            array.check();
        }
    }
    array.check();
    assert!(array.iter().map(|(_, &e)| e).eq(reference.iter().copied()));

    while let Some(expected) = (!reference.is_empty()).then(|| reference.remove(0)) {
        let (next, removed) = array.remove(0);
        array = next;
        assert_eq!(removed, Some(expected));
    }
    assert!(array.is_empty());
}

#[test]
fn test_insert_remove() {
    let array: FractalArray<_> = (0..40u64).map(|i| (i, i)).collect();
    let array = array.insert(7, 100);
    assert_eq!(array.get(7), Some(&100));
    assert_eq!(array.get(8), Some(&7));
    assert_eq!(array.get(40), Some(&39));
    let (array, removed) = array.remove(7);
    assert_eq!(removed, Some(100));
    assert!(array.iter().map(|(i, &e)| (i, e)).eq((0..40).map(|i| (i, i))));
    array.check();
}

#[test]
fn test_range_iter() {
    let array: FractalArray<_> = (0..1000u64).map(|i| (i * 3, i)).collect();
    assert!(array.range(10, 20).map(|(i, _)| i).eq([12, 15, 18]));
    assert!(array.range(10, 20).rev().map(|(i, _)| i).eq([18, 15, 12]));
    assert_eq!(array.range(20, 10).next(), None);
    assert_eq!(array.iter().count(), 1000);
}

#[test]
fn test_clone_isolation() {
    let arrays = [
        FractalArray::new(),
        FractalArray::new().set(3, 3),
        (0..10).map(|i| (i, i)).collect(),
        (0..5000).map(|i| (i * 7919, i)).collect(),
    ];
    for mut original in arrays {
        let snapshot: Vec<_> = original.iter().map(|(i, &e)| (i, e)).collect();
        let mut copy = original.clone();
        assert!(copy == original);
        for index in [0, 3, 9, 7919, 1 << 33] {
            copy.replace(index, Some(u64::MAX));
        }
        copy = copy.shift(1, 20_000, Some(5)).0;
        assert!(original.iter().map(|(i, &e)| (i, e)).eq(snapshot.iter().copied()));
        original.check();
        copy.check();

        let copied: Vec<_> = copy.iter().map(|(i, &e)| (i, e)).collect();
        for index in [0, 3, 4, 7919 * 2, 1 << 40] {
            original.replace(index, Some(7));
        }
        original = original.shift(30_000, 2, None).0;
        original = original.clear(9);
        assert!(copy.iter().map(|(i, &e)| (i, e)).eq(copied.iter().copied()));
        original.check();
        copy.check();
    }
}

#[test]
fn test_debug_format() {
    let array = FractalArray::new().set(2, "b").set(1, "a");
    assert_eq!(format!("{array:?}"), r#"{1: "a", 2: "b"}"#);
}
