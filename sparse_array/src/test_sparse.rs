#![cfg(test)]
#![allow(missing_docs)]
use std::collections::BTreeMap;

use rand::prelude::*;

use crate::{CompactSparseArray, FractalSparse, IndexedArray, ProbedArray, SparseArray};

macro_rules! weighted_choose {
    ($rng:expr, $($name:ident: $weight:expr => $body:expr),+) => {
        {
            enum Branches { $( $name,  )* }
            let weights = [$((Branches::$name, $weight)),+];
            match weights.choose_weighted($rng, |x| x.1).unwrap().0 {
                $(Branches::$name => $body),*
            }
        }
    }
}

/// Arrays under test, with their invariant check.
trait Checked: IndexedArray<u64> + Clone {
    fn check_all(&self) -> usize;
}

impl Checked for SparseArray<u64> {
    fn check_all(&self) -> usize {
        self.check()
    }
}

impl Checked for ProbedArray<u64> {
    fn check_all(&self) -> usize {
        self.check()
    }
}

impl Checked for CompactSparseArray<u64> {
    fn check_all(&self) -> usize {
        self.check()
    }
}

impl Checked for FractalSparse<u64> {
    fn check_all(&self) -> usize {
        self.check()
    }
}

struct CheckedArray<A> {
    dut: A,
    ref_map: BTreeMap<u64, u64>,
}

impl<A: Checked> CheckedArray<A> {
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
        assert_eq!(self.ref_map.len(), self.dut.len());
        ref_result
    }
    fn increment(&mut self, index: u64) {
        let ref_result = self.ref_map.get_mut(&index).map(|element| {
            *element = element.wrapping_add(1);
            *element
        });
        let dut_result = self.dut.get_mut(index).map(|element| {
            *element = element.wrapping_add(1);
            *element
        });
        assert_eq!(ref_result, dut_result);
    }
    fn ceiling(&mut self, min: u64) {
        let ref_result = self.ref_map.range(min..).next().map(|(&i, &e)| (i, e));
        let dut_result = self.dut.ceiling(min).map(|(i, &e)| (i, e));
        assert_eq!(ref_result, dut_result);
    }
    fn floor(&mut self, max: u64) {
        let ref_result = self.ref_map.range(..=max).next_back().map(|(&i, &e)| (i, e));
        let dut_result = self.dut.floor(max).map(|(i, &e)| (i, e));
        assert_eq!(ref_result, dut_result);
    }
    fn check(&mut self) {
        assert_eq!(self.dut.check_all(), self.ref_map.len());
        assert!(self
            .ref_map
            .iter()
            .map(|(&i, &e)| (i, e))
            .eq(IndexedArray::iter(&self.dut).map(|(i, &e)| (i, e))));
        assert!(self
            .ref_map
            .iter()
            .rev()
            .map(|(&i, &e)| (i, e))
            .eq(IndexedArray::iter(&self.dut).rev().map(|(i, &e)| (i, e))));
    }
}

fn test_suite<A: Checked>(
    dut: A,
    seed: u64,
    mut rand_index: impl FnMut(&mut rand_pcg::Pcg64) -> u64,
) {
    let mut array = CheckedArray {
        dut,
        ref_map: BTreeMap::new(),
    };
    let mut rng = rand_pcg::Pcg64::seed_from_u64(seed);
    let mut max_size = 0;
    // Alternate between growing and shrinking phases to cross the resize thresholds.
    for round in 0..8 {
        let growing = round % 2 == 0;
        for _ in 0..1500 {
            weighted_choose! {&mut rng,
                Set: if growing { 2.0 } else { 0.3 } => {
                    let index = rand_index(&mut rng);
                    array.replace(index, Some(rng.gen()));
                },
                ClearPresent: if growing { 0.3 } else { 2.0 } => {
                    if let Some(index) = array.ref_map.keys().choose(&mut rng).copied() {
                        array.replace(index, None);
                    }
                },
                ClearRandom: 0.2 => {
                    let index = rand_index(&mut rng);
                    array.replace(index, None);
                },
                Get: 0.5 => {
                    let index = rand_index(&mut rng);
                    array.get(index);
                },
                Increment: 0.2 => {
                    if let Some(index) = array.ref_map.keys().choose(&mut rng).copied() {
                        array.increment(index);
                    }
                },
                Ceiling: 0.4 => {
                    let index = rand_index(&mut rng);
                    array.ceiling(index);
                },
                Floor: 0.4 => {
                    let index = rand_index(&mut rng);
                    array.floor(index);
                },
                Check: 0.02 => {
                    array.check();
                }
            };
            max_size = max_size.max(array.ref_map.len());
        }
        array.check();
    }

    let snapshot = array.dut.clone();
    for index in array.ref_map.keys().copied().collect::<Vec<_>>() {
        array.replace(index, None);
    }
    assert!(array.dut.is_empty());
    assert_eq!(snapshot.len(), snapshot.check_all());
    println!("max size: {max_size}");
}

fn wide(rng: &mut rand_pcg::Pcg64) -> u64 {
    rng.gen::<u64>() >> rng.gen_range(0..u64::BITS)
}

fn bounded(bits: u32) -> impl FnMut(&mut rand_pcg::Pcg64) -> u64 {
    move |rng| rng.gen::<u64>() >> (u64::BITS - bits) >> rng.gen_range(0..bits)
}

#[test]
fn test_suite_trie_wide() {
    test_suite(SparseArray::new(), 25, wide);
}

#[test]
fn test_suite_trie_dense() {
    test_suite(SparseArray::new(), 26, |rng| rng.gen_range(0..2000));
}

#[test]
fn test_suite_probed() {
    test_suite(ProbedArray::new(64), 27, wide);
}

#[test]
fn test_suite_probed_narrow() {
    test_suite(ProbedArray::new(12), 28, bounded(12));
}

#[test]
fn test_suite_compact_wide() {
    test_suite(CompactSparseArray::new(64), 29, wide);
}

#[test]
fn test_suite_compact_dense() {
    test_suite(CompactSparseArray::new(20), 30, |rng| rng.gen_range(0..3000));
}

#[test]
fn test_suite_fractal_sparse() {
    test_suite(FractalSparse::new(40), 31, bounded(40));
}

#[test]
fn test_trie_collapse() {
    let array = SparseArray::new().set(1, 'a').set(2, 'b').set(1 << 30, 'c');
    assert_eq!(array.depth(), 3);
    array.check();
    let array = array.clear(1 << 30);
    assert_eq!(array.depth(), 2);
    let array = array.clear(1);
    assert!(matches!(array, SparseArray::Unary { index: 2, element: 'b' }));
    let array = array.clear(2);
    assert!(array.is_empty());
}

#[test]
fn test_compact_split_and_merge() {
    let mut array = CompactSparseArray::new(64);
    for i in 0..256u64 {
        array.replace(i << 20, Some(i));
        assert_eq!(array.variant(), "Probed");
    }
    array.replace(256 << 20, Some(256));
    assert_eq!(array.variant(), "Fractal");
    assert_eq!(array.len(), 257);
    array.check();

    for i in 0..129u64 {
        assert_eq!(array.take(i << 20), Some(i));
    }
    assert_eq!(array.variant(), "Fractal");
    assert_eq!(array.take(129 << 20), Some(129));
    assert_eq!(array.variant(), "Probed");
    assert_eq!(array.len(), 127);
    array.check();
}

#[test]
#[should_panic(expected = "index 0x100000 exceeds 8 bits")]
fn test_probed_rejects_wide_index() {
    let mut array = CompactSparseArray::new(8);
    array.replace(1 << 20, Some(1));
}

#[test]
#[should_panic(expected = "index 0x10000000000 exceeds 16 bits")]
fn test_fractal_rejects_wide_index() {
    let mut array = CompactSparseArray::new(16);
    for i in 0..300u64 {
        array.replace(i * 200, Some(i));
    }
    assert_eq!(array.variant(), "Fractal");
    array.replace(1 << 40, Some(999));
}

#[test]
fn test_widest_index_fits() {
    let mut array = CompactSparseArray::new(16);
    for i in 0..300u64 {
        array.replace(i * 200, Some(i));
    }
    array.replace(0xffff, Some(999));
    assert_eq!(array.get(0xffff), Some(&999));
    for i in 0..200u64 {
        assert_eq!(array.take(i * 200), Some(i));
    }
    assert_eq!(array.variant(), "Probed");
    assert_eq!(array.get(0xffff), Some(&999));
    array.check();
}

#[test]
fn test_debug_format() {
    let array: CompactSparseArray<_> = [(7, "x"), (3, "y")].into_iter().collect();
    assert_eq!(format!("{array:?}"), r#"{3: "y", 7: "x"}"#);
    let array: SparseArray<_> = [(7, "x"), (3, "y")].into_iter().collect();
    assert_eq!(format!("{array:?}"), r#"{3: "y", 7: "x"}"#);
}
