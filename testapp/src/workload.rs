//! Randomized workloads run against reference models.
use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use clap::ValueEnum;
use color_eyre::eyre::{ensure, Result};
use fractal_array::{FractalArray, FractalTable};
use fractal_util::IndexedArray;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use sparse_array::{CompactSparseArray, ProbedArray, SparseArray};

/// Distribution of the indices used by a workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Spread {
    /// Indices below `ops`.
    Dense,
    /// A handful of clusters spread over the index space.
    Clustered,
    /// Random magnitudes over the whole index space.
    Wide,
}

impl Spread {
    fn index(self, rng: &mut SmallRng, ops: usize) -> u64 {
        match self {
            Spread::Dense => rng.gen_range(0..ops.max(1) as u64),
            Spread::Clustered => {
                let cluster: u64 = rng.gen_range(0..8);
                (cluster << 56) + rng.gen_range(0..4096)
            }
            Spread::Wide => (rng.gen::<u64>() >> rng.gen_range(0..u64::BITS)).min(u64::MAX >> 1),
        }
    }
}

/// The data structure exercised by a workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Structure {
    /// `FractalArray` with sets, clears and positional shifts.
    Array,
    /// `FractalTable` used as a list and a deque.
    Table,
    /// The `SparseArray` trie.
    Trie,
    /// A single `ProbedArray` table.
    Probed,
    /// `CompactSparseArray` with fractal splits.
    Compact,
}

/// Workload parameters shared by all structures.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    pub ops: usize,
    pub seed: u64,
    pub spread: Spread,
    pub check_every: Option<usize>,
}

/// Outcome of a workload.
#[derive(Debug)]
pub struct Summary {
    pub structure: Structure,
    pub ops: usize,
    pub len: usize,
    pub max_len: usize,
    pub depth: usize,
    pub variant: &'static str,
    pub elapsed: Duration,
}

impl Summary {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "structure": format!("{:?}", self.structure).to_lowercase(),
            "ops": self.ops,
            "len": self.len,
            "max_len": self.max_len,
            "depth": self.depth,
            "variant": self.variant,
            "elapsed_ms": self.elapsed.as_secs_f64() * 1000.0,
        })
    }
}

pub fn run(structure: Structure, options: Options) -> Result<Summary> {
    log::info!("running {structure:?} workload with {} operations", options.ops);
    match structure {
        Structure::Array => run_array(options),
        Structure::Table => run_table(options),
        Structure::Trie => run_indexed(structure, SparseArray::new(), options, |array| {
            (array.check(), array.depth(), "Trie")
        }),
        Structure::Probed => run_indexed(structure, ProbedArray::new(64), options, |array| {
            (array.check(), 0, "Probed")
        }),
        Structure::Compact => {
            run_indexed(structure, CompactSparseArray::new(64), options, |array| {
                (array.check(), array.depth(), array.variant())
            })
        }
    }
}

fn is_due(options: &Options, op: usize) -> bool {
    options.check_every.is_some_and(|every| op % every == every - 1)
}

/// Sets, clears and navigation on any indexed array, compared against a `BTreeMap`.
fn run_indexed<A: IndexedArray<u64>>(
    structure: Structure,
    mut array: A,
    options: Options,
    inspect: impl Fn(&A) -> (usize, usize, &'static str),
) -> Result<Summary> {
    let mut rng = SmallRng::seed_from_u64(options.seed);
    let mut reference = BTreeMap::new();
    let mut max_len = 0;
    let start = Instant::now();

    for op in 0..options.ops {
        let index = options.spread.index(&mut rng, options.ops);
        match rng.gen_range(0..10) {
            0..=4 => {
                let element = rng.gen();
                let previous = array.replace(index, Some(element));
                ensure!(
                    previous == reference.insert(index, element),
                    "{structure:?}: set {index:#x} returned {previous:?}"
                );
            }
            5..=6 => {
                let previous = array.take(index);
                ensure!(
                    previous == reference.remove(&index),
                    "{structure:?}: clear {index:#x} returned {previous:?}"
                );
            }
            7 => {
                let found = array.ceiling(index).map(|(i, &e)| (i, e));
                let expected = reference.range(index..).next().map(|(&i, &e)| (i, e));
                ensure!(
                    found == expected,
                    "{structure:?}: ceiling {index:#x} is {found:?}, expected {expected:?}"
                );
            }
            8 => {
                let found = array.floor(index).map(|(i, &e)| (i, e));
                let expected = reference.range(..=index).next_back().map(|(&i, &e)| (i, e));
                ensure!(
                    found == expected,
                    "{structure:?}: floor {index:#x} is {found:?}, expected {expected:?}"
                );
            }
            _ => {
                let found = array.get(index).copied();
                ensure!(
                    found == reference.get(&index).copied(),
                    "{structure:?}: get {index:#x} is {found:?}"
                );
            }
        }
        max_len = max_len.max(reference.len());
        if is_due(&options, op) {
            let (len, depth, variant) = inspect(&array);
            log::debug!("after {} operations: {len} elements, {variant} of depth {depth}", op + 1);
        }
    }

    let elapsed = start.elapsed();
    let (len, depth, variant) = inspect(&array);
    ensure!(
        len == reference.len(),
        "{structure:?}: holds {len} elements, expected {}",
        reference.len()
    );
    Ok(Summary {
        structure,
        ops: options.ops,
        len,
        max_len,
        depth,
        variant,
        elapsed,
    })
}

/// Sets, clears and positional insertion and removal on a `FractalArray`, compared against a
/// `BTreeMap` whose entries are moved one by one.
fn run_array(options: Options) -> Result<Summary> {
    let structure = Structure::Array;
    let mut rng = SmallRng::seed_from_u64(options.seed);
    let mut array = FractalArray::new();
    let mut reference: BTreeMap<u64, u64> = BTreeMap::new();
    let mut max_len = 0;
    let start = Instant::now();

    for op in 0..options.ops {
        let index = options.spread.index(&mut rng, options.ops);
        match rng.gen_range(0..8) {
            0..=3 => {
                let element = rng.gen();
                let previous = array.replace(index, Some(element));
                ensure!(previous == reference.insert(index, element), "array: set {index:#x}");
            }
            4 => {
                let previous = array.take(index);
                ensure!(previous == reference.remove(&index), "array: clear {index:#x}");
            }
            5 => {
                let element = rng.gen();
                array = array.insert(index, element);
                let moved: Vec<_> = reference.range(index..).map(|(&i, _)| i).rev().collect();
                for i in moved {
                    if let Some(e) = reference.remove(&i) {
                        reference.insert(i + 1, e);
                    }
                }
                reference.insert(index, element);
            }
            6 => {
                let (next, removed) = array.remove(index);
                array = next;
                let expected = reference.remove(&index);
                ensure!(removed == expected, "array: remove {index:#x} returned {removed:?}");
                let moved: Vec<_> = reference.range(index..).map(|(&i, _)| i).collect();
                for i in moved {
                    if let Some(e) = reference.remove(&i) {
                        reference.insert(i - 1, e);
                    }
                }
            }
            _ => {
                let found = array.get(index).copied();
                ensure!(
                    found == reference.get(&index).copied(),
                    "array: get {index:#x} is {found:?}"
                );
            }
        }
        max_len = max_len.max(reference.len());
        if is_due(&options, op) {
            let len = array.check();
            log::debug!(
                "after {} operations: {len} elements, {} of depth {}",
                op + 1,
                array.variant(),
                array.depth()
            );
        }
    }

    let elapsed = start.elapsed();
    let len = array.check();
    ensure!(
        array.iter().map(|(i, &e)| (i, e)).eq(reference.iter().map(|(&i, &e)| (i, e))),
        "array: contents differ from the reference"
    );
    Ok(Summary {
        structure,
        ops: options.ops,
        len,
        max_len,
        depth: array.depth(),
        variant: array.variant(),
        elapsed,
    })
}

/// List and deque operations on a `FractalTable`, compared against a `Vec`.
fn run_table(options: Options) -> Result<Summary> {
    let structure = Structure::Table;
    let mut rng = SmallRng::seed_from_u64(options.seed);
    let mut table = FractalTable::new();
    let mut reference: Vec<u64> = Vec::new();
    let mut max_len = 0;
    let start = Instant::now();

    for op in 0..options.ops {
        let element: u64 = rng.gen();
        match rng.gen_range(0..10) {
            0..=1 => {
                table.push(element);
                reference.push(element);
            }
            2 => {
                table.push_front(element);
                reference.insert(0, element);
            }
            3..=4 => {
                let index = rng.gen_range(0..=reference.len());
                table.insert(index, element);
                reference.insert(index, element);
            }
            5..=6 if !reference.is_empty() => {
                let index = rng.gen_range(0..reference.len());
                let removed = table.remove(index);
                ensure!(removed == reference.remove(index), "table: remove {index}");
            }
            7 => {
                let popped = table.pop_front();
                let expected = (!reference.is_empty()).then(|| reference.remove(0));
                ensure!(popped == expected, "table: pop_front returned {popped:?}");
            }
            8 => {
                ensure!(table.pop() == reference.pop(), "table: pop");
            }
            _ => {
                if !reference.is_empty() {
                    let index = rng.gen_range(0..reference.len());
                    ensure!(table.get(index) == reference.get(index), "table: get {index}");
                }
            }
        }
        max_len = max_len.max(reference.len());
        if is_due(&options, op) {
            table.check();
            log::debug!("after {} operations: {} elements", op + 1, table.len());
        }
    }

    let elapsed = start.elapsed();
    table.check();
    ensure!(table.iter().eq(reference.iter()), "table: contents differ from the reference");
    Ok(Summary {
        structure,
        ops: options.ops,
        len: table.len(),
        max_len,
        depth: table.as_array().depth(),
        variant: table.as_array().variant(),
        elapsed,
    })
}
