#![allow(missing_docs)]

mod workload;

use clap::Parser;
use workload::{Options, Spread, Structure};

/// Runs randomized workloads on the fractal and sparse arrays, validating every operation
/// against a reference model.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of operations per structure.
    #[clap(short = 'n', long, default_value = "100000")]
    ops: usize,
    /// Seed of the operation sequence.
    #[clap(short = 's', long, default_value = "0")]
    seed: u64,
    /// Distribution of the accessed indices.
    #[clap(long, value_enum, default_value = "clustered")]
    spread: Spread,
    /// Structures to exercise, all of them when omitted.
    #[clap(short = 'S', long = "structure", value_enum)]
    structures: Vec<Structure>,
    /// Verify internal invariants every N operations.
    #[clap(short = 'c', long)]
    check_every: Option<usize>,

    #[clap(long)]
    jsonl_output: bool,
}

fn main() -> color_eyre::Result<()> {
    let args = Args::parse();

    color_eyre::install()?;
    fractal_logger::setup();

    let options = Options {
        ops: args.ops,
        seed: args.seed,
        spread: args.spread,
        check_every: args.check_every.filter(|&every| every > 0),
    };

    let structures = if args.structures.is_empty() {
        vec![
            Structure::Array,
            Structure::Table,
            Structure::Trie,
            Structure::Probed,
            Structure::Compact,
        ]
    } else {
        args.structures
    };

    for structure in structures {
        let summary = workload::run(structure, options)?;
        log::info!(
            "{structure:?}: {} ops in {:.2?}, {} elements (max {}), {} of depth {}",
            summary.ops,
            summary.elapsed,
            summary.len,
            summary.max_len,
            summary.variant,
            summary.depth,
        );
        if args.jsonl_output {
            println!("{}", summary.to_json());
        }
    }

    Ok(())
}
