//! Argument parsing for the `mc` test-harness binary (§6). Mirrors the reference driver's
//! flags one-to-one; contains no logic of its own beyond the `clap` derive.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum Strategy {
    Bfs,
    Par,
    Sat,
}

#[derive(Parser, Debug)]
#[command(name = "mc", about = "Reachability test harness over a serialized transition system")]
pub struct Args {
    /// Worker count; 0 autodetects from the available parallelism.
    #[arg(short = 'w', long = "workers", default_value_t = 0)]
    pub workers: usize,

    #[arg(short = 's', long = "strategy", value_enum, default_value_t = Strategy::Par)]
    pub strategy: Strategy,

    #[arg(long = "deadlocks")]
    pub deadlocks: bool,

    #[arg(long = "count-states")]
    pub count_states: bool,

    #[arg(long = "count-table")]
    pub count_table: bool,

    #[arg(long = "count-nodes")]
    pub count_nodes: bool,

    #[arg(long = "print-matrix")]
    pub print_matrix: bool,

    pub model: PathBuf,
}
