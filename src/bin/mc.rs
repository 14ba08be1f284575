//! `mc`: a test-harness binary exercising a serialized model against the library's
//! reachability drivers (§6). Contains no logic beyond argument parsing, loading a model
//! via `sylvan_rs::serialize`, and calling into `sylvan_rs::reachability`.

use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use sylvan_rs::cli::{Args, Strategy};
use sylvan_rs::config::Config;
use sylvan_rs::reachability::{bfs, par, sat, Partition};
use sylvan_rs::serialize;

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = match Config::builder().worker_count(args.workers).build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mc: invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = sylvan_rs::manager::init(config) {
        eprintln!("mc: {}", e);
        return ExitCode::FAILURE;
    }

    let file = match File::open(&args.model) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("mc: could not open {}: {}", args.model.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let mut reader = BufReader::new(file);
    let model = match serialize::read_model(&mut reader) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("mc: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.print_matrix {
        print_matrix(&model);
    }

    let partitions: Vec<Partition> = model
        .partitions
        .iter()
        .map(|p| Partition { relation: p.relation, vars: p.support })
        .collect();

    let reached = match args.strategy {
        Strategy::Bfs => bfs(model.initial.states, &partitions, args.deadlocks),
        Strategy::Par => par(model.initial.states, &partitions, args.deadlocks),
        Strategy::Sat => {
            let visited = sat(model.initial.states, &partitions);
            sylvan_rs::reachability::Reached { visited, deadlocks: None, levels: 0 }
        }
    };

    log::info!("reachability finished after {} levels", reached.levels);

    if args.count_states {
        let count = sylvan_rs::ops::satcount(reached.visited, &state_vars(&model));
        println!("states: {}", count);
    }
    if args.count_nodes {
        println!("nodes in reachable set: {}", sylvan_rs::ops::nodecount(reached.visited));
    }
    if args.count_table {
        println!("unique table entries: {}", sylvan_rs::manager::table_entry_count());
    }
    if args.deadlocks {
        match reached.deadlocks {
            Some(d) if !d.is_false() => println!("deadlock states found"),
            _ => println!("no deadlock states found"),
        }
    }

    sylvan_rs::manager::quit();
    ExitCode::SUCCESS
}

fn state_vars(model: &serialize::Model) -> Vec<sylvan_rs::variable::Variable> {
    (0..model.vector_size as u32 * 2).step_by(2).map(sylvan_rs::variable::Variable::from).collect()
}

fn print_matrix(model: &serialize::Model) {
    for (i, p) in model.partitions.iter().enumerate() {
        println!("partition {}: relation nodes = {}", i, sylvan_rs::ops::nodecount(p.relation));
    }
}
