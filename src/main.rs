// Enflow: Resilience analysis for energy flow networks
// Copyright (C) 2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Simulate resilient energy flow networks from a TOML description.

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::*;

use enflow::input::load_file;
use enflow::output::{run_summary, write_flows_csv, write_stats_csv};
use enflow::{graph, EnflowError};

/// Simulate resilient energy flow networks.
#[derive(Debug, Parser)]
#[command(name = "enflow", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run all scenarios of an input file and write CSV results.
    Run {
        /// The TOML input file.
        input: PathBuf,
        /// Directory the CSV files are written to.
        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,
    },
    /// Print a network of an input file as a Graphviz digraph.
    Graph {
        /// The TOML input file.
        input: PathBuf,
        /// The network to render.
        network: String,
    },
    /// Parse and validate an input file without running anything.
    Check {
        /// The TOML input file.
        input: PathBuf,
    },
}

fn main() {
    pretty_env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), EnflowError> {
    match cli.command {
        Command::Run { input, out_dir } => {
            let mut sim = load_file(input)?;
            let results = sim.run_all()?;
            std::fs::create_dir_all(&out_dir)
                .map_err(|source| EnflowError::Io { path: out_dir.clone(), source })?;

            for (scenario, occurrences) in &results.results {
                for occurrence in occurrences {
                    if !occurrence.is_good {
                        warn!(
                            "scenario {scenario} at {} s failed: {}",
                            occurrence.start_time,
                            occurrence.message.as_deref().unwrap_or("unknown"),
                        );
                        continue;
                    }
                    let path = out_dir
                        .join(format!("{scenario}-{}-flows.csv", occurrence.start_time));
                    write_flows_csv(occurrence, create(&path)?)?;
                }
            }
            let stats_path = out_dir.join("stats.csv");
            write_stats_csv(&results, create(&stats_path)?)?;
            let json_path = out_dir.join("stats.json");
            serde_json::to_writer_pretty(create(&json_path)?, &results.stats_by_scenario())?;

            println!("{}", run_summary(&results));
            println!("results written to {}", out_dir.display());
            Ok(())
        }
        Command::Graph { input, network } => {
            let sim = load_file(input)?;
            print!("{}", graph::network_to_dot(&sim, &network)?);
            Ok(())
        }
        Command::Check { input } => {
            let sim = load_file(input)?;
            println!(
                "ok: {} component(s), {} network(s), {} scenario(s)",
                sim.components().count(),
                sim.networks().count(),
                sim.scenarios().count(),
            );
            Ok(())
        }
    }
}

fn create(path: &Path) -> Result<File, EnflowError> {
    File::create(path).map_err(|source| EnflowError::Io { path: path.to_path_buf(), source })
}
