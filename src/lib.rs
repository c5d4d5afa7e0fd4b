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

//! # Enflow
//!
//! The command-line front end of [`flowsim`]: reads a TOML description of
//! an energy network with its scenarios, runs the discrete-event
//! simulation, and emits CSV time-series and statistics (plus Graphviz
//! renderings of the network).

use std::path::PathBuf;

use thiserror::Error;

pub mod graph;
pub mod input;
pub mod output;

/// Everything that can go wrong in the front end.
#[derive(Error, Debug)]
pub enum EnflowError {
    /// A file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The input file is not valid TOML.
    #[error("cannot parse input: {0}")]
    Toml(#[from] Box<toml::de::Error>),
    /// The input is well-formed TOML but not a valid model description.
    #[error("invalid input: {0}")]
    Input(String),
    /// The simulation core rejected the model or the run failed.
    #[error(transparent)]
    Simulation(#[from] flowsim::types::SimulationError),
    /// A CSV file could not be written.
    #[error("cannot write CSV: {0}")]
    Csv(#[from] csv::Error),
    /// A JSON file could not be written.
    #[error("cannot write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for EnflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(Box::new(e))
    }
}

impl From<flowsim::types::ConfigError> for EnflowError {
    fn from(e: flowsim::types::ConfigError) -> Self {
        Self::Simulation(e.into())
    }
}

impl From<flowsim::types::ReferenceError> for EnflowError {
    fn from(e: flowsim::types::ReferenceError) -> Self {
        Self::Simulation(e.into())
    }
}
