// FlowSim: Discrete-Event Flow Network Simulator written in Rust
// Copyright (C) 2022-2023 Tibor Schneider <sctibor@ethz.ch>
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

#![deny(missing_docs, missing_debug_implementations)]

//! # FlowSim
//!
//! A discrete-event simulator for resilient energy-flow networks: sources,
//! loads, converters, storages, multiplexers and pass-through limiters,
//! coupled into a network that negotiates a consistent assignment of
//! requested and achieved flow at every port of every simulated instant.
//!
//! ## Main Concepts
//!
//! The [`network::Network`] is the coupled model: atomic
//! [`element::Element`]s held in an arena, couplings on a graph (see
//! [Petgraph](https://docs.rs/petgraph/latest/petgraph/index.html)), and an
//! event queue over super-dense time. Elements negotiate flow exclusively
//! by message passing: requests travel upstream, achieved values travel
//! downstream, and the simulator delivers all outputs of an instant before
//! any transition runs.
//!
//! Model libraries are described by [`component::Component`]s and
//! materialized per scenario by the [`builder::NetworkBuilder`], which also
//! applies fragility (components knocked out at scenario start) and
//! reliability (failure/repair timelines gating a component) overlays. The
//! [`scenario::Simulation`] owns everything and runs scenario occurrences.
//!
//! ## Example usage
//!
//! A source feeding a constant 5 kW load through a flow-limited
//! pass-through:
//!
//! ```
//! use flowsim::prelude::*;
//! use std::collections::HashMap;
//!
//! fn main() -> Result<(), SimulationError> {
//!     let mut sim = Simulation::new(3600, || 0.5);
//!     let occurrence = sim.dists_mut().add_fixed("once-an-hour", 1)?;
//!
//!     sim.add_component(Component::new(
//!         "grid",
//!         ComponentKind::Source { stream: "electricity".into(), max_outflow: None },
//!     ))?;
//!     sim.add_component(Component::new(
//!         "building",
//!         ComponentKind::Load {
//!             stream: "electricity".into(),
//!             loads_by_scenario: HashMap::from([(
//!                 "blue-sky".to_string(),
//!                 vec![LoadItem::new(0, 5.0)],
//!             )]),
//!         },
//!     ))?;
//!     sim.add_network(
//!         "grid-to-building",
//!         vec![Connection::new(
//!             ComponentPort::new("grid", 0),
//!             ComponentPort::new("building", 0),
//!             "electricity".into(),
//!         )],
//!     )?;
//!     sim.add_scenario(
//!         Scenario::new("blue-sky", "grid-to-building", 600, occurrence)?
//!             .with_max_occurrences(1),
//!     )?;
//!
//!     let results = sim.run_all()?;
//!     let occurrence = &results.results["blue-sky"][0];
//!     assert!(occurrence.is_good);
//!     let stats = occurrence.stats();
//!     // 5 kW for 600 s
//!     assert!((stats.by_series["building-inflow"].total_energy - 3000.0).abs() < 1e-6);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod component;
pub mod distribution;
pub mod element;
pub mod event;
pub mod flow_writer;
pub mod fragility;
pub mod network;
pub mod port;
pub mod prelude;
pub mod reliability;
pub mod scenario;
pub mod stats;
pub mod types;

#[cfg(test)]
mod test;
