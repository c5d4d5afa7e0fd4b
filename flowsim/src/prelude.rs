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

//! Re-export of the most important structures and traits.

pub use crate::builder::{BuiltComponent, NetworkBuilder};
pub use crate::component::{Component, ComponentKind, ComponentPort, Connection};
pub use crate::distribution::{DistId, DistSpec, DistributionSystem};
pub use crate::element::{Element, Limits, MuxDispatchStrategy};
pub use crate::flow_writer::{FlowWriter, SeriesInfo, WriterId};
pub use crate::fragility::{FragilityCurve, FragilityMode};
pub use crate::network::Network;
pub use crate::port::{Port, PortValue};
pub use crate::reliability::{ReliabilityCoordinator, TimeState};
pub use crate::scenario::{AllResults, Scenario, ScenarioResults, Simulation};
pub use crate::stats::{calc_scenario_stats, ScenarioStats, StatsSummary};
pub use crate::types::{
    ComponentType, ConfigError, ElementId, FlowValue, InvariantViolation, LoadItem, PortRole,
    RealTime, ReferenceError, SimulationError, Stream, SuperDenseTime,
};
