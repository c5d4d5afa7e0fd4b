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

//! The configuration-level view of a component: everything the builder
//! needs to materialize it into atomic elements for one scenario.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::{Limits, MuxDispatchStrategy};
use crate::fragility::FragilityMode;
use crate::types::{ComponentType, FlowValue, LoadItem, Stream};

/// A component of the modelled system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// The component's unique id.
    pub id: String,
    /// What the component is and its kind-specific configuration.
    pub kind: ComponentKind,
    /// The component's vulnerabilities to scenario intensities.
    pub fragility_modes: Vec<FragilityMode>,
}

/// Kind-specific component configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// A scheduled sink; the schedule may differ per scenario.
    Load {
        /// Stream drawn by the load.
        stream: Stream,
        /// Request schedule per scenario id.
        loads_by_scenario: HashMap<String, Vec<LoadItem>>,
    },
    /// A dispatchable source.
    Source {
        /// Stream provided by the source.
        stream: Stream,
        /// Optional cap on the outflow (`None` = unlimited).
        max_outflow: Option<FlowValue>,
    },
    /// A source that supplies a scheduled, non-dispatchable flow.
    UncontrolledSource {
        /// Stream provided by the source.
        stream: Stream,
        /// Supply schedule per scenario id.
        supply_by_scenario: HashMap<String, Vec<LoadItem>>,
    },
    /// A constant-efficiency converter.
    Converter {
        /// Stream consumed.
        inflow_stream: Stream,
        /// Stream produced.
        outflow_stream: Stream,
        /// Stream of the loss heat offered on outflow port 1.
        lossflow_stream: Stream,
        /// The constant efficiency (> 0; may exceed 1 for COP-style use).
        efficiency: FlowValue,
    },
    /// An N-to-M dispatch point.
    Mux {
        /// Stream switched by the mux.
        stream: Stream,
        /// Number of inflow ports.
        num_inflows: usize,
        /// Number of outflow ports.
        num_outflows: usize,
        /// How pooled inflow is dispatched onto the outflows.
        strategy: MuxDispatchStrategy,
    },
    /// A pass-through, optionally flow-limited.
    PassThrough {
        /// Stream passed through.
        stream: Stream,
        /// Optional flow limits.
        limits: Option<Limits>,
    },
    /// A state-of-charge integrator.
    Storage {
        /// Stream stored.
        stream: Stream,
        /// Capacity in kilojoules.
        capacity: FlowValue,
        /// Maximum charge rate in kilowatts.
        max_charge_rate: FlowValue,
        /// Initial state of charge in `[0, 1]`.
        init_soc: f64,
    },
    /// A two-inflow mover coupled by a coefficient of performance.
    Mover {
        /// Stream of the primary inflow (port 0).
        inflow0_stream: Stream,
        /// Stream of the secondary inflow (port 1).
        inflow1_stream: Stream,
        /// Stream of the outflow.
        outflow_stream: Stream,
        /// The coefficient of performance (> 0).
        cop: FlowValue,
    },
}

impl Component {
    /// Create a component without fragility modes.
    pub fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        Self { id: id.into(), kind, fragility_modes: Vec::new() }
    }

    /// Create a component with fragility modes.
    pub fn with_fragilities(
        id: impl Into<String>,
        kind: ComponentKind,
        fragility_modes: Vec<FragilityMode>,
    ) -> Self {
        Self { id: id.into(), kind, fragility_modes }
    }

    /// The component type used for aggregation.
    pub fn component_type(&self) -> ComponentType {
        match &self.kind {
            ComponentKind::Load { .. } => ComponentType::Load,
            ComponentKind::Source { .. } => ComponentType::Source,
            ComponentKind::UncontrolledSource { .. } => ComponentType::UncontrolledSource,
            ComponentKind::Converter { .. } => ComponentType::Converter,
            ComponentKind::Mux { .. } => ComponentType::Muxer,
            ComponentKind::PassThrough { .. } => ComponentType::PassThrough,
            ComponentKind::Storage { .. } => ComponentType::Storage,
            ComponentKind::Mover { .. } => ComponentType::Mover,
        }
    }

    /// Number of connectable inflow ports.
    pub fn num_inflows(&self) -> usize {
        match &self.kind {
            ComponentKind::Load { .. } => 1,
            ComponentKind::Source { .. } | ComponentKind::UncontrolledSource { .. } => 0,
            ComponentKind::Converter { .. } => 1,
            ComponentKind::Mux { num_inflows, .. } => *num_inflows,
            ComponentKind::PassThrough { .. } => 1,
            ComponentKind::Storage { .. } => 1,
            ComponentKind::Mover { .. } => 2,
        }
    }

    /// Number of connectable outflow ports.
    pub fn num_outflows(&self) -> usize {
        match &self.kind {
            ComponentKind::Load { .. } => 0,
            ComponentKind::Source { .. } | ComponentKind::UncontrolledSource { .. } => 1,
            ComponentKind::Converter { .. } => 2,
            ComponentKind::Mux { num_outflows, .. } => *num_outflows,
            ComponentKind::PassThrough { .. } => 1,
            ComponentKind::Storage { .. } => 1,
            ComponentKind::Mover { .. } => 1,
        }
    }

    /// The stream flowing into inflow port `port`, if the port exists.
    pub fn inflow_stream(&self, port: usize) -> Option<&Stream> {
        match &self.kind {
            ComponentKind::Load { stream, .. }
            | ComponentKind::Converter { inflow_stream: stream, .. }
            | ComponentKind::PassThrough { stream, .. }
            | ComponentKind::Storage { stream, .. } => (port == 0).then_some(stream),
            ComponentKind::Mux { stream, num_inflows, .. } => {
                (port < *num_inflows).then_some(stream)
            }
            ComponentKind::Mover { inflow0_stream, inflow1_stream, .. } => match port {
                0 => Some(inflow0_stream),
                1 => Some(inflow1_stream),
                _ => None,
            },
            ComponentKind::Source { .. } | ComponentKind::UncontrolledSource { .. } => None,
        }
    }

    /// The stream flowing out of outflow port `port`, if the port exists.
    pub fn outflow_stream(&self, port: usize) -> Option<&Stream> {
        match &self.kind {
            ComponentKind::Source { stream, .. }
            | ComponentKind::UncontrolledSource { stream, .. }
            | ComponentKind::PassThrough { stream, .. }
            | ComponentKind::Storage { stream, .. } => (port == 0).then_some(stream),
            ComponentKind::Converter { outflow_stream, lossflow_stream, .. } => match port {
                0 => Some(outflow_stream),
                1 => Some(lossflow_stream),
                _ => None,
            },
            ComponentKind::Mux { stream, num_outflows, .. } => {
                (port < *num_outflows).then_some(stream)
            }
            ComponentKind::Mover { outflow_stream, .. } => (port == 0).then_some(outflow_stream),
            ComponentKind::Load { .. } => None,
        }
    }

    /// The scheduled items of a schedule-driven component for a scenario.
    pub(crate) fn schedule_for(&self, scenario: &str) -> Option<&[LoadItem]> {
        match &self.kind {
            ComponentKind::Load { loads_by_scenario, .. } => {
                loads_by_scenario.get(scenario).map(Vec::as_slice)
            }
            ComponentKind::UncontrolledSource { supply_by_scenario, .. } => {
                supply_by_scenario.get(scenario).map(Vec::as_slice)
            }
            _ => None,
        }
    }
}

/// One endpoint of a connection: a component and a port number on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentPort {
    /// The component id.
    pub component: String,
    /// The port number within the direction.
    pub port: usize,
}

impl ComponentPort {
    /// Create a new endpoint.
    pub fn new(component: impl Into<String>, port: usize) -> Self {
        Self { component: component.into(), port }
    }
}

impl std::fmt::Display for ComponentPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.component, self.port)
    }
}

/// A directed connection from a component's outflow port to another
/// component's inflow port, carrying a declared stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// The providing endpoint (`OUT(k)`).
    pub source: ComponentPort,
    /// The consuming endpoint (`IN(k)`).
    pub target: ComponentPort,
    /// The stream the connection carries.
    pub stream: Stream,
}

impl Connection {
    /// Create a new connection.
    pub fn new(source: ComponentPort, target: ComponentPort, stream: Stream) -> Self {
        Self { source, target, stream }
    }
}
