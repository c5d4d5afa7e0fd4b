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

//! Module containing all type definitions

use petgraph::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A flow rate in kilowatts. All flows are normalized to kilowatts at the
/// boundary; the core never carries unit tags.
pub type FlowValue = f64;

/// A point in (or duration of) simulated time, in whole seconds.
pub type RealTime = i64;

/// Two flow values within this tolerance are considered equal.
pub const FLOW_TOLERANCE: FlowValue = 1e-6;

/// Compare two flow values modulo [`FLOW_TOLERANCE`].
#[inline]
pub fn flow_eq(a: FlowValue, b: FlowValue) -> bool {
    (a - b).abs() < FLOW_TOLERANCE
}

pub(crate) type IndexType = u32;
/// Element identification (and index into the coupling graph)
pub type ElementId = NodeIndex<IndexType>;

/// Super-dense simulation time: a real instant in seconds plus a logical
/// counter ordering the events that share the same real instant. Ordering is
/// lexicographic (`real` first).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SuperDenseTime {
    /// Seconds since scenario start.
    pub real: RealTime,
    /// Tie-breaker between events at the same real instant.
    pub logical: i32,
}

impl SuperDenseTime {
    /// The origin of simulated time.
    pub const ZERO: Self = Self { real: 0, logical: 0 };

    /// Construct a super-dense time from its parts.
    pub fn new(real: RealTime, logical: i32) -> Self {
        Self { real, logical }
    }

    /// The time at which an event scheduled `dt` seconds after `self` fires.
    /// A zero `dt` stays within the same real instant and bumps the logical
    /// counter; a positive `dt` advances the real part and resets it.
    pub fn after(self, dt: RealTime) -> Self {
        if dt == 0 {
            Self { real: self.real, logical: self.logical + 1 }
        } else {
            Self { real: self.real + dt, logical: 0 }
        }
    }
}

impl std::fmt::Display for SuperDenseTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s+{}", self.real, self.logical)
    }
}

/// A named flow medium (e.g., electricity, heat). Streams have no numeric
/// semantics; they only type-check couplings.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct Stream(String);

impl Stream {
    /// The stream tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Stream {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for Stream {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

/// The kind of component an element belongs to. Used for aggregation only.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// A scheduled sink of flow.
    Load,
    /// A dispatchable source of flow.
    Source,
    /// A source that delivers a scheduled, non-dispatchable flow.
    UncontrolledSource,
    /// A constant-efficiency conversion between two streams.
    Converter,
    /// An N-to-M dispatch point.
    Muxer,
    /// A pass-through, possibly flow-limited.
    PassThrough,
    /// A state-of-charge integrator.
    Storage,
    /// A two-inflow element coupled by a coefficient of performance.
    Mover,
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Source => "source",
            Self::UncontrolledSource => "uncontrolled_source",
            Self::Converter => "converter",
            Self::Muxer => "muxer",
            Self::PassThrough => "pass_through",
            Self::Storage => "storage",
            Self::Mover => "mover",
        })
    }
}

/// The role a recorded port plays in its component. Metadata used only for
/// aggregating statistics.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortRole {
    /// A generic inflow port.
    Inflow,
    /// A generic outflow port.
    Outflow,
    /// The outflow of a source component.
    SourceOutflow,
    /// The inflow of a load component.
    LoadInflow,
    /// An inflow absorbing waste heat.
    WasteInflow,
    /// The inflow of a storage component.
    StorageInflow,
    /// The outflow of a storage component.
    StorageOutflow,
}

impl std::fmt::Display for PortRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Inflow => "inflow",
            Self::Outflow => "outflow",
            Self::SourceOutflow => "source_outflow",
            Self::LoadInflow => "load_inflow",
            Self::WasteInflow => "waste_inflow",
            Self::StorageInflow => "storage_inflow",
            Self::StorageOutflow => "storage_outflow",
        })
    }
}

/// One step of a piecewise-constant schedule: the value holds from `time`
/// until the time of the next item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadItem {
    /// Start of the interval, in seconds.
    pub time: RealTime,
    /// Flow value over the interval, in kilowatts.
    pub value: FlowValue,
}

impl LoadItem {
    /// Create a new schedule item.
    pub fn new(time: RealTime, value: FlowValue) -> Self {
        Self { time, value }
    }
}

/// Validate a load profile: non-empty, times strictly increasing and
/// non-negative, values non-negative.
pub fn check_load_items(items: &[LoadItem]) -> Result<(), ConfigError> {
    if items.is_empty() {
        return Err(ConfigError::EmptyLoadProfile);
    }
    let mut t_last: RealTime = -1;
    for (idx, item) in items.iter().enumerate() {
        if item.value < 0.0 {
            return Err(ConfigError::NegativeLoadValue { index: idx, value: item.value });
        }
        if item.time < 0 || item.time <= t_last {
            return Err(ConfigError::NonMonotoneLoadTimes {
                index: idx,
                time: item.time,
                previous: t_last,
            });
        }
        t_last = item.time;
    }
    Ok(())
}

/// One recorded sample of a port: the requested and achieved flow holding
/// from `time` until the next sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Datum {
    /// Sample time in seconds.
    pub time: RealTime,
    /// Requested flow in kilowatts.
    pub requested: FlowValue,
    /// Achieved flow in kilowatts.
    pub achieved: FlowValue,
}

/// Configuration Error: malformed input detected while building a model.
/// Fatal for the scenario.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A load profile must contain at least one item.
    #[error("load profile must contain at least one item")]
    EmptyLoadProfile,
    /// Load times must be strictly increasing and non-negative.
    #[error("load times must be strictly increasing and non-negative: t[{index}] = {time} after {previous}")]
    NonMonotoneLoadTimes {
        /// Index of the offending item.
        index: usize,
        /// Time of the offending item.
        time: RealTime,
        /// Time of the preceding item.
        previous: RealTime,
    },
    /// Negative flows are not allowed.
    #[error("load value at index {index} is negative: {value}")]
    NegativeLoadValue {
        /// Index of the offending item.
        index: usize,
        /// The negative value.
        value: FlowValue,
    },
    /// A scenario duration must be positive.
    #[error("scenario duration must be positive: {0}")]
    NegativeDuration(RealTime),
    /// Storage capacity must be positive.
    #[error("storage capacity must be > 0: {0}")]
    NonPositiveCapacity(FlowValue),
    /// Storage max charge rate must be positive.
    #[error("storage max charge rate must be > 0: {0}")]
    NonPositiveChargeRate(FlowValue),
    /// The initial state of charge must lie in [0, 1].
    #[error("initial state of charge must be within [0, 1]: {0}")]
    SocOutOfRange(f64),
    /// Flow limits with lower > upper are impossible to satisfy.
    #[error("impossible flow limits: lower ({lower}) > upper ({upper})")]
    ImpossibleLimits {
        /// Lower limit.
        lower: FlowValue,
        /// Upper limit.
        upper: FlowValue,
    },
    /// Converter efficiency must be positive.
    #[error("converter efficiency must be > 0: {0}")]
    NonPositiveEfficiency(FlowValue),
    /// Coefficient of performance must be positive.
    #[error("coefficient of performance must be > 0: {0}")]
    NonPositiveCop(FlowValue),
    /// A mux must have between 1 and 1000 ports per direction.
    #[error("{side} must be >= 1 and <= {max}: got {count}")]
    InvalidPortCount {
        /// Which side of the mux is invalid.
        side: &'static str,
        /// Maximum ports per direction.
        max: usize,
        /// The offending count.
        count: usize,
    },
    /// A distribution parameter is out of range.
    #[error("invalid distribution {tag}: {reason}")]
    InvalidDistribution {
        /// Tag of the offending distribution.
        tag: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A fragility curve parameter is out of range.
    #[error("invalid fragility curve: lower bound ({lower}) must be < upper bound ({upper})")]
    InvalidFragilityCurve {
        /// Lower bound of the curve.
        lower: f64,
        /// Upper bound of the curve.
        upper: f64,
    },
    /// A reliability schedule must have non-decreasing times.
    #[error("reliability schedule times must be non-decreasing: {time} after {previous}")]
    NonMonotoneSchedule {
        /// Time of the offending entry.
        time: RealTime,
        /// Time of the preceding entry.
        previous: RealTime,
    },
    /// Two entities were registered under the same tag.
    #[error("duplicate tag: {0}")]
    DuplicateTag(String),
}

/// Reference Error: a name was referenced but never declared. Fatal at build
/// time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A connection names an unknown component.
    #[error("unknown component: {0}")]
    Component(String),
    /// A failure or fragility mode names an unknown distribution.
    #[error("unknown distribution: {0}")]
    Distribution(String),
    /// A fragility mode names an unknown fragility curve.
    #[error("unknown fragility curve: {0}")]
    FragilityCurve(String),
    /// A scenario names an unknown network.
    #[error("unknown network: {0}")]
    Network(String),
    /// A run was requested for an unknown scenario.
    #[error("unknown scenario: {0}")]
    Scenario(String),
    /// A component exposes fewer ports than the connection assumes.
    #[error("component {component} has no {direction} port {port}")]
    Port {
        /// The component in question.
        component: String,
        /// `"inflow"` or `"outflow"`.
        direction: &'static str,
        /// The out-of-range port number.
        port: usize,
    },
}

/// Invariant Violation: a runtime check detected an infeasible flow. Fatal
/// for the scenario; indicates a programming or input error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    /// An achieved flow exceeded the corresponding request.
    #[error("achieved flow ({achieved}) exceeds requested flow ({requested})")]
    AchievedExceedsRequested {
        /// The requested flow.
        requested: FlowValue,
        /// The (larger) achieved flow.
        achieved: FlowValue,
    },
    /// A negative flow was produced.
    #[error("negative flow: {0}")]
    NegativeFlow(FlowValue),
    /// A message arrived on a port the element does not have.
    #[error("unhandled port {port} on element {element}")]
    UnhandledPort {
        /// The element that received the message.
        element: String,
        /// The undecodable port id.
        port: usize,
    },
    /// More flow was delivered to a dispatch point than was requested.
    #[error("inflow delivered ({delivered}) exceeds total requested outflow ({requested})")]
    OversupplyAtDispatch {
        /// The delivered inflow.
        delivered: FlowValue,
        /// The total requested outflow.
        requested: FlowValue,
    },
    /// The even-share dispatch loop hit its iteration guard.
    #[error("dispatch did not converge within {iterations} iterations")]
    DispatchNotConverged {
        /// The iteration budget that was exhausted.
        iterations: usize,
    },
}

/// Simulation Errors
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Reference to an undeclared name.
    #[error("reference error: {0}")]
    Reference(#[from] ReferenceError),
    /// A connection's declared stream differs from an endpoint's stream.
    #[error(
        "stream mismatch on {source_endpoint} -> {target}: source provides {source_stream}, \
         sink expects {sink_stream}, connection declares {stream}"
    )]
    StreamMismatch {
        /// Source endpoint (`component:OUT(k)`).
        source_endpoint: String,
        /// Target endpoint (`component:IN(k)`).
        target: String,
        /// Stream of the source port.
        source_stream: Stream,
        /// Stream of the sink port.
        sink_stream: Stream,
        /// Stream declared on the connection.
        stream: Stream,
    },
    /// A runtime flow invariant was violated.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
    /// Element is not present in the network.
    #[error("element was not found in the network: {0:?}")]
    ElementNotFound(ElementId),
    /// The coupling logic live-locked within a single real instant.
    #[error(
        "simulation did not advance past t = {time}: {iterations} iterations \
         without advancing real time (limit {limit})"
    )]
    Divergence {
        /// The super-dense time the simulation was stuck at.
        time: SuperDenseTime,
        /// How many iterations ran at that real instant.
        iterations: usize,
        /// The non-advance budget that was exhausted.
        limit: usize,
    },
}

impl PartialEq for SimulationError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Config(l), Self::Config(r)) => l == r,
            (Self::Reference(l), Self::Reference(r)) => l == r,
            (Self::Invariant(l), Self::Invariant(r)) => l == r,
            (Self::ElementNotFound(l), Self::ElementNotFound(r)) => l == r,
            (
                Self::Divergence { time: lt, iterations: li, limit: ll },
                Self::Divergence { time: rt, iterations: ri, limit: rl },
            ) => lt == rt && li == ri && ll == rl,
            (
                Self::StreamMismatch { source_endpoint: ls, target: lt, .. },
                Self::StreamMismatch { source_endpoint: rs, target: rt, .. },
            ) => ls == rs && lt == rt,
            _ => false,
        }
    }
}
