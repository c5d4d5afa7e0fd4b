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

//! The two-valued flow port and the port-id encoding of [`PortValue`]
//! messages.
//!
//! Every atomic element negotiates flow through [`Port`]s: a `(requested,
//! achieved)` pair with the invariant `0 <= achieved <= requested`. Port
//! transitions return a [`PortUpdate`] telling the element whether the
//! change must be propagated as a request (upstream) or as an achieved
//! value (downstream).

use serde::{Deserialize, Serialize};

use crate::types::{flow_eq, FlowValue, InvariantViolation, FLOW_TOLERANCE};

/// Maximum number of ports per direction on a single element.
pub const MAX_PORTS_PER_DIRECTION: usize = 1000;
/// Input port carrying the achieved flow reported by upstream; add the
/// inflow index `k < MAX_PORTS_PER_DIRECTION`.
pub const INPORT_INFLOW_ACHIEVED: usize = 0;
/// Input port carrying the flow requested by downstream.
pub const INPORT_OUTFLOW_REQUEST: usize = MAX_PORTS_PER_DIRECTION;
/// Output port propagating our request upstream.
pub const OUTPORT_INFLOW_REQUEST: usize = 2 * MAX_PORTS_PER_DIRECTION;
/// Output port propagating our achieved flow downstream.
pub const OUTPORT_OUTFLOW_ACHIEVED: usize = 3 * MAX_PORTS_PER_DIRECTION;

/// A flow message: the value on a specific (encoded) port.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortValue {
    /// The encoded port id (direction base plus port index).
    pub port: usize,
    /// The flow value in kilowatts.
    pub value: FlowValue,
}

impl PortValue {
    /// Create a new port value message.
    pub fn new(port: usize, value: FlowValue) -> Self {
        Self { port, value }
    }
}

impl std::fmt::Display for PortValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", port_to_tag(self.port), self.value)
    }
}

/// Human-readable tag for an encoded port id.
pub fn port_to_tag(port: usize) -> String {
    let (base, tag) = if port >= OUTPORT_OUTFLOW_ACHIEVED {
        (OUTPORT_OUTFLOW_ACHIEVED, "outport_outflow_achieved")
    } else if port >= OUTPORT_INFLOW_REQUEST {
        (OUTPORT_INFLOW_REQUEST, "outport_inflow_request")
    } else if port >= INPORT_OUTFLOW_REQUEST {
        (INPORT_OUTFLOW_REQUEST, "inport_outflow_request")
    } else {
        (INPORT_INFLOW_ACHIEVED, "inport_inflow_achieved")
    };
    match port - base {
        0 => tag.to_string(),
        k => format!("{tag}({k})"),
    }
}

/// A negotiation port: the flow currently requested through it and the flow
/// actually achieved.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Port {
    requested: FlowValue,
    achieved: FlowValue,
}

/// The result of a port transition: the new port plus the propagation flags.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PortUpdate {
    /// The updated port.
    pub port: Port,
    /// The request changed and must be sent upstream.
    pub send_request: bool,
    /// The achieved value must be reported downstream.
    pub send_achieved: bool,
}

impl Port {
    /// A port with the given requested and achieved flow.
    pub fn new(requested: FlowValue, achieved: FlowValue) -> Self {
        Self { requested, achieved }
    }

    /// The currently requested flow.
    pub fn requested(&self) -> FlowValue {
        self.requested
    }

    /// The currently achieved flow.
    pub fn achieved(&self) -> FlowValue {
        self.achieved
    }

    /// `true` if the achieved flow falls short of the request.
    pub fn is_limited(&self) -> bool {
        self.achieved < self.requested - FLOW_TOLERANCE
    }

    /// Apply a new request to the port. The achieved value is trimmed to
    /// `min(achieved, r)`, so reducing a request needs no extra round-trip.
    ///
    /// `send_request` fires iff the request changed. `send_achieved` fires
    /// iff the trim changed the achieved value, or a changed request cannot
    /// be met by the value already achieved (the downstream peer is waiting
    /// for an answer it would otherwise never get).
    pub fn with_requested(self, r: FlowValue) -> PortUpdate {
        let achieved = self.achieved.min(r);
        let send_request = !flow_eq(r, self.requested);
        let send_achieved =
            !flow_eq(achieved, self.achieved) || (send_request && achieved < r - FLOW_TOLERANCE);
        PortUpdate { port: Port { requested: r, achieved }, send_request, send_achieved }
    }

    /// Apply an achieved value reported from upstream. Raises an invariant
    /// error if the value exceeds the current request.
    pub fn with_achieved(self, a: FlowValue) -> Result<PortUpdate, InvariantViolation> {
        if a > self.requested + FLOW_TOLERANCE {
            return Err(InvariantViolation::AchievedExceedsRequested {
                requested: self.requested,
                achieved: a,
            });
        }
        let send_achieved = !flow_eq(a, self.achieved);
        Ok(PortUpdate {
            port: Port { requested: self.requested, achieved: a },
            send_request: false,
            send_achieved,
        })
    }

    /// The upstream response primitive: record the request `r` and achieve
    /// as much of it as `available` allows. `send_achieved` fires iff a
    /// downstream observer, having clamped its own view to `min(achieved,
    /// r)`, would see a different value than we now hold.
    pub fn with_requested_and_available(self, r: FlowValue, available: FlowValue) -> PortUpdate {
        let achieved = r.min(available);
        let downstream_view = self.achieved.min(r);
        PortUpdate {
            port: Port { requested: r, achieved },
            send_request: !flow_eq(r, self.requested),
            send_achieved: !flow_eq(achieved, downstream_view),
        }
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(r: {}, a: {})", self.requested, self.achieved)
    }
}
