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

//! A pass-through that clamps the upstream request into `[lower, upper]`.

use serde::{Deserialize, Serialize};

use crate::port::{Port, PortValue, OUTPORT_INFLOW_REQUEST, OUTPORT_OUTFLOW_ACHIEVED};
use crate::types::{ConfigError, FlowValue, InvariantViolation, RealTime};

use super::split_two_port;

/// A closed flow interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    lower: FlowValue,
    upper: FlowValue,
}

impl Limits {
    /// Create new limits, validating `lower <= upper` and `lower >= 0`.
    pub fn new(lower: FlowValue, upper: FlowValue) -> Result<Self, ConfigError> {
        if lower > upper {
            return Err(ConfigError::ImpossibleLimits { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Limits that only cap the flow from above.
    pub fn from_max(upper: FlowValue) -> Result<Self, ConfigError> {
        Self::new(0.0, upper)
    }

    /// The lower limit.
    pub fn lower(&self) -> FlowValue {
        self.lower
    }

    /// The upper limit.
    pub fn upper(&self) -> FlowValue {
        self.upper
    }
}

/// The flow-limiting pass-through element.
///
/// Downstream requests are clamped into the limits before they propagate
/// upstream; achieved flow passes through unchanged. Constructed with
/// `lower = upper = 0` it models a failed component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowLimits {
    id: String,
    time: RealTime,
    inflow: Port,
    outflow: Port,
    limits: Limits,
    report_inflow_request: bool,
    report_outflow_achieved: bool,
}

impl FlowLimits {
    /// Create a new flow-limiting element.
    pub fn new(id: impl Into<String>, limits: Limits) -> Self {
        Self {
            id: id.into(),
            time: 0,
            inflow: Port::default(),
            outflow: Port::default(),
            limits,
            report_inflow_request: false,
            report_outflow_achieved: false,
        }
    }

    /// A zero-limit pipe: the build-time materialization of a failed
    /// component.
    pub fn failed(id: impl Into<String>) -> Self {
        Self::new(id, Limits { lower: 0.0, upper: 0.0 })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn time(&self) -> RealTime {
        self.time
    }

    /// The inflow (upstream-facing) port.
    pub fn inflow(&self) -> Port {
        self.inflow
    }

    /// The outflow (downstream-facing) port.
    pub fn outflow(&self) -> Port {
        self.outflow
    }

    pub(crate) fn time_advance(&self) -> Option<RealTime> {
        if self.report_inflow_request || self.report_outflow_achieved {
            Some(0)
        } else {
            None
        }
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        self.report_inflow_request = false;
        self.report_outflow_achieved = false;
        Ok(())
    }

    pub(crate) fn external_transition(
        &mut self,
        elapsed: RealTime,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        self.time += elapsed;
        let (outflow_request, inflow_achieved) = split_two_port(&self.id, xs)?;
        if let Some(ia) = inflow_achieved {
            let update = self.inflow.with_achieved(ia)?;
            self.inflow = update.port;
            let update = self
                .outflow
                .with_achieved(self.inflow.achieved().min(self.outflow.requested()))?;
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
        }
        if let Some(or) = outflow_request {
            let update = self.outflow.with_requested(or);
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
            let inflow_request = or.clamp(self.limits.lower, self.limits.upper);
            let update = self.inflow.with_requested(inflow_request);
            self.report_inflow_request |= update.send_request;
            self.inflow = update.port;
            let update = self
                .outflow
                .with_achieved(self.inflow.achieved().min(self.outflow.requested()))?;
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
        }
        Ok(())
    }

    pub(crate) fn confluent_transition(
        &mut self,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        self.internal_transition()?;
        self.external_transition(0, xs)
    }

    pub(crate) fn output(&self, ys: &mut Vec<PortValue>) {
        if self.report_inflow_request {
            ys.push(PortValue::new(OUTPORT_INFLOW_REQUEST, self.inflow.requested()));
        }
        if self.report_outflow_achieved {
            ys.push(PortValue::new(OUTPORT_OUTFLOW_ACHIEVED, self.outflow.achieved()));
        }
    }
}
