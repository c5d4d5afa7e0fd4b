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

//! A two-inflow element whose inflows are coupled by a coefficient of
//! performance: `outflow = inflow0 + inflow1` with `inflow1 = inflow0 / COP`.

use serde::{Deserialize, Serialize};

use crate::port::{
    Port, PortValue, INPORT_INFLOW_ACHIEVED, INPORT_OUTFLOW_REQUEST, OUTPORT_INFLOW_REQUEST,
    OUTPORT_OUTFLOW_ACHIEVED,
};
use crate::types::{ConfigError, FlowValue, InvariantViolation, RealTime};

/// The moving element (heat-pump-like). When both inflows have answered,
/// the more constrained side determines the outflow and the other inflow is
/// re-requested to match.
///
/// Until an inflow port has answered a fresh request, its requested value
/// stands in for its achieved value, so an early answer on one side does
/// not collapse the negotiation on the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mover {
    id: String,
    time: RealTime,
    cop: FlowValue,
    inflow0: Port,
    inflow1: Port,
    outflow: Port,
    pending0: bool,
    pending1: bool,
    report_inflow0_request: bool,
    report_inflow1_request: bool,
    report_outflow_achieved: bool,
}

impl Mover {
    /// Create a new mover with the given coefficient of performance.
    pub fn new(id: impl Into<String>, cop: FlowValue) -> Result<Self, ConfigError> {
        if cop <= 0.0 {
            return Err(ConfigError::NonPositiveCop(cop));
        }
        Ok(Self {
            id: id.into(),
            time: 0,
            cop,
            inflow0: Port::default(),
            inflow1: Port::default(),
            outflow: Port::default(),
            pending0: false,
            pending1: false,
            report_inflow0_request: false,
            report_inflow1_request: false,
            report_outflow_achieved: false,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn time(&self) -> RealTime {
        self.time
    }

    /// The primary inflow port (index 0).
    pub fn inflow0(&self) -> Port {
        self.inflow0
    }

    /// The secondary inflow port (index 1).
    pub fn inflow1(&self) -> Port {
        self.inflow1
    }

    /// The outflow port.
    pub fn outflow(&self) -> Port {
        self.outflow
    }

    /// The achieved inflow, or the requested inflow while the answer is
    /// still outstanding.
    fn effective0(&self) -> FlowValue {
        if self.pending0 {
            self.inflow0.requested()
        } else {
            self.inflow0.achieved()
        }
    }

    fn effective1(&self) -> FlowValue {
        if self.pending1 {
            self.inflow1.requested()
        } else {
            self.inflow1.achieved()
        }
    }

    pub(crate) fn time_advance(&self) -> Option<RealTime> {
        if self.report_inflow0_request
            || self.report_inflow1_request
            || self.report_outflow_achieved
        {
            Some(0)
        } else {
            None
        }
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        self.report_inflow0_request = false;
        self.report_inflow1_request = false;
        self.report_outflow_achieved = false;
        Ok(())
    }

    pub(crate) fn external_transition(
        &mut self,
        elapsed: RealTime,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        self.time += elapsed;
        let mut outflow_request = None;
        let mut inflow0_achieved = None;
        let mut inflow1_achieved = None;
        for x in xs {
            if x.port == INPORT_OUTFLOW_REQUEST {
                *outflow_request.get_or_insert(0.0) += x.value;
            } else if x.port == INPORT_INFLOW_ACHIEVED {
                *inflow0_achieved.get_or_insert(0.0) += x.value;
            } else if x.port == INPORT_INFLOW_ACHIEVED + 1 {
                *inflow1_achieved.get_or_insert(0.0) += x.value;
            } else {
                return Err(InvariantViolation::UnhandledPort {
                    element: self.id.clone(),
                    port: x.port,
                });
            }
        }
        if let Some(ia0) = inflow0_achieved {
            self.inflow0 = self.inflow0.with_achieved(ia0)?.port;
            self.pending0 = false;
        }
        if let Some(ia1) = inflow1_achieved {
            self.inflow1 = self.inflow1.with_achieved(ia1)?.port;
            self.pending1 = false;
        }
        if inflow0_achieved.is_some() || inflow1_achieved.is_some() {
            // the more constrained inflow determines the outflow; the other
            // side is re-requested to match
            let outflow_by_ip0 = (1.0 + 1.0 / self.cop) * self.effective0();
            let outflow_by_ip1 = (1.0 + self.cop) * self.effective1();
            let dominant_outflow = if outflow_by_ip0 < outflow_by_ip1 {
                let update = self.inflow1.with_requested(self.effective0() / self.cop);
                self.report_inflow1_request |= update.send_request;
                self.pending1 |= update.send_request;
                self.inflow1 = update.port;
                outflow_by_ip0
            } else {
                let update = self.inflow0.with_requested(self.effective1() * self.cop);
                self.report_inflow0_request |= update.send_request;
                self.pending0 |= update.send_request;
                self.inflow0 = update.port;
                outflow_by_ip1
            };
            let update = self
                .outflow
                .with_achieved(dominant_outflow.min(self.outflow.requested()))?;
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
        }
        if let Some(or) = outflow_request {
            let update = self.outflow.with_requested(or);
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
            let update = self.inflow0.with_requested(or / (1.0 + 1.0 / self.cop));
            self.report_inflow0_request |= update.send_request;
            self.pending0 |= update.send_request;
            self.inflow0 = update.port;
            let update = self.inflow1.with_requested(or / (1.0 + self.cop));
            self.report_inflow1_request |= update.send_request;
            self.pending1 |= update.send_request;
            self.inflow1 = update.port;
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
        if self.report_inflow0_request {
            ys.push(PortValue::new(OUTPORT_INFLOW_REQUEST, self.inflow0.requested()));
        }
        if self.report_inflow1_request {
            ys.push(PortValue::new(OUTPORT_INFLOW_REQUEST + 1, self.inflow1.requested()));
        }
        if self.report_outflow_achieved {
            ys.push(PortValue::new(OUTPORT_OUTFLOW_ACHIEVED, self.outflow.achieved()));
        }
    }
}
