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

//! Constant-efficiency conversion between an inflow and an outflow stream.

use serde::{Deserialize, Serialize};

use crate::port::{
    Port, PortValue, INPORT_INFLOW_ACHIEVED, INPORT_OUTFLOW_REQUEST, OUTPORT_INFLOW_REQUEST,
    OUTPORT_OUTFLOW_ACHIEVED,
};
use crate::types::{ConfigError, FlowValue, InvariantViolation, RealTime};

/// The converting element.
///
/// Relations: `outflow.achieved = efficiency * inflow.achieved` and
/// `inflow.requested = outflow.requested / efficiency`. The lossflow port
/// (outflow index 1) offers `(1 - efficiency) * inflow.achieved` to a
/// downstream consumer; whatever is not drawn is absorbed as wasteflow.
///
/// The efficiency may exceed 1 to express COP-style devices; in that case
/// there is no lossflow (it is clamped at zero) and the `(1 - efficiency)`
/// identity does not apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Converter {
    id: String,
    time: RealTime,
    efficiency: FlowValue,
    inflow: Port,
    outflow: Port,
    lossflow: Port,
    wasteflow: FlowValue,
    report_inflow_request: bool,
    report_outflow_achieved: bool,
    report_lossflow_achieved: bool,
}

impl Converter {
    /// Create a new converter with the given constant efficiency.
    pub fn new(id: impl Into<String>, efficiency: FlowValue) -> Result<Self, ConfigError> {
        if efficiency <= 0.0 {
            return Err(ConfigError::NonPositiveEfficiency(efficiency));
        }
        Ok(Self {
            id: id.into(),
            time: 0,
            efficiency,
            inflow: Port::default(),
            outflow: Port::default(),
            lossflow: Port::default(),
            wasteflow: 0.0,
            report_inflow_request: false,
            report_outflow_achieved: false,
            report_lossflow_achieved: false,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn time(&self) -> RealTime {
        self.time
    }

    /// The inflow port.
    pub fn inflow(&self) -> Port {
        self.inflow
    }

    /// The primary outflow port.
    pub fn outflow(&self) -> Port {
        self.outflow
    }

    /// The lossflow port (outflow index 1).
    pub fn lossflow(&self) -> Port {
        self.lossflow
    }

    /// The flow absorbed as waste: lossflow not drawn downstream.
    pub fn wasteflow(&self) -> FlowValue {
        self.wasteflow
    }

    /// Recompute the lossflow/wasteflow partition from the achieved inflow.
    fn repartition_lossflow(&mut self) -> Result<(), InvariantViolation> {
        let available = ((1.0 - self.efficiency) * self.inflow.achieved()).max(0.0);
        let update = self.lossflow.with_achieved(available.min(self.lossflow.requested()))?;
        self.report_lossflow_achieved |= update.send_achieved;
        self.lossflow = update.port;
        self.wasteflow = available - self.lossflow.achieved();
        Ok(())
    }

    pub(crate) fn time_advance(&self) -> Option<RealTime> {
        if self.report_inflow_request
            || self.report_outflow_achieved
            || self.report_lossflow_achieved
        {
            Some(0)
        } else {
            None
        }
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        self.report_inflow_request = false;
        self.report_outflow_achieved = false;
        self.report_lossflow_achieved = false;
        Ok(())
    }

    pub(crate) fn external_transition(
        &mut self,
        elapsed: RealTime,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        self.time += elapsed;
        let mut outflow_request = None;
        let mut lossflow_request = None;
        let mut inflow_achieved = None;
        for x in xs {
            if x.port == INPORT_OUTFLOW_REQUEST {
                *outflow_request.get_or_insert(0.0) += x.value;
            } else if x.port == INPORT_OUTFLOW_REQUEST + 1 {
                *lossflow_request.get_or_insert(0.0) += x.value;
            } else if x.port == INPORT_INFLOW_ACHIEVED {
                *inflow_achieved.get_or_insert(0.0) += x.value;
            } else {
                return Err(InvariantViolation::UnhandledPort {
                    element: self.id.clone(),
                    port: x.port,
                });
            }
        }
        if let Some(ia) = inflow_achieved {
            let update = self.inflow.with_achieved(ia)?;
            self.inflow = update.port;
            let out_achieved =
                (self.efficiency * self.inflow.achieved()).min(self.outflow.requested());
            let update = self.outflow.with_achieved(out_achieved)?;
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
            self.repartition_lossflow()?;
        }
        if let Some(or) = outflow_request {
            let update = self.outflow.with_requested(or);
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
            let update = self.inflow.with_requested(or / self.efficiency);
            self.report_inflow_request |= update.send_request;
            self.inflow = update.port;
            let out_achieved =
                (self.efficiency * self.inflow.achieved()).min(self.outflow.requested());
            let update = self.outflow.with_achieved(out_achieved)?;
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
            self.repartition_lossflow()?;
        }
        if let Some(lr) = lossflow_request {
            let update = self.lossflow.with_requested(lr);
            self.report_lossflow_achieved |= update.send_achieved;
            self.lossflow = update.port;
            self.repartition_lossflow()?;
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
        if self.report_lossflow_achieved {
            ys.push(PortValue::new(OUTPORT_OUTFLOW_ACHIEVED + 1, self.lossflow.achieved()));
        }
    }
}
