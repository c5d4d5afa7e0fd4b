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

//! A dispatchable source with an optional maximum outflow.

use serde::{Deserialize, Serialize};

use crate::port::{Port, PortValue, INPORT_OUTFLOW_REQUEST, OUTPORT_OUTFLOW_ACHIEVED};
use crate::types::{InvariantViolation, RealTime};

/// The supplying element: achieves whatever is requested, up to its optional
/// cap (`None` means unlimited).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supply {
    id: String,
    time: RealTime,
    outflow: Port,
    max_outflow: Option<f64>,
    send_achieved: bool,
}

impl Supply {
    /// Create a new supply. `max_outflow = None` leaves it unconstrained.
    pub fn new(id: impl Into<String>, max_outflow: Option<f64>) -> Self {
        Self {
            id: id.into(),
            time: 0,
            outflow: Port::default(),
            max_outflow,
            send_achieved: false,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn time(&self) -> RealTime {
        self.time
    }

    /// The outflow port.
    pub fn outflow(&self) -> Port {
        self.outflow
    }

    pub(crate) fn time_advance(&self) -> Option<RealTime> {
        if self.send_achieved {
            Some(0)
        } else {
            None
        }
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        self.send_achieved = false;
        Ok(())
    }

    pub(crate) fn external_transition(
        &mut self,
        elapsed: RealTime,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        self.time += elapsed;
        let mut outflow_request = None;
        for x in xs {
            if x.port == INPORT_OUTFLOW_REQUEST {
                *outflow_request.get_or_insert(0.0) += x.value;
            } else {
                return Err(InvariantViolation::UnhandledPort {
                    element: self.id.clone(),
                    port: x.port,
                });
            }
        }
        if let Some(or) = outflow_request {
            let available = self.max_outflow.unwrap_or(or);
            let update = self.outflow.with_requested_and_available(or, available);
            self.send_achieved |= update.send_achieved;
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
        if self.send_achieved {
            ys.push(PortValue::new(OUTPORT_OUTFLOW_ACHIEVED, self.outflow.achieved()));
        }
    }
}
