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

//! A transparent pass-through that reports its port to the flow writer.

use serde::{Deserialize, Serialize};

use crate::flow_writer::{FlowWriter, WriterId};
use crate::port::{Port, PortValue, OUTPORT_INFLOW_REQUEST, OUTPORT_OUTFLOW_ACHIEVED};
use crate::types::{InvariantViolation, RealTime};

use super::split_two_port;

/// The metering element: behaviorally a direct coupling, but every change of
/// its `(requested, achieved)` pair is recorded under its writer id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowMeter {
    id: String,
    time: RealTime,
    port: Port,
    report_inflow_request: bool,
    report_outflow_achieved: bool,
    writer_id: WriterId,
}

impl FlowMeter {
    /// Create a new meter reporting under the given writer id.
    pub fn new(id: impl Into<String>, writer_id: WriterId) -> Self {
        Self {
            id: id.into(),
            time: 0,
            port: Port::default(),
            report_inflow_request: false,
            report_outflow_achieved: false,
            writer_id,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn time(&self) -> RealTime {
        self.time
    }

    /// The metered port.
    pub fn port(&self) -> Port {
        self.port
    }

    /// Report the current port values to the writer.
    pub(crate) fn record(&self, writer: &mut FlowWriter) {
        writer.write(self.writer_id, self.time, self.port.requested(), self.port.achieved());
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
        let update = match (outflow_request, inflow_achieved) {
            (Some(or), Some(ia)) => self.port.with_requested_and_available(or, ia),
            (Some(or), None) => self.port.with_requested(or),
            (None, Some(ia)) => self.port.with_achieved(ia)?,
            (None, None) => return Ok(()),
        };
        self.report_inflow_request |= update.send_request;
        self.report_outflow_achieved |= update.send_achieved;
        self.port = update.port;
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
            ys.push(PortValue::new(OUTPORT_INFLOW_REQUEST, self.port.requested()));
        }
        if self.report_outflow_achieved {
            ys.push(PortValue::new(OUTPORT_OUTFLOW_ACHIEVED, self.port.achieved()));
        }
    }
}
