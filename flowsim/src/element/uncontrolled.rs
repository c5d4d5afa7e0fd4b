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

//! A schedule-driven source: the outflow side mirror of [`super::Load`].
//! Supplies whatever is scheduled, regardless of demand; downstream draws
//! at most the scheduled availability.

use serde::{Deserialize, Serialize};

use crate::port::{Port, PortValue, INPORT_OUTFLOW_REQUEST, OUTPORT_OUTFLOW_ACHIEVED};
use crate::types::{
    check_load_items, flow_eq, ConfigError, FlowValue, InvariantViolation, LoadItem, RealTime,
};

/// The uncontrolled source element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncontrolledSource {
    id: String,
    time: RealTime,
    items: Vec<LoadItem>,
    next_idx: usize,
    available: FlowValue,
    outflow: Port,
    report_outflow_achieved: bool,
}

impl UncontrolledSource {
    /// Create a new uncontrolled source from its supply schedule.
    pub fn new(id: impl Into<String>, items: Vec<LoadItem>) -> Result<Self, ConfigError> {
        check_load_items(&items)?;
        Ok(Self {
            id: id.into(),
            time: 0,
            items,
            next_idx: 0,
            available: 0.0,
            outflow: Port::default(),
            report_outflow_achieved: false,
        })
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
        if self.report_outflow_achieved {
            Some(0)
        } else {
            self.items.get(self.next_idx).map(|item| item.time - self.time)
        }
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        if self.report_outflow_achieved {
            self.report_outflow_achieved = false;
        } else if let Some(item) = self.items.get(self.next_idx) {
            self.time = item.time;
            self.available = item.value;
            self.outflow = self
                .outflow
                .with_requested_and_available(self.outflow.requested(), self.available)
                .port;
            self.next_idx += 1;
        }
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
            let update = self.outflow.with_requested_and_available(or, self.available);
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
        }
        Ok(())
    }

    pub(crate) fn confluent_transition(
        &mut self,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        if self.report_outflow_achieved {
            self.internal_transition()?;
            self.external_transition(0, xs)
        } else {
            // requests apply to the old availability before the schedule moves
            let elapsed = self.time_advance().unwrap_or(0);
            self.external_transition(elapsed, xs)?;
            self.internal_transition()
        }
    }

    pub(crate) fn output(&self, ys: &mut Vec<PortValue>) {
        if self.report_outflow_achieved {
            ys.push(PortValue::new(OUTPORT_OUTFLOW_ACHIEVED, self.outflow.achieved()));
        } else if let Some(item) = self.items.get(self.next_idx) {
            let next_achieved = self.outflow.requested().min(item.value);
            if !flow_eq(next_achieved, self.outflow.achieved()) {
                ys.push(PortValue::new(OUTPORT_OUTFLOW_ACHIEVED, next_achieved));
            }
        }
    }
}
