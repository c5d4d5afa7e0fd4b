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

//! A schedule-driven sink: requests the scheduled inflow at each scheduled
//! time.

use serde::{Deserialize, Serialize};

use crate::port::{Port, PortValue, INPORT_INFLOW_ACHIEVED, OUTPORT_INFLOW_REQUEST};
use crate::types::{check_load_items, ConfigError, InvariantViolation, LoadItem, RealTime};

/// The load element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    id: String,
    time: RealTime,
    items: Vec<LoadItem>,
    next_idx: usize,
    inflow: Port,
}

impl Load {
    /// Create a new load from its request schedule.
    pub fn new(id: impl Into<String>, items: Vec<LoadItem>) -> Result<Self, ConfigError> {
        check_load_items(&items)?;
        Ok(Self { id: id.into(), time: 0, items, next_idx: 0, inflow: Port::default() })
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

    pub(crate) fn time_advance(&self) -> Option<RealTime> {
        self.items.get(self.next_idx).map(|item| item.time - self.time)
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        if let Some(item) = self.items.get(self.next_idx) {
            self.time = item.time;
            self.inflow = self.inflow.with_requested(item.value).port;
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
        let mut inflow_achieved = None;
        for x in xs {
            if x.port == INPORT_INFLOW_ACHIEVED {
                *inflow_achieved.get_or_insert(0.0) += x.value;
            } else {
                return Err(InvariantViolation::UnhandledPort {
                    element: self.id.clone(),
                    port: x.port,
                });
            }
        }
        if let Some(ia) = inflow_achieved {
            self.inflow = self.inflow.with_achieved(ia)?.port;
        }
        Ok(())
    }

    pub(crate) fn confluent_transition(
        &mut self,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        // achieved values apply to the old request before the schedule moves
        let elapsed = self.time_advance().unwrap_or(0);
        self.external_transition(elapsed, xs)?;
        self.internal_transition()
    }

    pub(crate) fn output(&self, ys: &mut Vec<PortValue>) {
        if let Some(item) = self.items.get(self.next_idx) {
            if self.inflow.with_requested(item.value).send_request {
                ys.push(PortValue::new(OUTPORT_INFLOW_REQUEST, item.value));
            }
        }
    }
}
