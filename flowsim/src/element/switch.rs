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

//! A time-keyed open/closed gate driven by a reliability schedule.

use serde::{Deserialize, Serialize};

use crate::port::{Port, PortValue, OUTPORT_INFLOW_REQUEST, OUTPORT_OUTFLOW_ACHIEVED};
use crate::reliability::TimeState;
use crate::types::{ConfigError, InvariantViolation, RealTime};

use super::split_two_port;

/// The gating element: a transparent pipe while "on", a zero-limits gate
/// while "off". Boundaries of the schedule trigger internal events that
/// re-negotiate both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnOffSwitch {
    id: String,
    time: RealTime,
    schedule: Vec<TimeState>,
    next_idx: usize,
    on: bool,
    inflow: Port,
    outflow: Port,
    report_inflow_request: bool,
    report_outflow_achieved: bool,
}

impl OnOffSwitch {
    /// Create a new switch from a schedule of `(time, state)` entries.
    /// Entries at or before time zero determine the initial state (default
    /// "on").
    pub fn new(id: impl Into<String>, schedule: Vec<TimeState>) -> Result<Self, ConfigError> {
        let mut previous: RealTime = RealTime::MIN;
        for entry in &schedule {
            if entry.time < previous {
                return Err(ConfigError::NonMonotoneSchedule {
                    time: entry.time,
                    previous,
                });
            }
            previous = entry.time;
        }
        let mut on = true;
        let mut next_idx = 0;
        for entry in &schedule {
            if entry.time <= 0 {
                on = entry.state;
                next_idx += 1;
            } else {
                break;
            }
        }
        Ok(Self {
            id: id.into(),
            time: 0,
            schedule,
            next_idx,
            on,
            inflow: Port::default(),
            outflow: Port::default(),
            report_inflow_request: false,
            report_outflow_achieved: false,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn time(&self) -> RealTime {
        self.time
    }

    /// Whether the gate currently passes flow.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// The inflow port.
    pub fn inflow(&self) -> Port {
        self.inflow
    }

    /// The outflow port.
    pub fn outflow(&self) -> Port {
        self.outflow
    }

    /// Re-negotiate both sides after the gate state changed.
    fn apply_state(&mut self) -> Result<(), InvariantViolation> {
        let upstream_request = if self.on { self.outflow.requested() } else { 0.0 };
        let update = self.inflow.with_requested(upstream_request);
        self.report_inflow_request |= update.send_request;
        self.inflow = update.port;
        let downstream_achieved = if self.on {
            self.inflow.achieved().min(self.outflow.requested())
        } else {
            0.0
        };
        let update = self.outflow.with_achieved(downstream_achieved)?;
        self.report_outflow_achieved |= update.send_achieved;
        self.outflow = update.port;
        Ok(())
    }

    pub(crate) fn time_advance(&self) -> Option<RealTime> {
        if self.report_inflow_request || self.report_outflow_achieved {
            return Some(0);
        }
        self.schedule.get(self.next_idx).map(|entry| entry.time - self.time)
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        if self.report_inflow_request || self.report_outflow_achieved {
            self.report_inflow_request = false;
            self.report_outflow_achieved = false;
            return Ok(());
        }
        if let Some(entry) = self.schedule.get(self.next_idx) {
            self.time = entry.time;
            self.on = entry.state;
            self.next_idx += 1;
            self.apply_state()?;
        }
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
            if self.on {
                let update = self
                    .outflow
                    .with_achieved(self.inflow.achieved().min(self.outflow.requested()))?;
                self.report_outflow_achieved |= update.send_achieved;
                self.outflow = update.port;
            }
        }
        if let Some(or) = outflow_request {
            let update = self.outflow.with_requested(or);
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
            self.apply_state()?;
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
