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

//! A state-of-charge integrator with capacity and maximum charge rate.

use serde::{Deserialize, Serialize};

use crate::port::{Port, PortValue, OUTPORT_INFLOW_REQUEST, OUTPORT_OUTFLOW_ACHIEVED};
use crate::types::{ConfigError, FlowValue, InvariantViolation, RealTime, FLOW_TOLERANCE};

use super::split_two_port;

/// The storage element.
///
/// The state of charge (`soc`, normalized to `[0, 1]`) is a continuous
/// variable integrated only at transitions. While there is headroom the
/// store requests its maximum charge rate upstream; when full it requests
/// only the downstream demand (still capped by the charge rate, which
/// bounds the total inflow of the device). Internal events fire when the
/// state of charge reaches 0 (outflow becomes inflow-limited) or 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    id: String,
    time: RealTime,
    capacity: FlowValue,
    max_charge_rate: FlowValue,
    soc: f64,
    inflow: Port,
    outflow: Port,
    report_inflow_request: bool,
    report_outflow_achieved: bool,
    energy_in: FlowValue,
    energy_out: FlowValue,
    energy_spilled: FlowValue,
    energy_shortfall: FlowValue,
    initial_soc: f64,
}

impl Storage {
    /// Create a new store. `capacity` is in kilojoules, `max_charge_rate`
    /// in kilowatts, and `soc` in `[0, 1]`.
    pub fn new(
        id: impl Into<String>,
        capacity: FlowValue,
        max_charge_rate: FlowValue,
        soc: f64,
    ) -> Result<Self, ConfigError> {
        if capacity <= 0.0 {
            return Err(ConfigError::NonPositiveCapacity(capacity));
        }
        if max_charge_rate <= 0.0 {
            return Err(ConfigError::NonPositiveChargeRate(max_charge_rate));
        }
        if !(0.0..=1.0).contains(&soc) {
            return Err(ConfigError::SocOutOfRange(soc));
        }
        let mut store = Self {
            id: id.into(),
            time: 0,
            capacity,
            max_charge_rate,
            soc,
            inflow: Port::default(),
            outflow: Port::default(),
            report_inflow_request: false,
            report_outflow_achieved: false,
            energy_in: 0.0,
            energy_out: 0.0,
            energy_spilled: 0.0,
            energy_shortfall: 0.0,
            initial_soc: soc,
        };
        // a store with headroom starts charging right away
        if store.soc < 1.0 {
            let update = store.inflow.with_requested(store.max_charge_rate);
            store.report_inflow_request |= update.send_request;
            store.inflow = update.port;
        }
        Ok(store)
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn time(&self) -> RealTime {
        self.time
    }

    /// The current state of charge.
    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// The inflow port.
    pub fn inflow(&self) -> Port {
        self.inflow
    }

    /// The outflow port.
    pub fn outflow(&self) -> Port {
        self.outflow
    }

    /// The integrated energy balance error in kilojoules:
    /// `integral(inflow - outflow) - (soc - soc0) * capacity`, corrected by
    /// the spillage and shortfall of boundary quantization. Stays within
    /// tolerance of zero over any interval.
    pub fn energy_balance_error(&self) -> FlowValue {
        (self.energy_in - self.energy_out)
            - (self.soc - self.initial_soc) * self.capacity
            - self.energy_spilled
            + self.energy_shortfall
    }

    /// Integrated inflow and outflow energy, in kilojoules.
    pub fn energy_in_out(&self) -> (FlowValue, FlowValue) {
        (self.energy_in, self.energy_out)
    }

    /// Energy delivered past a full (or drawn past an empty) store because
    /// event times are quantized to whole seconds, in kilojoules.
    pub fn energy_spilled(&self) -> (FlowValue, FlowValue) {
        (self.energy_spilled, self.energy_shortfall)
    }

    /// Net charge rate under the current achieved flows, in kilowatts.
    fn net_inflow(&self) -> FlowValue {
        self.inflow.achieved() - self.outflow.achieved()
    }

    /// Integrate the state of charge over `dt` seconds. Boundary events are
    /// quantized to whole seconds, so the last step may overshoot; the
    /// overshoot is booked as spillage (or shortfall) and the state of
    /// charge clamped.
    fn advance(&mut self, dt: RealTime) {
        let dt_f = dt as f64;
        let raw_soc = self.soc + self.net_inflow() * dt_f / self.capacity;
        if raw_soc > 1.0 {
            self.energy_spilled += (raw_soc - 1.0) * self.capacity;
        } else if raw_soc < 0.0 {
            self.energy_shortfall += -raw_soc * self.capacity;
        }
        self.soc = raw_soc.clamp(0.0, 1.0);
        self.energy_in += self.inflow.achieved() * dt_f;
        self.energy_out += self.outflow.achieved() * dt_f;
        self.time += dt;
    }

    /// Re-derive both ports from the current state of charge.
    fn recompute_ports(&mut self) -> Result<(), InvariantViolation> {
        let available_out = if self.soc > 0.0 {
            self.outflow.requested()
        } else {
            self.inflow.achieved().min(self.outflow.requested())
        };
        let update = self.outflow.with_achieved(available_out)?;
        self.report_outflow_achieved |= update.send_achieved;
        self.outflow = update.port;
        let wanted_in = if self.soc < 1.0 {
            self.max_charge_rate
        } else {
            self.outflow.requested().min(self.max_charge_rate)
        };
        let update = self.inflow.with_requested(wanted_in);
        self.report_inflow_request |= update.send_request;
        self.inflow = update.port;
        Ok(())
    }

    pub(crate) fn time_advance(&self) -> Option<RealTime> {
        if self.report_inflow_request || self.report_outflow_achieved {
            return Some(0);
        }
        let net = self.net_inflow();
        if net > FLOW_TOLERANCE && self.soc < 1.0 {
            Some(((1.0 - self.soc) * self.capacity / net).ceil() as RealTime)
        } else if net < -FLOW_TOLERANCE && self.soc > 0.0 {
            Some((self.soc * self.capacity / -net).ceil() as RealTime)
        } else {
            None
        }
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        if self.report_inflow_request || self.report_outflow_achieved {
            self.report_inflow_request = false;
            self.report_outflow_achieved = false;
            return Ok(());
        }
        // state-of-charge boundary event
        if let Some(dt) = self.time_advance() {
            self.advance(dt);
            self.recompute_ports()?;
        }
        Ok(())
    }

    pub(crate) fn external_transition(
        &mut self,
        elapsed: RealTime,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        self.advance(elapsed);
        let (outflow_request, inflow_achieved) = split_two_port(&self.id, xs)?;
        if let Some(ia) = inflow_achieved {
            let update = self.inflow.with_achieved(ia)?;
            self.inflow = update.port;
        }
        if let Some(or) = outflow_request {
            let update = self.outflow.with_requested(or);
            self.report_outflow_achieved |= update.send_achieved;
            self.outflow = update.port;
        }
        self.recompute_ports()
    }

    pub(crate) fn confluent_transition(
        &mut self,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        if self.report_inflow_request || self.report_outflow_achieved {
            self.internal_transition()?;
            self.external_transition(0, xs)
        } else {
            // the external transition integrates up to the boundary itself
            let elapsed = self.time_advance().unwrap_or(0);
            self.external_transition(elapsed, xs)
        }
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
