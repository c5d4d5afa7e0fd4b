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

//! The N-inflow, M-outflow dispatch point.

use serde::{Deserialize, Serialize};

use crate::port::{
    Port, PortValue, INPORT_INFLOW_ACHIEVED, INPORT_OUTFLOW_REQUEST, MAX_PORTS_PER_DIRECTION,
    OUTPORT_INFLOW_REQUEST, OUTPORT_OUTFLOW_ACHIEVED,
};
use crate::types::{ConfigError, FlowValue, InvariantViolation, RealTime, FLOW_TOLERANCE};

/// Upper bound on the rounds of the even-share dispatch loop. A safety
/// guard, not a convergence proof; 100 rounds comfortably cover any
/// configuration within [`MAX_PORTS_PER_DIRECTION`].
const MAX_DISTRIBUTE_ITERATIONS: usize = 100;

/// How a mux dispatches its pooled inflow onto its outflow ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuxDispatchStrategy {
    /// Satisfy outflow ports in index order, each consuming what remains.
    InOrder,
    /// Grant every unsatisfied outflow an equal share of the remaining
    /// supply until it is capped by its request or the supply is exhausted.
    Distribute,
}

impl std::fmt::Display for MuxDispatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::InOrder => "in_order",
            Self::Distribute => "distribute",
        })
    }
}

/// The dispatch element.
///
/// Inflow ports are drawn in index order: port 0 is asked for the total
/// outflow request, and only when it falls short is the difference pulled
/// from the next higher-index port. Outflows are filled according to the
/// [`MuxDispatchStrategy`]. Ties always resolve by increasing port index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mux {
    id: String,
    time: RealTime,
    num_inflows: usize,
    num_outflows: usize,
    inflow_ports: Vec<Port>,
    outflow_ports: Vec<Port>,
    report_inflow_request: Vec<bool>,
    report_outflow_achieved: Vec<bool>,
    strategy: MuxDispatchStrategy,
}

fn check_num_flows(side: &'static str, count: usize) -> Result<(), ConfigError> {
    if count < 1 || count > MAX_PORTS_PER_DIRECTION {
        return Err(ConfigError::InvalidPortCount { side, max: MAX_PORTS_PER_DIRECTION, count });
    }
    Ok(())
}

impl Mux {
    /// Create a new mux.
    pub fn new(
        id: impl Into<String>,
        num_inflows: usize,
        num_outflows: usize,
        strategy: MuxDispatchStrategy,
    ) -> Result<Self, ConfigError> {
        check_num_flows("num_inflows", num_inflows)?;
        check_num_flows("num_outflows", num_outflows)?;
        Ok(Self {
            id: id.into(),
            time: 0,
            num_inflows,
            num_outflows,
            inflow_ports: vec![Port::default(); num_inflows],
            outflow_ports: vec![Port::default(); num_outflows],
            report_inflow_request: vec![false; num_inflows],
            report_outflow_achieved: vec![false; num_outflows],
            strategy,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn time(&self) -> RealTime {
        self.time
    }

    /// The inflow ports.
    pub fn inflow_ports(&self) -> &[Port] {
        &self.inflow_ports
    }

    /// The outflow ports.
    pub fn outflow_ports(&self) -> &[Port] {
        &self.outflow_ports
    }

    /// Sum of achieved flow over all inflow ports.
    pub fn total_inflow_achieved(&self) -> FlowValue {
        self.inflow_ports.iter().map(Port::achieved).sum()
    }

    /// Sum of requested flow over all outflow ports.
    pub fn total_outflow_request(&self) -> FlowValue {
        self.outflow_ports.iter().map(Port::requested).sum()
    }

    /// Sum of achieved flow over all outflow ports.
    pub fn total_outflow_achieved(&self) -> FlowValue {
        self.outflow_ports.iter().map(Port::achieved).sum()
    }

    /// Restart the inflow negotiation: ask port 0 for the whole request and
    /// zero out all higher ports.
    fn rerequest_inflows_in_order(&mut self, total_request: FlowValue) {
        for (idx, port) in self.inflow_ports.iter_mut().enumerate() {
            let request = if idx == 0 { total_request } else { 0.0 };
            let update = port.with_requested(request);
            self.report_inflow_request[idx] |= update.send_request;
            *port = update.port;
        }
    }

    /// Pull `amount` from the inflow port at `start`, advancing to higher
    /// indices only past ports whose short answers are already known.
    fn request_difference_from(&mut self, start: usize, amount: FlowValue) {
        let mut target = start;
        let mut remaining = amount;
        for idx in start..self.num_inflows {
            if idx == target {
                let update = self.inflow_ports[idx].with_requested(remaining);
                let already_asked = !update.send_request;
                self.report_inflow_request[idx] |= update.send_request;
                self.inflow_ports[idx] = update.port;
                let achieved = self.inflow_ports[idx].achieved();
                if already_asked && achieved < remaining - FLOW_TOLERANCE {
                    // this port already answered short; move on
                    target += 1;
                }
                remaining = (remaining - achieved).max(0.0);
            } else {
                let update = self.inflow_ports[idx].with_requested(0.0);
                self.report_inflow_request[idx] |= update.send_request;
                self.inflow_ports[idx] = update.port;
            }
        }
    }

    /// Dispatch `amount` onto the outflow ports according to the strategy.
    fn distribute_outflows(&mut self, amount: FlowValue) -> Result<(), InvariantViolation> {
        if amount < 0.0 {
            return Err(InvariantViolation::NegativeFlow(amount));
        }
        let supplies = match self.strategy {
            MuxDispatchStrategy::InOrder => self.split_in_order(amount)?,
            MuxDispatchStrategy::Distribute => self.split_evenly(amount)?,
        };
        for (idx, supply) in supplies.into_iter().enumerate() {
            let update = self.outflow_ports[idx]
                .with_achieved(supply.min(self.outflow_ports[idx].requested()))?;
            self.report_outflow_achieved[idx] |= update.send_achieved;
            self.outflow_ports[idx] = update.port;
        }
        Ok(())
    }

    fn split_in_order(&self, amount: FlowValue) -> Result<Vec<FlowValue>, InvariantViolation> {
        let mut remaining = amount;
        let mut supplies = Vec::with_capacity(self.num_outflows);
        for port in &self.outflow_ports {
            let grant = port.requested().min(remaining);
            supplies.push(grant);
            remaining -= grant;
        }
        if remaining > FLOW_TOLERANCE {
            return Err(InvariantViolation::OversupplyAtDispatch {
                delivered: amount,
                requested: self.total_outflow_request(),
            });
        }
        Ok(supplies)
    }

    fn split_evenly(&self, amount: FlowValue) -> Result<Vec<FlowValue>, InvariantViolation> {
        let requests: Vec<FlowValue> =
            self.outflow_ports.iter().map(Port::requested).collect();
        let total_requested: FlowValue = requests.iter().sum();
        if amount > total_requested + FLOW_TOLERANCE {
            return Err(InvariantViolation::OversupplyAtDispatch {
                delivered: amount,
                requested: total_requested,
            });
        }
        let mut supplies = vec![0.0; requests.len()];
        let mut live = requests.len();
        let mut remaining = amount;
        let mut rounds = 0;
        while live > 0 && remaining > FLOW_TOLERANCE {
            rounds += 1;
            if rounds > MAX_DISTRIBUTE_ITERATIONS {
                return Err(InvariantViolation::DispatchNotConverged {
                    iterations: MAX_DISTRIBUTE_ITERATIONS,
                });
            }
            let share = remaining / live as FlowValue;
            live = 0;
            for (supply, request) in supplies.iter_mut().zip(&requests) {
                let granted = *supply + share;
                if granted > request + FLOW_TOLERANCE {
                    remaining += (granted - request) - share;
                    *supply = *request;
                } else if (granted - request).abs() <= FLOW_TOLERANCE {
                    remaining -= share;
                    *supply = *request;
                } else {
                    remaining -= share;
                    *supply = granted;
                    live += 1;
                }
            }
        }
        Ok(supplies)
    }

    pub(crate) fn time_advance(&self) -> Option<RealTime> {
        let report = self.report_inflow_request.iter().any(|b| *b)
            || self.report_outflow_achieved.iter().any(|b| *b);
        if report {
            Some(0)
        } else {
            None
        }
    }

    pub(crate) fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        self.report_inflow_request.iter_mut().for_each(|b| *b = false);
        self.report_outflow_achieved.iter_mut().for_each(|b| *b = false);
        Ok(())
    }

    pub(crate) fn external_transition(
        &mut self,
        elapsed: RealTime,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        self.time += elapsed;
        let mut got_outflow_request = false;
        let mut highest_inflow_received: Option<usize> = None;
        for x in xs {
            if (INPORT_INFLOW_ACHIEVED..INPORT_INFLOW_ACHIEVED + self.num_inflows)
                .contains(&x.port)
            {
                let idx = x.port - INPORT_INFLOW_ACHIEVED;
                highest_inflow_received = highest_inflow_received.max(Some(idx));
                let update = self.inflow_ports[idx].with_achieved(x.value)?;
                self.inflow_ports[idx] = update.port;
            } else if (INPORT_OUTFLOW_REQUEST..INPORT_OUTFLOW_REQUEST + self.num_outflows)
                .contains(&x.port)
            {
                let idx = x.port - INPORT_OUTFLOW_REQUEST;
                let update = self.outflow_ports[idx].with_requested(x.value);
                self.report_outflow_achieved[idx] |= update.send_achieved;
                self.outflow_ports[idx] = update.port;
                got_outflow_request = true;
            } else {
                return Err(InvariantViolation::UnhandledPort {
                    element: self.id.clone(),
                    port: x.port,
                });
            }
        }
        let total_achieved = self.total_inflow_achieved();
        let total_request = self.total_outflow_request();
        let diff = total_achieved - total_request;
        if diff > FLOW_TOLERANCE {
            // oversupply: restart requests from port zero so upstream gives
            // less, and hand every outflow its full request
            self.rerequest_inflows_in_order(total_request);
            self.distribute_outflows(total_request)?;
        } else if diff < -FLOW_TOLERANCE {
            if got_outflow_request {
                // the demand changed this instant: restart the negotiation
                self.rerequest_inflows_in_order(total_request);
                self.distribute_outflows(total_request)?;
            } else if highest_inflow_received >= Some(self.num_inflows - 1) {
                // every inflow has spoken; dispatch what we actually have
                self.distribute_outflows(total_achieved)?;
            } else {
                let next = highest_inflow_received.map(|h| h + 1).unwrap_or(0);
                self.request_difference_from(next, -diff);
                let total_achieved = self.total_inflow_achieved();
                self.distribute_outflows(total_achieved)?;
            }
        } else {
            self.distribute_outflows(total_request)?;
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
        for (idx, report) in self.report_inflow_request.iter().enumerate() {
            if *report {
                ys.push(PortValue::new(
                    OUTPORT_INFLOW_REQUEST + idx,
                    self.inflow_ports[idx].requested(),
                ));
            }
        }
        for (idx, report) in self.report_outflow_achieved.iter().enumerate() {
            if *report {
                ys.push(PortValue::new(
                    OUTPORT_OUTFLOW_ACHIEVED + idx,
                    self.outflow_ports[idx].achieved(),
                ));
            }
        }
    }
}
