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

//! The atomic models of the simulation.
//!
//! Every element owns its local flow state and steps through the five
//! standard transition functions: time advance, internal transition,
//! external transition, confluent transition, and output. The simulator
//! drives them through [`Element`], a tagged variant dispatching on the
//! element kind.

use serde::{Deserialize, Serialize};

use crate::flow_writer::FlowWriter;
use crate::port::PortValue;
use crate::types::{InvariantViolation, RealTime};

mod converter;
mod flow_limits;
mod load;
mod meter;
mod mover;
mod mux;
mod storage;
mod supply;
mod switch;
mod uncontrolled;

pub use converter::Converter;
pub use flow_limits::{FlowLimits, Limits};
pub use load::Load;
pub use meter::FlowMeter;
pub use mover::Mover;
pub use mux::{Mux, MuxDispatchStrategy};
pub use storage::Storage;
pub use supply::Supply;
pub use switch::OnOffSwitch;
pub use uncontrolled::UncontrolledSource;

/// An atomic model of the coupled network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    /// Clamp outflow requests into a `[lower, upper]` upstream request.
    FlowLimits(FlowLimits),
    /// Transparent pass-through that reports its port to the flow writer.
    FlowMeter(FlowMeter),
    /// Constant-efficiency conversion with lossflow and wasteflow.
    Converter(Converter),
    /// Schedule-driven sink.
    Load(Load),
    /// Schedule-driven, non-dispatchable source.
    UncontrolledSource(UncontrolledSource),
    /// Dispatchable source with an optional outflow cap.
    Supply(Supply),
    /// N-inflow, M-outflow dispatch point.
    Mux(Mux),
    /// State-of-charge integrator.
    Storage(Storage),
    /// Time-keyed open/closed gate.
    OnOffSwitch(OnOffSwitch),
    /// Two-inflow element coupled by a coefficient of performance.
    Mover(Mover),
}

macro_rules! dispatch {
    ($self:ident, $e:ident => $body:expr) => {
        match $self {
            Element::FlowLimits($e) => $body,
            Element::FlowMeter($e) => $body,
            Element::Converter($e) => $body,
            Element::Load($e) => $body,
            Element::UncontrolledSource($e) => $body,
            Element::Supply($e) => $body,
            Element::Mux($e) => $body,
            Element::Storage($e) => $body,
            Element::OnOffSwitch($e) => $body,
            Element::Mover($e) => $body,
        }
    };
}

impl Element {
    /// The element's tag (unique within one built network).
    pub fn id(&self) -> &str {
        dispatch!(self, e => e.id())
    }

    /// The element's local clock: the real time of its last transition.
    pub fn time(&self) -> RealTime {
        dispatch!(self, e => e.time())
    }

    /// Time until the next internal event, or `None` for "never".
    pub fn time_advance(&self) -> Option<RealTime> {
        dispatch!(self, e => e.time_advance())
    }

    /// Apply the internal transition (fires at `time() + time_advance()`,
    /// after [`Element::output`] has been collected).
    pub fn internal_transition(&mut self) -> Result<(), InvariantViolation> {
        dispatch!(self, e => e.internal_transition())
    }

    /// Apply an external transition: `elapsed` seconds have passed since the
    /// last transition, and the messages `xs` arrived.
    pub fn external_transition(
        &mut self,
        elapsed: RealTime,
        xs: &[PortValue],
    ) -> Result<(), InvariantViolation> {
        dispatch!(self, e => e.external_transition(elapsed, xs))
    }

    /// Apply the confluent transition: the internal event and external
    /// messages coincide.
    pub fn confluent_transition(&mut self, xs: &[PortValue]) -> Result<(), InvariantViolation> {
        dispatch!(self, e => e.confluent_transition(xs))
    }

    /// Collect the output messages pending at the next internal event.
    pub fn output(&self, ys: &mut Vec<PortValue>) {
        dispatch!(self, e => e.output(ys))
    }

    /// Report instrumented flows to the writer. Only metering elements
    /// record anything.
    pub fn record(&self, writer: &mut FlowWriter) {
        if let Element::FlowMeter(meter) = self {
            meter.record(writer);
        }
    }
}

macro_rules! impl_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Element {
            fn from(e: $ty) -> Self {
                Element::$variant(e)
            }
        }
    };
}

impl_from!(FlowLimits, FlowLimits);
impl_from!(FlowMeter, FlowMeter);
impl_from!(Converter, Converter);
impl_from!(Load, Load);
impl_from!(UncontrolledSource, UncontrolledSource);
impl_from!(Supply, Supply);
impl_from!(Mux, Mux);
impl_from!(Storage, Storage);
impl_from!(OnOffSwitch, OnOffSwitch);
impl_from!(Mover, Mover);

/// Accumulate the messages of a two-port element (single inflow, single
/// outflow): returns `(outflow_request, inflow_achieved)` sums, or an error
/// for any other port.
pub(crate) fn split_two_port(
    id: &str,
    xs: &[PortValue],
) -> Result<(Option<f64>, Option<f64>), InvariantViolation> {
    use crate::port::{INPORT_INFLOW_ACHIEVED, INPORT_OUTFLOW_REQUEST};
    let mut outflow_request = None;
    let mut inflow_achieved = None;
    for x in xs {
        if x.port == INPORT_OUTFLOW_REQUEST {
            *outflow_request.get_or_insert(0.0) += x.value;
        } else if x.port == INPORT_INFLOW_ACHIEVED {
            *inflow_achieved.get_or_insert(0.0) += x.value;
        } else {
            return Err(InvariantViolation::UnhandledPort { element: id.to_string(), port: x.port });
        }
    }
    Ok((outflow_request, inflow_achieved))
}
