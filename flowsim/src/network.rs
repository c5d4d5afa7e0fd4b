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

//! # Top-level Network module
//!
//! The [`Network`] owns the atomic elements, their couplings and the event
//! queue, and drives the coupled model forward until quiescence or a
//! deadline.
//!
//! Within one super-dense instant, messages produced by the imminent
//! elements' output functions are delivered to all coupled recipients
//! before any transition runs (closure under coupling). Ties on real time
//! are broken by the logical time component, which increments monotonically
//! while the real instant stands still.

use std::collections::HashMap;

use itertools::Itertools;
use log::*;
use petgraph::prelude::*;
use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::event::EventQueue;
use crate::flow_writer::FlowWriter;
use crate::port::{PortValue, INPORT_OUTFLOW_REQUEST, MAX_PORTS_PER_DIRECTION, OUTPORT_INFLOW_REQUEST};
use crate::types::{ElementId, IndexType, RealTime, SimulationError, SuperDenseTime};

/// If real time stands still for more than this many iterations per
/// element, the run is aborted as a live-lock.
pub const MAX_NO_ADVANCE_FACTOR: usize = 10_000;

/// A directed coupling: the source element's output port feeds the target
/// element's input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupling {
    /// Encoded output port on the source element.
    pub source_port: usize,
    /// Encoded input port on the target element.
    pub target_port: usize,
}

/// # Network struct
///
/// The coupled model: atomic elements held in an arena indexed by
/// [`ElementId`], couplings stored as edges of a stable graph, plus the
/// event queue and the flow writer of the current run.
#[derive(Debug)]
pub struct Network {
    pub(crate) graph: StableGraph<(), Coupling, Directed, IndexType>,
    pub(crate) elements: HashMap<ElementId, Element>,
    pub(crate) queue: EventQueue,
    pub(crate) writer: FlowWriter,
    pub(crate) time: SuperDenseTime,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(FlowWriter::new())
    }
}

impl Network {
    /// Generate an empty network recording into the given writer.
    pub fn new(writer: FlowWriter) -> Self {
        Self {
            graph: StableGraph::default(),
            elements: HashMap::new(),
            queue: EventQueue::new(),
            writer,
            time: SuperDenseTime::ZERO,
        }
    }

    /// Add a new atomic element and schedule its initial event. Returns the
    /// id used to couple it.
    pub fn add_element(&mut self, element: impl Into<Element>) -> ElementId {
        let element = element.into();
        let id = self.graph.add_node(());
        if let Some(dt) = element.time_advance() {
            self.queue.schedule(id, SuperDenseTime::new(dt, 0));
        }
        self.elements.insert(id, element);
        id
    }

    /// Couple an output port of `source` to an input port of `target`.
    pub fn couple(
        &mut self,
        source: ElementId,
        source_port: usize,
        target: ElementId,
        target_port: usize,
    ) -> Result<(), SimulationError> {
        if !self.elements.contains_key(&source) {
            return Err(SimulationError::ElementNotFound(source));
        }
        if !self.elements.contains_key(&target) {
            return Err(SimulationError::ElementNotFound(target));
        }
        debug_assert!(
            (OUTPORT_INFLOW_REQUEST..OUTPORT_INFLOW_REQUEST + 2 * MAX_PORTS_PER_DIRECTION)
                .contains(&source_port),
            "source_port must be an output port"
        );
        debug_assert!(target_port < INPORT_OUTFLOW_REQUEST + MAX_PORTS_PER_DIRECTION);
        self.graph.add_edge(source, target, Coupling { source_port, target_port });
        Ok(())
    }

    /// Returns the number of elements in the network.
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Returns a reference to the element, if present.
    pub fn get_element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Iterate over all elements with their ids.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements.iter().map(|(id, e)| (*id, e))
    }

    /// The current super-dense time of the simulation.
    pub fn now(&self) -> SuperDenseTime {
        self.time
    }

    /// A reference to the flow writer.
    pub fn writer(&self) -> &FlowWriter {
        &self.writer
    }

    /// Close the recording at `duration` and hand the writer out.
    pub fn finalize(mut self, duration: RealTime) -> FlowWriter {
        self.writer.finalize_at(duration);
        self.writer
    }

    /// Simulate the network until the event queue runs dry or the next
    /// event would fall after `duration` seconds. Aborts with
    /// [`SimulationError::Divergence`] if real time stands still for more
    /// than [`MAX_NO_ADVANCE_FACTOR`] iterations per element.
    pub fn simulate(&mut self, duration: RealTime) -> Result<(), SimulationError> {
        let limit = MAX_NO_ADVANCE_FACTOR * self.elements.len().max(1);
        let mut non_advance: usize = 0;
        while let Some(t_next) = self.queue.next_time() {
            if t_next.real > duration {
                break;
            }
            if t_next.real == self.time.real {
                non_advance += 1;
            } else {
                non_advance = 0;
            }
            if non_advance >= limit {
                error!(
                    "non-advance budget exhausted at {}: {} iterations (limit {})",
                    self.time, non_advance, limit
                );
                return Err(SimulationError::Divergence {
                    time: self.time,
                    iterations: non_advance,
                    limit,
                });
            }
            self.step(t_next)?;
            self.time = t_next;
        }
        Ok(())
    }

    /// Execute one super-dense instant: route the imminent elements'
    /// outputs, then apply internal, external and confluent transitions.
    fn step(&mut self, t: SuperDenseTime) -> Result<(), SimulationError> {
        let imminent = self.queue.pop_imminent(t);
        trace!(
            "step at {} with imminent [{}]",
            t,
            imminent.iter().filter_map(|id| self.elements.get(id)).map(Element::id).join(", ")
        );

        // deliver all outputs before any transition runs
        let mut inbox: HashMap<ElementId, Vec<PortValue>> = HashMap::new();
        let mut ys = Vec::new();
        for id in &imminent {
            let element =
                self.elements.get(id).ok_or(SimulationError::ElementNotFound(*id))?;
            ys.clear();
            element.output(&mut ys);
            for pv in &ys {
                let mut delivered = false;
                for edge in self.graph.edges(*id) {
                    let coupling = edge.weight();
                    if coupling.source_port == pv.port {
                        trace!("  {} --[{}]--> {:?}", element.id(), pv, edge.target());
                        inbox
                            .entry(edge.target())
                            .or_default()
                            .push(PortValue::new(coupling.target_port, pv.value));
                        delivered = true;
                    }
                }
                if !delivered {
                    // unconnected ports absorb their flow
                    trace!("  {} --[{}]--> (unconnected)", element.id(), pv);
                }
            }
        }

        let mut touched = imminent;
        for id in &touched {
            let element =
                self.elements.get_mut(id).ok_or(SimulationError::ElementNotFound(*id))?;
            match inbox.remove(id) {
                Some(xs) => element.confluent_transition(&xs)?,
                None => element.internal_transition()?,
            }
        }
        for (id, xs) in inbox {
            let element =
                self.elements.get_mut(&id).ok_or(SimulationError::ElementNotFound(id))?;
            let elapsed = t.real - element.time();
            element.external_transition(elapsed, &xs)?;
            touched.push(id);
        }

        // reschedule the touched elements and record instrumented flows
        let Self { elements, queue, writer, .. } = self;
        for id in touched {
            let element = elements.get(&id).ok_or(SimulationError::ElementNotFound(id))?;
            match element.time_advance() {
                Some(dt) => queue.schedule(id, t.after(dt)),
                None => queue.cancel(id),
            }
            element.record(writer);
        }
        Ok(())
    }
}
