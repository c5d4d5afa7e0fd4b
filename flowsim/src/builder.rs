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

//! Materializes components and couplings into a runnable [`Network`].
//!
//! On first sight of a component the builder samples its fragility: an
//! unrepairable failure materializes as zero-limit pipes on every port; a
//! repairable failure, or a reliability schedule, wraps the component with
//! gates on the outflow side (and transparent meters on the inflow side).

use std::collections::{BTreeMap, HashMap};

use log::*;

use crate::component::{Component, ComponentKind, Connection};
use crate::distribution::{DistId, DistributionSystem};
use crate::element::{
    Converter, FlowLimits, FlowMeter, Load, Mover, Mux, OnOffSwitch, Storage, Supply,
    UncontrolledSource,
};
use crate::flow_writer::SeriesInfo;
use crate::fragility;
use crate::network::Network;
use crate::port::{
    INPORT_INFLOW_ACHIEVED, INPORT_OUTFLOW_REQUEST, OUTPORT_INFLOW_REQUEST,
    OUTPORT_OUTFLOW_ACHIEVED,
};
use crate::reliability::TimeState;
use crate::types::{ElementId, PortRole, RealTime, ReferenceError, SimulationError, Stream};

/// The connectable surface of a materialized component: the element and
/// port-index behind each exposed inflow and outflow port.
#[derive(Debug, Clone, Default)]
pub struct BuiltComponent {
    /// Exposed inflow ports, by port number.
    pub inflows: Vec<(ElementId, usize)>,
    /// Exposed outflow ports, by port number.
    pub outflows: Vec<(ElementId, usize)>,
    /// All elements added for this component.
    pub elements: Vec<ElementId>,
}

/// Everything the builder needs to materialize one scenario's network.
#[derive(Debug)]
pub struct NetworkBuilder<'a> {
    /// Components by id.
    pub components: &'a BTreeMap<String, Component>,
    /// The scenario the network is built for (selects schedules).
    pub scenario: &'a str,
    /// Scenario duration in seconds (bounds repair times).
    pub duration: RealTime,
    /// Failure probabilities per component id, sorted descending, paired
    /// with the repair distribution of the mode they belong to.
    pub failure_probs: &'a HashMap<String, Vec<(f64, Option<DistId>)>>,
    /// Clipped reliability schedules per component id.
    pub reliability: &'a HashMap<String, Vec<TimeState>>,
    /// Distribution registry (for repair draws).
    pub dists: &'a DistributionSystem,
}

enum Overlay<'a> {
    None,
    Failed,
    Gated(&'a [TimeState]),
}

impl<'a> NetworkBuilder<'a> {
    /// Materialize all components referenced by `connections` and couple
    /// them. Returns the network together with the per-component surface
    /// map.
    pub fn build(
        &self,
        connections: &[Connection],
        rand_fn: &mut dyn FnMut() -> f64,
    ) -> Result<(Network, BTreeMap<String, BuiltComponent>), SimulationError> {
        let mut net = Network::default();
        let mut built: BTreeMap<String, BuiltComponent> = BTreeMap::new();
        for connection in connections {
            self.check_stream_consistency(connection)?;
            for endpoint in [&connection.source.component, &connection.target.component] {
                if !built.contains_key(endpoint) {
                    let surface = self.add_component(&mut net, endpoint, rand_fn)?;
                    built.insert(endpoint.clone(), surface);
                }
            }
            let source = &built[&connection.source.component];
            let (src_el, src_port) =
                *source.outflows.get(connection.source.port).ok_or_else(|| {
                    ReferenceError::Port {
                        component: connection.source.component.clone(),
                        direction: "outflow",
                        port: connection.source.port,
                    }
                })?;
            let target = &built[&connection.target.component];
            let (dst_el, dst_port) =
                *target.inflows.get(connection.target.port).ok_or_else(|| {
                    ReferenceError::Port {
                        component: connection.target.component.clone(),
                        direction: "inflow",
                        port: connection.target.port,
                    }
                })?;
            net.couple(
                src_el,
                OUTPORT_OUTFLOW_ACHIEVED + src_port,
                dst_el,
                INPORT_INFLOW_ACHIEVED + dst_port,
            )?;
            net.couple(
                dst_el,
                OUTPORT_INFLOW_REQUEST + dst_port,
                src_el,
                INPORT_OUTFLOW_REQUEST + src_port,
            )?;
        }
        Ok((net, built))
    }

    /// Verify that both endpoints of a connection exist and agree with the
    /// declared stream.
    fn check_stream_consistency(&self, connection: &Connection) -> Result<(), SimulationError> {
        let source = self
            .components
            .get(&connection.source.component)
            .ok_or_else(|| ReferenceError::Component(connection.source.component.clone()))?;
        let target = self
            .components
            .get(&connection.target.component)
            .ok_or_else(|| ReferenceError::Component(connection.target.component.clone()))?;
        let source_stream =
            source.outflow_stream(connection.source.port).ok_or_else(|| ReferenceError::Port {
                component: connection.source.component.clone(),
                direction: "outflow",
                port: connection.source.port,
            })?;
        let sink_stream =
            target.inflow_stream(connection.target.port).ok_or_else(|| ReferenceError::Port {
                component: connection.target.component.clone(),
                direction: "inflow",
                port: connection.target.port,
            })?;
        if *source_stream != connection.stream || *sink_stream != connection.stream {
            return Err(SimulationError::StreamMismatch {
                source_endpoint: format!(
                    "{}:OUT({})",
                    connection.source.component, connection.source.port
                ),
                target: format!("{}:IN({})", connection.target.component, connection.target.port),
                source_stream: source_stream.clone(),
                sink_stream: sink_stream.clone(),
                stream: connection.stream.clone(),
            });
        }
        Ok(())
    }

    /// Materialize one component, sampling its fragility and applying the
    /// reliability overlay.
    fn add_component(
        &self,
        net: &mut Network,
        id: &str,
        rand_fn: &mut dyn FnMut() -> f64,
    ) -> Result<BuiltComponent, SimulationError> {
        let component =
            self.components.get(id).ok_or_else(|| ReferenceError::Component(id.to_string()))?;
        let mut surface = self.materialize(net, component)?;

        let schedule = self.reliability.get(id).map(Vec::as_slice).unwrap_or(&[]);
        let no_probs = Vec::new();
        let probs = self.failure_probs.get(id).unwrap_or(&no_probs);
        let failure_schedule;
        let overlay = match fragility::sample_failure(probs, rand_fn) {
            Some(None) => {
                debug!("component {id} failed (unrepairable): zero-limit pipes");
                Overlay::Failed
            }
            Some(Some(repair_dist)) => {
                let repair_s = self.dists.next_time_advance(repair_dist, rand_fn())?;
                debug!("component {id} failed, repair after {repair_s} s");
                failure_schedule =
                    fragility::modify_schedule_for_fragility(schedule, Some(repair_s), self.duration);
                Overlay::Gated(&failure_schedule)
            }
            None if !schedule.is_empty() => Overlay::Gated(schedule),
            None => Overlay::None,
        };
        self.apply_overlay(net, component, &mut surface, overlay)?;
        Ok(surface)
    }

    /// Instantiate the atomic elements of a component (without overlays)
    /// and record the exposed ports.
    fn materialize(
        &self,
        net: &mut Network,
        component: &Component,
    ) -> Result<BuiltComponent, SimulationError> {
        let id = &component.id;
        let mut surface = BuiltComponent::default();
        match &component.kind {
            ComponentKind::Load { stream, .. } => {
                let items = component
                    .schedule_for(self.scenario)
                    .ok_or_else(|| ReferenceError::Scenario(self.scenario.to_string()))?;
                let load = net.add_element(Load::new(format!("{id}-load"), items.to_vec())?);
                let meter = self.add_meter(
                    net,
                    format!("{id}-inflow"),
                    stream,
                    component,
                    PortRole::LoadInflow,
                    true,
                )?;
                couple_pipe(net, meter, 0, load, 0)?;
                surface.inflows.push((meter, 0));
                surface.elements.extend([load, meter]);
            }
            ComponentKind::Source { stream, max_outflow } => {
                let supply = net.add_element(Supply::new(format!("{id}-supply"), *max_outflow));
                let meter = self.add_meter(
                    net,
                    format!("{id}-outflow"),
                    stream,
                    component,
                    PortRole::SourceOutflow,
                    true,
                )?;
                couple_pipe(net, supply, 0, meter, 0)?;
                surface.outflows.push((meter, 0));
                surface.elements.extend([supply, meter]);
            }
            ComponentKind::UncontrolledSource { stream, .. } => {
                let items = component
                    .schedule_for(self.scenario)
                    .ok_or_else(|| ReferenceError::Scenario(self.scenario.to_string()))?;
                let source = net.add_element(UncontrolledSource::new(
                    format!("{id}-source"),
                    items.to_vec(),
                )?);
                let meter = self.add_meter(
                    net,
                    format!("{id}-outflow"),
                    stream,
                    component,
                    PortRole::SourceOutflow,
                    true,
                )?;
                couple_pipe(net, source, 0, meter, 0)?;
                surface.outflows.push((meter, 0));
                surface.elements.extend([source, meter]);
            }
            ComponentKind::Converter { inflow_stream, outflow_stream, efficiency, .. } => {
                let converter =
                    net.add_element(Converter::new(format!("{id}-converter"), *efficiency)?);
                let meter_in = self.add_meter(
                    net,
                    format!("{id}-inflow"),
                    inflow_stream,
                    component,
                    PortRole::Inflow,
                    true,
                )?;
                let meter_out = self.add_meter(
                    net,
                    format!("{id}-outflow"),
                    outflow_stream,
                    component,
                    PortRole::Outflow,
                    true,
                )?;
                couple_pipe(net, meter_in, 0, converter, 0)?;
                couple_pipe(net, converter, 0, meter_out, 0)?;
                surface.inflows.push((meter_in, 0));
                surface.outflows.push((meter_out, 0));
                // the lossflow is exposed directly on the converter
                surface.outflows.push((converter, 1));
                surface.elements.extend([converter, meter_in, meter_out]);
            }
            ComponentKind::Mux { num_inflows, num_outflows, strategy, .. } => {
                let mux = net.add_element(Mux::new(
                    format!("{id}-mux"),
                    *num_inflows,
                    *num_outflows,
                    *strategy,
                )?);
                surface.inflows.extend((0..*num_inflows).map(|k| (mux, k)));
                surface.outflows.extend((0..*num_outflows).map(|k| (mux, k)));
                surface.elements.push(mux);
            }
            ComponentKind::PassThrough { stream, limits } => {
                let meter = self.add_meter(
                    net,
                    format!("{id}-outflow"),
                    stream,
                    component,
                    PortRole::Outflow,
                    true,
                )?;
                if let Some(limits) = limits {
                    let limiter =
                        net.add_element(FlowLimits::new(format!("{id}-limits"), *limits));
                    couple_pipe(net, limiter, 0, meter, 0)?;
                    surface.inflows.push((limiter, 0));
                    surface.elements.push(limiter);
                } else {
                    surface.inflows.push((meter, 0));
                }
                surface.outflows.push((meter, 0));
                surface.elements.push(meter);
            }
            ComponentKind::Storage { stream, capacity, max_charge_rate, init_soc } => {
                let store = net.add_element(Storage::new(
                    format!("{id}-store"),
                    *capacity,
                    *max_charge_rate,
                    *init_soc,
                )?);
                let meter_in = self.add_meter(
                    net,
                    format!("{id}-inflow"),
                    stream,
                    component,
                    PortRole::StorageInflow,
                    true,
                )?;
                let meter_out = self.add_meter(
                    net,
                    format!("{id}-outflow"),
                    stream,
                    component,
                    PortRole::StorageOutflow,
                    true,
                )?;
                couple_pipe(net, meter_in, 0, store, 0)?;
                couple_pipe(net, store, 0, meter_out, 0)?;
                surface.inflows.push((meter_in, 0));
                surface.outflows.push((meter_out, 0));
                surface.elements.extend([store, meter_in, meter_out]);
            }
            ComponentKind::Mover { outflow_stream, cop, .. } => {
                let mover = net.add_element(Mover::new(format!("{id}-mover"), *cop)?);
                let meter = self.add_meter(
                    net,
                    format!("{id}-outflow"),
                    outflow_stream,
                    component,
                    PortRole::Outflow,
                    true,
                )?;
                couple_pipe(net, mover, 0, meter, 0)?;
                surface.inflows.extend([(mover, 0), (mover, 1)]);
                surface.outflows.push((meter, 0));
                surface.elements.extend([mover, meter]);
            }
        }
        Ok(surface)
    }

    /// Register a series and add the meter element observing it.
    fn add_meter(
        &self,
        net: &mut Network,
        tag: String,
        stream: &Stream,
        component: &Component,
        role: PortRole,
        record: bool,
    ) -> Result<ElementId, SimulationError> {
        let info = SeriesInfo {
            tag: tag.clone(),
            stream: stream.clone(),
            component_type: component.component_type(),
            port_role: role,
        };
        let writer_id = net.writer.register(info, record)?;
        Ok(net.add_element(FlowMeter::new(format!("{tag}-meter"), writer_id)))
    }

    /// Wrap the exposed ports of a component according to the overlay.
    fn apply_overlay(
        &self,
        net: &mut Network,
        component: &Component,
        surface: &mut BuiltComponent,
        overlay: Overlay<'_>,
    ) -> Result<(), SimulationError> {
        let id = &component.id;
        match overlay {
            Overlay::None => Ok(()),
            Overlay::Failed => {
                for k in 0..surface.inflows.len() {
                    let pipe =
                        net.add_element(FlowLimits::failed(format!("{id}-inflow-pipe-{k}")));
                    wrap_inflow(net, surface, k, pipe)?;
                }
                for k in 0..surface.outflows.len() {
                    let pipe =
                        net.add_element(FlowLimits::failed(format!("{id}-outflow-pipe-{k}")));
                    wrap_outflow(net, surface, k, pipe)?;
                }
                Ok(())
            }
            Overlay::Gated(schedule) => {
                for k in 0..surface.inflows.len() {
                    let writer_id = net.writer.register(
                        SeriesInfo {
                            tag: format!("{id}-inflow-gate-{k}"),
                            stream: component
                                .inflow_stream(k)
                                .cloned()
                                .unwrap_or_else(|| Stream::from("unknown")),
                            component_type: component.component_type(),
                            port_role: PortRole::Inflow,
                        },
                        false,
                    )?;
                    let meter = net
                        .add_element(FlowMeter::new(format!("{id}-inflow-gate-{k}"), writer_id));
                    wrap_inflow(net, surface, k, meter)?;
                }
                for k in 0..surface.outflows.len() {
                    let gate = net.add_element(OnOffSwitch::new(
                        format!("{id}-outflow-gate-{k}"),
                        schedule.to_vec(),
                    )?);
                    wrap_outflow(net, surface, k, gate)?;
                }
                Ok(())
            }
        }
    }
}

/// Couple `upstream`'s outflow port to `downstream`'s inflow port (both
/// directions of the negotiation).
fn couple_pipe(
    net: &mut Network,
    upstream: ElementId,
    upstream_port: usize,
    downstream: ElementId,
    downstream_port: usize,
) -> Result<(), SimulationError> {
    net.couple(
        upstream,
        OUTPORT_OUTFLOW_ACHIEVED + upstream_port,
        downstream,
        INPORT_INFLOW_ACHIEVED + downstream_port,
    )?;
    net.couple(
        downstream,
        OUTPORT_INFLOW_REQUEST + downstream_port,
        upstream,
        INPORT_OUTFLOW_REQUEST + upstream_port,
    )
}

/// Insert `wrapper` upstream of exposed inflow `k`; the wrapper becomes the
/// new exposed port.
fn wrap_inflow(
    net: &mut Network,
    surface: &mut BuiltComponent,
    k: usize,
    wrapper: ElementId,
) -> Result<(), SimulationError> {
    let (inner, inner_port) = surface.inflows[k];
    couple_pipe(net, wrapper, 0, inner, inner_port)?;
    surface.inflows[k] = (wrapper, 0);
    surface.elements.push(wrapper);
    Ok(())
}

/// Insert `wrapper` downstream of exposed outflow `k`; the wrapper becomes
/// the new exposed port.
fn wrap_outflow(
    net: &mut Network,
    surface: &mut BuiltComponent,
    k: usize,
    wrapper: ElementId,
) -> Result<(), SimulationError> {
    let (inner, inner_port) = surface.outflows[k];
    couple_pipe(net, inner, inner_port, wrapper, 0)?;
    surface.outflows[k] = (wrapper, 0);
    surface.elements.push(wrapper);
    Ok(())
}
