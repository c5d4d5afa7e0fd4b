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

//! End-to-end tests of coupled networks driven by the simulator loop.

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;

use crate::element::{Element, Load, Mux, MuxDispatchStrategy, Storage, Supply};
use crate::network::Network;
use crate::port::{
    INPORT_INFLOW_ACHIEVED, INPORT_OUTFLOW_REQUEST, OUTPORT_INFLOW_REQUEST,
    OUTPORT_OUTFLOW_ACHIEVED,
};
use crate::types::{ElementId, LoadItem, SuperDenseTime};

/// Couple `upstream`'s outflow `p_up` to `downstream`'s inflow `p_down`.
fn pipe(net: &mut Network, upstream: ElementId, p_up: usize, downstream: ElementId, p_down: usize) {
    net.couple(
        upstream,
        OUTPORT_OUTFLOW_ACHIEVED + p_up,
        downstream,
        INPORT_INFLOW_ACHIEVED + p_down,
    )
    .unwrap();
    net.couple(
        downstream,
        OUTPORT_INFLOW_REQUEST + p_down,
        upstream,
        INPORT_OUTFLOW_REQUEST + p_up,
    )
    .unwrap();
}

#[test]
fn supply_feeds_load() {
    let mut net = Network::default();
    let load = net.add_element(Load::new("load", vec![LoadItem::new(0, 5.0)]).unwrap());
    let supply = net.add_element(Supply::new("grid", None));
    pipe(&mut net, supply, 0, load, 0);

    net.simulate(100).unwrap();
    let Some(Element::Load(load)) = net.get_element(load) else { panic!() };
    assert_eq!(load.inflow().requested(), 5.0);
    assert_eq!(load.inflow().achieved(), 5.0);
    assert_eq!(net.now().real, 0);
}

#[test]
fn capped_supply_leaves_the_load_short() {
    let mut net = Network::default();
    let load = net.add_element(Load::new("load", vec![LoadItem::new(0, 5.0)]).unwrap());
    let supply = net.add_element(Supply::new("grid", Some(2.0)));
    pipe(&mut net, supply, 0, load, 0);

    net.simulate(100).unwrap();
    let Some(Element::Load(load)) = net.get_element(load) else { panic!() };
    assert_eq!(load.inflow().achieved(), 2.0);
}

/// The undisturbed-discharge scenario run through the full coupled loop: a
/// full 100 kJ store serving a 5 kW load with the inflow pinned to zero.
#[test]
fn storage_discharge_through_the_loop() {
    let mut net = Network::default();
    let load = net.add_element(
        Load::new("load", vec![LoadItem::new(0, 5.0), LoadItem::new(40, 5.0)]).unwrap(),
    );
    let store = net.add_element(Storage::new("store", 100.0, 10.0, 1.0).unwrap());
    let pin = net.add_element(Supply::new("pin", Some(0.0)));
    pipe(&mut net, store, 0, load, 0);
    pipe(&mut net, pin, 0, store, 0);

    net.simulate(40).unwrap();

    let Some(Element::Storage(store)) = net.get_element(store) else { panic!() };
    assert_abs_diff_eq!(store.soc(), 0.0);
    assert_eq!(store.outflow().achieved(), 0.0);
    let (energy_in, energy_out) = store.energy_in_out();
    assert_abs_diff_eq!(energy_in, 0.0);
    assert_abs_diff_eq!(energy_out, 100.0);
    assert!(store.energy_balance_error().abs() < 1e-6);

    let Some(Element::Load(load)) = net.get_element(load) else { panic!() };
    assert_eq!(load.inflow().achieved(), 0.0);
}

/// Three 10 kW demands behind a distributing mux with 15 kW of supply end
/// up with 5 kW each.
#[test]
fn mux_distributes_scarce_supply() {
    let mut net = Network::default();
    let mux =
        net.add_element(Mux::new("bus", 1, 3, MuxDispatchStrategy::Distribute).unwrap());
    let supply = net.add_element(Supply::new("grid", Some(15.0)));
    pipe(&mut net, supply, 0, mux, 0);
    let loads: Vec<ElementId> = (0..3)
        .map(|k| {
            let load = net
                .add_element(Load::new(format!("load-{k}"), vec![LoadItem::new(0, 10.0)]).unwrap());
            pipe(&mut net, mux, k, load, 0);
            load
        })
        .collect();

    net.simulate(10).unwrap();

    let Some(Element::Mux(mux)) = net.get_element(mux) else { panic!() };
    assert_abs_diff_eq!(mux.total_inflow_achieved(), 15.0);
    for port in mux.outflow_ports() {
        assert_abs_diff_eq!(port.achieved(), 5.0);
    }
    for load in loads {
        let Some(Element::Load(load)) = net.get_element(load) else { panic!() };
        assert_abs_diff_eq!(load.inflow().achieved(), 5.0);
    }
}

/// At rest, both ends of every coupling agree.
#[test]
fn coupled_ports_agree_at_rest() {
    let mut net = Network::default();
    let load = net.add_element(Load::new("load", vec![LoadItem::new(0, 7.0)]).unwrap());
    let store = net.add_element(Storage::new("store", 50.0, 4.0, 0.5).unwrap());
    let supply = net.add_element(Supply::new("grid", Some(3.0)));
    pipe(&mut net, store, 0, load, 0);
    pipe(&mut net, supply, 0, store, 0);

    net.simulate(5).unwrap();

    let Some(Element::Storage(store)) = net.get_element(store) else { panic!() };
    let Some(Element::Load(load)) = net.get_element(load) else { panic!() };
    let Some(Element::Supply(supply)) = net.get_element(supply) else { panic!() };
    assert_eq!(store.outflow().requested(), load.inflow().requested());
    assert_eq!(store.outflow().achieved(), load.inflow().achieved());
    assert_eq!(supply.outflow().requested(), store.inflow().requested());
    assert_eq!(supply.outflow().achieved(), store.inflow().achieved());
    // the load is served in full while the store drains
    assert_eq!(load.inflow().achieved(), 7.0);
}

#[test]
fn quiescent_network_stops_immediately() {
    let mut net = Network::default();
    let supply = net.add_element(Supply::new("grid", None));
    net.simulate(1000).unwrap();
    assert_eq!(net.now(), SuperDenseTime::ZERO);
    let Some(Element::Supply(supply)) = net.get_element(supply) else { panic!() };
    assert_eq!(supply.outflow().requested(), 0.0);
}
