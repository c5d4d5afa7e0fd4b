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

//! Tests of the dispatch element.

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;

use crate::element::{Mux, MuxDispatchStrategy};
use crate::port::{PortValue, INPORT_INFLOW_ACHIEVED, INPORT_OUTFLOW_REQUEST};
use crate::types::{ConfigError, FLOW_TOLERANCE};

fn three_way_demand(mux: &mut Mux) {
    mux.external_transition(
        0,
        &[
            PortValue::new(INPORT_OUTFLOW_REQUEST, 10.0),
            PortValue::new(INPORT_OUTFLOW_REQUEST + 1, 10.0),
            PortValue::new(INPORT_OUTFLOW_REQUEST + 2, 10.0),
        ],
    )
    .unwrap();
    mux.internal_transition().unwrap();
}

#[test]
fn distribute_splits_scarce_supply_evenly() {
    let mut mux = Mux::new("bus", 1, 3, MuxDispatchStrategy::Distribute).unwrap();
    three_way_demand(&mut mux);
    assert_eq!(mux.inflow_ports()[0].requested(), 30.0);

    // the single inflow can only deliver 15
    mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, 15.0)]).unwrap();
    assert_abs_diff_eq!(mux.total_inflow_achieved(), 15.0);
    for port in mux.outflow_ports() {
        assert_abs_diff_eq!(port.achieved(), 5.0);
    }
    assert!((mux.total_inflow_achieved() - mux.total_outflow_achieved()).abs() < FLOW_TOLERANCE);
}

#[test]
fn distribute_caps_small_requests() {
    let mut mux = Mux::new("bus", 1, 3, MuxDispatchStrategy::Distribute).unwrap();
    mux.external_transition(
        0,
        &[
            PortValue::new(INPORT_OUTFLOW_REQUEST, 2.0),
            PortValue::new(INPORT_OUTFLOW_REQUEST + 1, 10.0),
            PortValue::new(INPORT_OUTFLOW_REQUEST + 2, 10.0),
        ],
    )
    .unwrap();
    mux.internal_transition().unwrap();
    mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, 12.0)]).unwrap();
    // port 0 is capped at 2; the remaining 10 are split evenly
    assert_abs_diff_eq!(mux.outflow_ports()[0].achieved(), 2.0);
    assert_abs_diff_eq!(mux.outflow_ports()[1].achieved(), 5.0);
    assert_abs_diff_eq!(mux.outflow_ports()[2].achieved(), 5.0);
}

#[test]
fn in_order_serves_lowest_index_first() {
    let mut mux = Mux::new("bus", 1, 3, MuxDispatchStrategy::InOrder).unwrap();
    three_way_demand(&mut mux);
    mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, 15.0)]).unwrap();
    assert_abs_diff_eq!(mux.outflow_ports()[0].achieved(), 10.0);
    assert_abs_diff_eq!(mux.outflow_ports()[1].achieved(), 5.0);
    assert_abs_diff_eq!(mux.outflow_ports()[2].achieved(), 0.0);
}

#[test]
fn undersupply_pulls_from_the_next_inflow_port() {
    let mut mux = Mux::new("bus", 2, 1, MuxDispatchStrategy::InOrder).unwrap();
    mux.external_transition(0, &[PortValue::new(INPORT_OUTFLOW_REQUEST, 10.0)]).unwrap();
    // the whole demand goes to inflow port 0 first
    assert_eq!(mux.inflow_ports()[0].requested(), 10.0);
    assert_eq!(mux.inflow_ports()[1].requested(), 0.0);
    mux.internal_transition().unwrap();

    // port 0 answers short: the difference moves to port 1
    mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, 4.0)]).unwrap();
    assert_eq!(mux.inflow_ports()[1].requested(), 6.0);
    mux.internal_transition().unwrap();

    // port 1 delivers: the outflow is whole again
    mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED + 1, 6.0)]).unwrap();
    assert_abs_diff_eq!(mux.outflow_ports()[0].achieved(), 10.0);
    assert_abs_diff_eq!(mux.total_inflow_achieved(), 10.0);
}

#[test]
fn exhausted_inflows_reduce_the_outflows() {
    let mut mux = Mux::new("bus", 2, 1, MuxDispatchStrategy::InOrder).unwrap();
    mux.external_transition(0, &[PortValue::new(INPORT_OUTFLOW_REQUEST, 10.0)]).unwrap();
    mux.internal_transition().unwrap();
    mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, 4.0)]).unwrap();
    mux.internal_transition().unwrap();
    // the last inflow port also answers short; no error, just less outflow
    mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED + 1, 2.0)]).unwrap();
    assert_abs_diff_eq!(mux.outflow_ports()[0].achieved(), 6.0);
}

#[test]
fn single_in_single_out_is_a_pipe() {
    for strategy in [MuxDispatchStrategy::InOrder, MuxDispatchStrategy::Distribute] {
        let mut mux = Mux::new("pipe", 1, 1, strategy).unwrap();
        mux.external_transition(0, &[PortValue::new(INPORT_OUTFLOW_REQUEST, 7.0)]).unwrap();
        assert_eq!(mux.inflow_ports()[0].requested(), 7.0);
        mux.internal_transition().unwrap();
        mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, 7.0)]).unwrap();
        assert_abs_diff_eq!(mux.outflow_ports()[0].achieved(), 7.0);
        // the confirmation changes nothing, so nothing is re-sent
        assert_eq!(mux.time_advance(), None);
    }
}

#[test]
fn distribute_converges_on_wide_fanout() {
    // 1 inflow and many outflows with unequal requests stays well within
    // the dispatch iteration guard
    let n = 200;
    let mut mux = Mux::new("wide", 1, n, MuxDispatchStrategy::Distribute).unwrap();
    let demands: Vec<PortValue> = (0..n)
        .map(|k| PortValue::new(INPORT_OUTFLOW_REQUEST + k, 1.0 + k as f64))
        .collect();
    mux.external_transition(0, &demands).unwrap();
    mux.internal_transition().unwrap();
    let total: f64 = (0..n).map(|k| 1.0 + k as f64).sum();
    mux.external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, total / 2.0)])
        .unwrap();
    let achieved = mux.total_outflow_achieved();
    assert!((achieved - total / 2.0).abs() < 1e-3);
}

#[test]
fn port_count_is_validated() {
    assert!(matches!(
        Mux::new("bad", 0, 1, MuxDispatchStrategy::InOrder),
        Err(ConfigError::InvalidPortCount { .. })
    ));
    assert!(matches!(
        Mux::new("bad", 1, 1001, MuxDispatchStrategy::InOrder),
        Err(ConfigError::InvalidPortCount { .. })
    ));
}
