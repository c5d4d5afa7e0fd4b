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

//! Tests of the storage element, including the undisturbed-discharge event
//! log.

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;

use crate::element::Storage;
use crate::port::{PortValue, INPORT_INFLOW_ACHIEVED, INPORT_OUTFLOW_REQUEST};
use crate::types::ConfigError;

#[test]
fn parameters_are_validated() {
    assert!(matches!(
        Storage::new("s", 0.0, 10.0, 1.0),
        Err(ConfigError::NonPositiveCapacity(_))
    ));
    assert!(matches!(
        Storage::new("s", 100.0, 0.0, 1.0),
        Err(ConfigError::NonPositiveChargeRate(_))
    ));
    assert!(matches!(Storage::new("s", 100.0, 10.0, 1.5), Err(ConfigError::SocOutOfRange(_))));
}

#[test]
fn a_store_with_headroom_asks_to_charge() {
    let store = Storage::new("s", 100.0, 10.0, 0.5).unwrap();
    assert_eq!(store.time_advance(), Some(0));
    assert_eq!(store.inflow().requested(), 10.0);
}

#[test]
fn a_full_store_requests_only_the_demand() {
    let mut store = Storage::new("s", 100.0, 10.0, 1.0).unwrap();
    assert_eq!(store.time_advance(), None);
    store
        .external_transition(0, &[PortValue::new(INPORT_OUTFLOW_REQUEST, 5.0)])
        .unwrap();
    assert_eq!(store.inflow().requested(), 5.0);
    assert_eq!(store.outflow().achieved(), 5.0);
}

/// The undisturbed-discharge log: a full 100 kJ store drained by a constant
/// 5 kW demand with the inflow pinned to zero empties after 20 seconds.
#[test]
fn undisturbed_discharge() {
    let mut store = Storage::new("s", 100.0, 10.0, 1.0).unwrap();

    // t = 0: the demand arrives
    store
        .external_transition(0, &[PortValue::new(INPORT_OUTFLOW_REQUEST, 5.0)])
        .unwrap();
    assert_eq!(store.inflow().requested(), 5.0);
    assert_eq!(store.inflow().achieved(), 0.0);
    assert_eq!(store.outflow().achieved(), 5.0);
    assert_eq!(store.time_advance(), Some(0));
    store.internal_transition().unwrap();

    // t = 0: the upstream answers with nothing
    store
        .external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, 0.0)])
        .unwrap();
    assert_abs_diff_eq!(store.soc(), 1.0);
    // draining at 5 kW out of 100 kJ: empty after 20 s
    assert_eq!(store.time_advance(), Some(20));

    // t = 20: the store runs dry, the outflow collapses and the store asks
    // for its full charge rate
    store.internal_transition().unwrap();
    assert_abs_diff_eq!(store.soc(), 0.0);
    assert_eq!(store.outflow().achieved(), 0.0);
    assert_eq!(store.inflow().requested(), 10.0);
    assert_eq!(store.time_advance(), Some(0));
    store.internal_transition().unwrap();
    assert_eq!(store.time_advance(), None);

    // 5 kW for 20 s were served from the store
    let (energy_in, energy_out) = store.energy_in_out();
    assert_abs_diff_eq!(energy_in, 0.0);
    assert_abs_diff_eq!(energy_out, 100.0);
    assert!(store.energy_balance_error().abs() < 1e-6);
}

#[test]
fn charging_fills_the_store() {
    let mut store = Storage::new("s", 100.0, 10.0, 0.0).unwrap();
    assert_eq!(store.inflow().requested(), 10.0);
    store.internal_transition().unwrap();

    // upstream can deliver the full charge rate
    store
        .external_transition(0, &[PortValue::new(INPORT_INFLOW_ACHIEVED, 10.0)])
        .unwrap();
    // filling 100 kJ at 10 kW takes 10 s
    assert_eq!(store.time_advance(), Some(10));
    store.internal_transition().unwrap();
    assert_abs_diff_eq!(store.soc(), 1.0);
    // once full, the inflow request drops to the (zero) demand
    assert_eq!(store.inflow().requested(), 0.0);
    assert!(store.energy_balance_error().abs() < 1e-6);
}

#[test]
fn charge_and_demand_balance() {
    let mut store = Storage::new("s", 100.0, 10.0, 0.5).unwrap();
    store.internal_transition().unwrap();
    // 4 kW demand, 10 kW charge offer
    store
        .external_transition(
            0,
            &[
                PortValue::new(INPORT_OUTFLOW_REQUEST, 4.0),
                PortValue::new(INPORT_INFLOW_ACHIEVED, 10.0),
            ],
        )
        .unwrap();
    assert_eq!(store.outflow().achieved(), 4.0);
    assert_eq!(store.time_advance(), Some(0));
    store.internal_transition().unwrap();
    // net +6 kW on 50 kJ of headroom: full after ceil(50/6) = 9 s
    assert_eq!(store.time_advance(), Some(9));
    store.internal_transition().unwrap();
    assert_abs_diff_eq!(store.soc(), 1.0);
    assert_eq!(store.inflow().requested(), 4.0);
    assert!(store.energy_balance_error().abs() < 1e-6);
}
