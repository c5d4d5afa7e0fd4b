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

//! Test the port update primitives.

use pretty_assertions::assert_eq;

use crate::port::{port_to_tag, Port, OUTPORT_INFLOW_REQUEST, OUTPORT_OUTFLOW_ACHIEVED};
use crate::types::InvariantViolation;

#[test]
fn request_is_sent_only_once() {
    let update = Port::default().with_requested(5.0);
    assert!(update.send_request);
    let update = update.port.with_requested(5.0);
    assert!(!update.send_request);
    assert!(!update.send_achieved);
}

#[test]
fn fresh_unmet_request_is_answered() {
    // a new request that the known achieved value cannot satisfy must be
    // answered downstream, even though the achieved value did not change
    let update = Port::default().with_requested(5.0);
    assert!(update.send_achieved);
    assert_eq!(update.port.achieved(), 0.0);
}

#[test]
fn reducing_a_request_trims_achieved() {
    let update = Port::new(10.0, 8.0).with_requested(5.0);
    assert_eq!(update.port.requested(), 5.0);
    assert_eq!(update.port.achieved(), 5.0);
    assert!(update.send_request);
    assert!(update.send_achieved);
}

#[test]
fn achieved_above_requested_is_an_error() {
    let result = Port::new(5.0, 0.0).with_achieved(6.0);
    assert_eq!(
        result,
        Err(InvariantViolation::AchievedExceedsRequested { requested: 5.0, achieved: 6.0 })
    );
}

#[test]
fn achieved_is_reported_when_changed() {
    let update = Port::new(5.0, 0.0).with_achieved(3.0).unwrap();
    assert!(update.send_achieved);
    assert!(!update.send_request);
    let update = update.port.with_achieved(3.0).unwrap();
    assert!(!update.send_achieved);
}

#[test]
fn requested_and_available_notifies_only_on_visible_change() {
    // downstream lowered its request; its own clamp already tells it the
    // new achieved value, so no message is needed
    let update = Port::new(5.0, 5.0).with_requested_and_available(3.0, 10.0);
    assert_eq!(update.port.achieved(), 3.0);
    assert!(!update.send_achieved);

    // a fresh request that the availability cannot cover must be answered
    let update = Port::default().with_requested_and_available(5.0, 2.0);
    assert_eq!(update.port.achieved(), 2.0);
    assert!(update.send_achieved);

    // raising the request with enough availability must be answered too
    let update = Port::new(5.0, 5.0).with_requested_and_available(8.0, 10.0);
    assert_eq!(update.port.achieved(), 8.0);
    assert!(update.send_achieved);
}

#[test]
fn port_id_tags() {
    assert_eq!(port_to_tag(OUTPORT_INFLOW_REQUEST), "outport_inflow_request");
    assert_eq!(port_to_tag(OUTPORT_OUTFLOW_ACHIEVED + 2), "outport_outflow_achieved(2)");
}
