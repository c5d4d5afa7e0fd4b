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

//! Tests of the statistics helpers.

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;

use crate::stats::{calc_scenario_stats, energy_availability, ScenarioStats};
use crate::types::Datum;

fn datum(time: i64, requested: f64, achieved: f64) -> Datum {
    Datum { time, requested, achieved }
}

#[test]
fn fully_served_series() {
    let stats = calc_scenario_stats(&[datum(0, 5.0, 5.0), datum(100, 5.0, 5.0)]);
    assert_eq!(stats.uptime, 100);
    assert_eq!(stats.downtime, 0);
    assert_eq!(stats.max_downtime, 0);
    assert_abs_diff_eq!(stats.load_not_served, 0.0);
    assert_abs_diff_eq!(stats.total_energy, 500.0);
    assert_abs_diff_eq!(energy_availability(&stats), 1.0);
}

#[test]
fn interruption_counts_as_downtime() {
    let stats = calc_scenario_stats(&[
        datum(0, 5.0, 5.0),
        datum(100, 5.0, 0.0),
        datum(200, 5.0, 5.0),
        datum(300, 5.0, 5.0),
    ]);
    assert_eq!(stats.uptime, 200);
    assert_eq!(stats.downtime, 100);
    assert_eq!(stats.max_downtime, 100);
    assert_abs_diff_eq!(stats.load_not_served, 500.0);
    assert_abs_diff_eq!(stats.total_energy, 1000.0);
    assert_abs_diff_eq!(energy_availability(&stats), 2.0 / 3.0);
}

#[test]
fn trailing_downtime_counts_toward_the_maximum() {
    let stats = calc_scenario_stats(&[
        datum(0, 5.0, 0.0),
        datum(10, 5.0, 5.0),
        datum(20, 5.0, 0.0),
        datum(50, 5.0, 0.0),
    ]);
    assert_eq!(stats.downtime, 40);
    assert_eq!(stats.max_downtime, 30);
}

#[test]
fn empty_series_has_no_statistics() {
    let stats = calc_scenario_stats(&[]);
    assert_eq!(stats, ScenarioStats::default());
    assert_abs_diff_eq!(energy_availability(&stats), 0.0);
}

#[test]
fn stats_accumulate() {
    let a = ScenarioStats {
        uptime: 100,
        downtime: 10,
        max_downtime: 10,
        load_not_served: 50.0,
        total_energy: 500.0,
    };
    let b = ScenarioStats {
        uptime: 200,
        downtime: 30,
        max_downtime: 25,
        load_not_served: 150.0,
        total_energy: 1000.0,
    };
    let sum = a + b;
    assert_eq!(sum.uptime, 300);
    assert_eq!(sum.downtime, 40);
    assert_eq!(sum.max_downtime, 25);
    assert_abs_diff_eq!(sum.load_not_served, 200.0);
    assert_abs_diff_eq!(sum.total_energy, 1500.0);
}
