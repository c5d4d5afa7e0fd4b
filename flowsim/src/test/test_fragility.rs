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

//! Tests of fragility curves, failure sampling, and the schedule overlay of
//! a build-time failure.

use approx::assert_abs_diff_eq;
use maplit::hashmap;
use pretty_assertions::assert_eq;

use crate::fragility::{
    failure_probabilities, modify_schedule_for_fragility, sample_failure, FragilityCurve,
    FragilityMode,
};
use crate::reliability::TimeState;
use crate::types::ConfigError;

#[test]
fn linear_curve_interpolates_between_its_bounds() {
    let curve = FragilityCurve::linear(80.0, 160.0).unwrap();
    assert_abs_diff_eq!(curve.apply(50.0), 0.0);
    assert_abs_diff_eq!(curve.apply(80.0), 0.0);
    assert_abs_diff_eq!(curve.apply(120.0), 0.5);
    assert_abs_diff_eq!(curve.apply(160.0), 1.0);
    assert_abs_diff_eq!(curve.apply(200.0), 1.0);
    assert!(matches!(
        FragilityCurve::linear(160.0, 80.0),
        Err(ConfigError::InvalidFragilityCurve { .. })
    ));
}

#[test]
fn probabilities_are_sorted_descending() {
    let curves = hashmap! {
        "wind".to_string() => FragilityCurve::linear(0.0, 100.0).unwrap(),
        "flood".to_string() => FragilityCurve::linear(0.0, 10.0).unwrap(),
    };
    let modes = vec![
        FragilityMode {
            curve_tag: "wind".to_string(),
            vulnerable_to: "wind_speed_mph".to_string(),
            repair_dist: None,
        },
        FragilityMode {
            curve_tag: "flood".to_string(),
            vulnerable_to: "inundation_depth_ft".to_string(),
            repair_dist: Some(3),
        },
    ];
    let intensities = hashmap! {
        "wind_speed_mph".to_string() => 30.0,
        "inundation_depth_ft".to_string() => 8.0,
    };
    let probs = failure_probabilities(&modes, &curves, &intensities).unwrap();
    assert_eq!(probs.len(), 2);
    // the certain-er failure comes first so it can short-circuit sampling
    assert_abs_diff_eq!(probs[0].0, 0.8);
    assert_eq!(probs[0].1, Some(3));
    assert_abs_diff_eq!(probs[1].0, 0.3);
    assert_eq!(probs[1].1, None);
}

#[test]
fn sampling_short_circuits_on_certain_failures() {
    let draws = std::cell::Cell::new(0);
    let mut count_draws = || {
        draws.set(draws.get() + 1);
        0.5
    };
    assert_eq!(sample_failure(&[(1.0, Some(7))], &mut count_draws), Some(Some(7)));
    assert_eq!(sample_failure(&[(0.0, None)], &mut count_draws), None);
    assert_eq!(draws.get(), 0);
    // 0.5 <= 0.6: failed; 0.5 > 0.4: survived
    assert_eq!(sample_failure(&[(0.6, None)], &mut count_draws), Some(None));
    assert_eq!(sample_failure(&[(0.4, None)], &mut count_draws), None);
    assert_eq!(draws.get(), 2);
}

#[test]
fn unrepairable_failure_is_down_for_good() {
    let schedule = vec![TimeState::new(50, false), TimeState::new(80, true)];
    assert_eq!(
        modify_schedule_for_fragility(&schedule, None, 300),
        vec![TimeState::new(0, false)]
    );
}

#[test]
fn zero_repair_time_means_no_repair() {
    // a sampled repair time of 0 indicates no repair, NOT an instant one
    let schedule = vec![TimeState::new(50, false), TimeState::new(80, true)];
    assert_eq!(
        modify_schedule_for_fragility(&schedule, Some(0), 300),
        vec![TimeState::new(0, false)]
    );
    assert_eq!(
        modify_schedule_for_fragility(&[], Some(0), 300),
        vec![TimeState::new(0, false)]
    );
}

#[test]
fn repair_past_the_scenario_end_never_happens() {
    assert_eq!(
        modify_schedule_for_fragility(&[], Some(300), 300),
        vec![TimeState::new(0, false)]
    );
}

#[test]
fn repair_merges_back_into_the_underlying_schedule() {
    let schedule = vec![TimeState::new(200, false), TimeState::new(250, true)];
    assert_eq!(
        modify_schedule_for_fragility(&schedule, Some(150), 300),
        vec![
            TimeState::new(0, false),
            TimeState::new(150, true),
            TimeState::new(200, false),
            TimeState::new(250, true),
        ]
    );
    // repairing while the underlying schedule is down stays down until its
    // own repair
    assert_eq!(
        modify_schedule_for_fragility(&schedule, Some(220), 300),
        vec![
            TimeState::new(0, false),
            TimeState::new(220, false),
            TimeState::new(250, true),
        ]
    );
}
