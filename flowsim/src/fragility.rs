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

//! Fragility: the chance that a scenario's intensities (wind speed,
//! inundation depth, ...) knock a component out at scenario start.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::distribution::DistId;
use crate::reliability::TimeState;
use crate::types::{ConfigError, RealTime, ReferenceError};

/// A fragility curve: maps an intensity to a probability of failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragilityCurve {
    /// 0% below `lower_bound`, 100% at or above `upper_bound`, linear in
    /// between.
    Linear {
        /// Intensity below which the component never fails.
        lower_bound: f64,
        /// Intensity at or above which the component always fails.
        upper_bound: f64,
    },
}

impl FragilityCurve {
    /// Create a linear curve, validating `lower_bound < upper_bound`.
    pub fn linear(lower_bound: f64, upper_bound: f64) -> Result<Self, ConfigError> {
        if lower_bound >= upper_bound {
            return Err(ConfigError::InvalidFragilityCurve {
                lower: lower_bound,
                upper: upper_bound,
            });
        }
        Ok(Self::Linear { lower_bound, upper_bound })
    }

    /// Evaluate the curve at intensity `x`.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Linear { lower_bound, upper_bound } => {
                if x <= *lower_bound {
                    0.0
                } else if x >= *upper_bound {
                    1.0
                } else {
                    (x - lower_bound) / (upper_bound - lower_bound)
                }
            }
        }
    }
}

/// A component's vulnerability: the curve that applies, the intensity it
/// reacts to, and an optional repair distribution.
///
/// `repair_dist = None` means the failure cannot be repaired within the
/// scenario. A configured distribution that samples a repair time of 0
/// means the same thing: "no repair", not "instant repair".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragilityMode {
    /// Tag of the fragility curve to evaluate.
    pub curve_tag: String,
    /// The scenario intensity this mode is vulnerable to (e.g.
    /// `"wind_speed_mph"`).
    pub vulnerable_to: String,
    /// Distribution of the repair time, if the failure is repairable.
    pub repair_dist: Option<DistId>,
}

/// Evaluate each fragility mode of a component under the scenario
/// intensities. Returns the failure probabilities paired with the repair
/// distribution of the mode they came from, sorted by descending
/// probability so certain failures short-circuit the sampling.
pub fn failure_probabilities(
    modes: &[FragilityMode],
    curves: &HashMap<String, FragilityCurve>,
    intensities: &HashMap<String, f64>,
) -> Result<Vec<(f64, Option<DistId>)>, ReferenceError> {
    let mut probs = Vec::new();
    for mode in modes {
        let curve = curves
            .get(&mode.curve_tag)
            .ok_or_else(|| ReferenceError::FragilityCurve(mode.curve_tag.clone()))?;
        if let Some(intensity) = intensities.get(&mode.vulnerable_to) {
            probs.push((curve.apply(*intensity), mode.repair_dist));
        }
    }
    probs.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(probs)
}

/// Sample whether a component fails, given its failure probabilities in
/// descending order. A probability >= 1 forces the failure without a draw;
/// probabilities <= 0 are skipped; anything in between draws a uniform
/// variate and fails when it falls at or below the probability.
///
/// Returns the repair distribution of the mode that failed, wrapped once
/// more: `None` = no failure, `Some(None)` = unrepairable failure.
pub fn sample_failure(
    probs: &[(f64, Option<DistId>)],
    rand_fn: &mut dyn FnMut() -> f64,
) -> Option<Option<DistId>> {
    for (p, repair) in probs {
        if *p >= 1.0 {
            return Some(*repair);
        } else if *p <= 0.0 {
            continue;
        } else if rand_fn() <= *p {
            return Some(*repair);
        }
    }
    None
}

/// Fold a build-time failure into a reliability schedule: the component is
/// down from time zero, and comes back at `repair_time_s` if the failure is
/// repairable within the scenario.
///
/// A repair time of 0 indicates no repair (NOT an instant repair), so it
/// leaves the component down for the whole scenario, exactly like a
/// missing repair distribution or a repair past the scenario end.
pub fn modify_schedule_for_fragility(
    schedule: &[TimeState],
    repair_time_s: Option<RealTime>,
    max_time_s: RealTime,
) -> Vec<TimeState> {
    match repair_time_s {
        None => vec![TimeState { time: 0, state: false }],
        Some(repair) if repair <= 0 => vec![TimeState { time: 0, state: false }],
        Some(repair) if repair >= max_time_s => vec![TimeState { time: 0, state: false }],
        Some(repair) => {
            let mut merged = vec![TimeState { time: 0, state: false }];
            merged.extend(
                schedule
                    .iter()
                    .filter(|entry| entry.time > repair)
                    .copied(),
            );
            // at the repair instant the underlying schedule state resumes
            let resumed = crate::reliability::schedule_state_at_time(schedule, repair, true);
            merged.insert(1, TimeState { time: repair, state: resumed });
            merged
        }
    }
}
