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

//! Reliability schedules: pre-computed up/down timelines built by walking
//! failure and repair distributions, and the helpers to clip them to
//! scenario windows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::distribution::{DistId, DistributionSystem};
use crate::types::{RealTime, ReferenceError};

/// One entry of a reliability timeline: from `time` on the component is
/// permitted on (`true`) or forced off (`false`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeState {
    /// When this state starts to hold, in seconds.
    pub time: RealTime,
    /// `true` = up, `false` = down.
    pub state: bool,
}

impl TimeState {
    /// Create a new timeline entry.
    pub fn new(time: RealTime, state: bool) -> Self {
        Self { time, state }
    }
}

/// The state a schedule prescribes at time `t` (`initial` before the first
/// entry).
pub fn schedule_state_at_time(schedule: &[TimeState], t: RealTime, initial: bool) -> bool {
    let mut state = initial;
    for entry in schedule {
        if entry.time > t {
            break;
        }
        state = entry.state;
    }
    state
}

/// Re-base a schedule onto the window `[start, end]`: times shift by
/// `-start`, the state holding at the window start is carried in as a
/// leading entry, and entries past the end are dropped.
pub fn clip_schedule_to(
    schedule: &HashMap<String, Vec<TimeState>>,
    start: RealTime,
    end: RealTime,
) -> HashMap<String, Vec<TimeState>> {
    let mut clipped = HashMap::new();
    for (tag, timeline) in schedule {
        let mut entries = Vec::new();
        let mut state_before = true;
        for entry in timeline {
            if entry.time < start {
                state_before = entry.state;
            } else if entry.time == start {
                entries.push(TimeState::new(0, entry.state));
            } else if entry.time <= end {
                if entries.is_empty() {
                    entries.push(TimeState::new(0, state_before));
                }
                entries.push(TimeState::new(entry.time - start, entry.state));
            } else {
                break;
            }
        }
        if entries.is_empty() && !state_before {
            entries.push(TimeState::new(0, false));
        }
        clipped.insert(tag.clone(), entries);
    }
    clipped
}

/// A failure mode: how often a component fails and how long the repair
/// takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMode {
    /// The mode's tag.
    pub tag: String,
    /// Distribution of the time to failure.
    pub failure_dist: DistId,
    /// Distribution of the time to repair.
    pub repair_dist: DistId,
}

/// Builds per-component reliability schedules from failure modes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReliabilityCoordinator {
    failure_modes: Vec<FailureMode>,
    /// Links `(failure_mode index, component tag)`.
    links: Vec<(usize, String)>,
}

impl ReliabilityCoordinator {
    /// Create a new, empty coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a failure mode and return its index.
    pub fn add_failure_mode(
        &mut self,
        tag: impl Into<String>,
        failure_dist: DistId,
        repair_dist: DistId,
    ) -> usize {
        self.failure_modes.push(FailureMode { tag: tag.into(), failure_dist, repair_dist });
        self.failure_modes.len() - 1
    }

    /// Attach a failure mode to a component.
    pub fn link_component_with_failure_mode(
        &mut self,
        component: impl Into<String>,
        failure_mode: usize,
    ) {
        self.links.push((failure_mode, component.into()));
    }

    /// `true` if any failure mode is linked to the component.
    pub fn has_failure_modes(&self, component: &str) -> bool {
        self.links.iter().any(|(_, c)| c == component)
    }

    /// Walk every component's failure modes until `final_time`, drawing
    /// alternating failure and repair intervals, and return the up/down
    /// timeline per component tag. A component with several modes is up
    /// only while all of them are up.
    pub fn calc_reliability_schedule(
        &self,
        rand_fn: &mut dyn FnMut() -> f64,
        dists: &DistributionSystem,
        final_time: RealTime,
    ) -> Result<HashMap<String, Vec<TimeState>>, ReferenceError> {
        let mut schedules: HashMap<String, Vec<TimeState>> = HashMap::new();
        for (mode_idx, component) in &self.links {
            let mode = &self.failure_modes[*mode_idx];
            let mut timeline = Vec::new();
            let mut t: RealTime = 0;
            loop {
                let dt_fail = dists.next_time_advance(mode.failure_dist, rand_fn())?;
                t += dt_fail;
                if t > final_time {
                    break;
                }
                timeline.push(TimeState::new(t, false));
                let dt_repair = dists.next_time_advance(mode.repair_dist, rand_fn())?;
                t += dt_repair;
                if t > final_time {
                    break;
                }
                timeline.push(TimeState::new(t, true));
            }
            let merged = match schedules.remove(component) {
                Some(existing) => merge_schedules(&existing, &timeline),
                None => timeline,
            };
            schedules.insert(component.clone(), merged);
        }
        Ok(schedules)
    }
}

/// Merge two up/down timelines into one that is up only where both are up.
fn merge_schedules(a: &[TimeState], b: &[TimeState]) -> Vec<TimeState> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut ia, mut ib) = (0, 0);
    let (mut state_a, mut state_b) = (true, true);
    let mut last_state = true;
    while ia < a.len() || ib < b.len() {
        let ta = a.get(ia).map(|e| e.time);
        let tb = b.get(ib).map(|e| e.time);
        let t = match (ta, tb) {
            (Some(ta), Some(tb)) => ta.min(tb),
            (Some(ta), None) => ta,
            (None, Some(tb)) => tb,
            (None, None) => break,
        };
        while ia < a.len() && a[ia].time == t {
            state_a = a[ia].state;
            ia += 1;
        }
        while ib < b.len() && b[ib].time == t {
            state_b = b[ib].state;
            ib += 1;
        }
        let state = state_a && state_b;
        if state != last_state {
            merged.push(TimeState::new(t, state));
            last_state = state;
        }
    }
    merged
}
