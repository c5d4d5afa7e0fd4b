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

//! Per-series and aggregated statistics over recorded flow histories.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::flow_writer::{FlowWriter, SeriesInfo};
use crate::types::{Datum, FlowValue, PortRole, RealTime, Stream, FLOW_TOLERANCE};

/// Statistics of one recorded port series over a scenario.
///
/// An interval counts as "down" when the achieved flow falls short of the
/// request by more than the tolerance. Load-not-served integrates that gap
/// over time (kilojoules); total energy integrates the achieved flow.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioStats {
    /// Seconds during which the request was met.
    pub uptime: RealTime,
    /// Seconds during which the request was not met.
    pub downtime: RealTime,
    /// Longest contiguous stretch of downtime, in seconds.
    pub max_downtime: RealTime,
    /// Integral of `requested - achieved` over time, in kilojoules.
    pub load_not_served: FlowValue,
    /// Integral of the achieved flow, in kilojoules.
    pub total_energy: FlowValue,
}

impl AddAssign for ScenarioStats {
    fn add_assign(&mut self, other: Self) {
        self.uptime += other.uptime;
        self.downtime += other.downtime;
        self.max_downtime = self.max_downtime.max(other.max_downtime);
        self.load_not_served += other.load_not_served;
        self.total_energy += other.total_energy;
    }
}

impl Add for ScenarioStats {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

/// The fraction of observed time during which the request was met
/// (0 when nothing was observed).
pub fn energy_availability(stats: &ScenarioStats) -> f64 {
    let total = stats.uptime + stats.downtime;
    if total == 0 {
        return 0.0;
    }
    stats.uptime as f64 / total as f64
}

/// Compute the statistics of one recorded series. The series carries the
/// value holding *from* each sample time on, so each interval is weighted
/// by the distance to the next sample.
pub fn calc_scenario_stats(data: &[Datum]) -> ScenarioStats {
    let mut stats = ScenarioStats::default();
    let mut contiguous_downtime: RealTime = 0;
    let mut was_down = false;
    let mut t0: RealTime = 0;
    let mut requested: FlowValue = 0.0;
    let mut achieved: FlowValue = 0.0;
    for d in data {
        if d.time == 0 {
            requested = d.requested;
            achieved = d.achieved;
            continue;
        }
        let dt = d.time - t0;
        t0 = d.time;
        let gap = (requested - achieved).abs();
        if gap > FLOW_TOLERANCE {
            stats.downtime += dt;
            contiguous_downtime = if was_down { contiguous_downtime + dt } else { dt };
            was_down = true;
        } else {
            stats.uptime += dt;
            stats.max_downtime = stats.max_downtime.max(contiguous_downtime);
            contiguous_downtime = 0;
            was_down = false;
        }
        stats.load_not_served += dt as FlowValue * gap;
        stats.total_energy += achieved * dt as FlowValue;
        requested = d.requested;
        achieved = d.achieved;
    }
    if was_down {
        stats.max_downtime = stats.max_downtime.max(contiguous_downtime);
    }
    stats
}

/// Statistics per recorded series tag, plus totals grouped by stream and by
/// port role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Statistics per series tag.
    pub by_series: BTreeMap<String, ScenarioStats>,
    /// Total achieved energy per stream, in kilojoules.
    pub energy_by_stream: BTreeMap<Stream, FlowValue>,
    /// Total achieved energy per port role, in kilojoules.
    pub energy_by_role: BTreeMap<PortRole, FlowValue>,
}

impl StatsSummary {
    /// Summarize every recorded series of a finalized writer.
    pub fn from_writer(writer: &FlowWriter) -> Self {
        let mut summary = Self::default();
        for (_, info, history) in writer.iter_recorded() {
            let stats = calc_scenario_stats(history);
            summary.accumulate(info, stats);
        }
        summary
    }

    fn accumulate(&mut self, info: &SeriesInfo, stats: ScenarioStats) {
        *self.by_series.entry(info.tag.clone()).or_default() += stats;
        *self.energy_by_stream.entry(info.stream.clone()).or_default() += stats.total_energy;
        *self.energy_by_role.entry(info.port_role).or_default() += stats.total_energy;
    }

    /// Fold another summary into this one (used to aggregate scenario
    /// occurrences).
    pub fn merge(&mut self, other: &Self) {
        for (tag, stats) in &other.by_series {
            *self.by_series.entry(tag.clone()).or_default() += *stats;
        }
        for (stream, energy) in &other.energy_by_stream {
            *self.energy_by_stream.entry(stream.clone()).or_default() += energy;
        }
        for (role, energy) in &other.energy_by_role {
            *self.energy_by_role.entry(*role).or_default() += energy;
        }
    }
}
