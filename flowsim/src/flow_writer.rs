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

//! Collects per-port flow time-series during a scenario run.
//!
//! Every instrumented port registers once and gets a dense integer id; the
//! string tag is kept in a side table. Records are appended only when a
//! value changes, the sequence of times per id is strictly increasing, and
//! finalization emits one terminal record at the scenario duration.

use serde::{Deserialize, Serialize};

use crate::types::{flow_eq, ComponentType, ConfigError, Datum, FlowValue, PortRole, RealTime, Stream};

/// Dense id of a registered port series.
pub type WriterId = usize;

/// Identity of a recorded series: which component port it observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// The unique series tag, e.g. `"battery-outflow"`.
    pub tag: String,
    /// The stream flowing through the port.
    pub stream: Stream,
    /// The component type the port belongs to.
    pub component_type: ComponentType,
    /// The role of the port within its component.
    pub port_role: PortRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeriesRecord {
    info: SeriesInfo,
    record_history: bool,
    history: Vec<Datum>,
}

/// The flow writer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowWriter {
    series: Vec<SeriesRecord>,
    finalized: bool,
}

impl FlowWriter {
    /// Create a new, empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port series and return its dense id. Series with
    /// `record_history = false` get an id but drop every write.
    pub fn register(
        &mut self,
        info: SeriesInfo,
        record_history: bool,
    ) -> Result<WriterId, ConfigError> {
        if self.series.iter().any(|s| s.info.tag == info.tag) {
            return Err(ConfigError::DuplicateTag(info.tag));
        }
        let id = self.series.len();
        self.series.push(SeriesRecord {
            info,
            record_history,
            // every series starts at rest
            history: vec![Datum::default()],
        });
        Ok(id)
    }

    /// Record the port values holding from `time` on. Writes at the time of
    /// the latest record overwrite it; otherwise a record is appended only
    /// if a value changed.
    pub fn write(&mut self, id: WriterId, time: RealTime, requested: FlowValue, achieved: FlowValue) {
        debug_assert!(!self.finalized);
        let series = &mut self.series[id];
        if !series.record_history {
            return;
        }
        let last = series
            .history
            .last_mut()
            .expect("series history is seeded at registration");
        if last.time == time {
            last.requested = requested;
            last.achieved = achieved;
        } else if !flow_eq(last.requested, requested) || !flow_eq(last.achieved, achieved) {
            debug_assert!(time > last.time);
            series.history.push(Datum { time, requested, achieved });
        }
    }

    /// Close the run: append one terminal record at `duration` mirroring
    /// the last values of each recorded series.
    pub fn finalize_at(&mut self, duration: RealTime) {
        for series in &mut self.series {
            if !series.record_history {
                continue;
            }
            if let Some(last) = series.history.last().copied() {
                if last.time < duration {
                    series.history.push(Datum { time: duration, ..last });
                }
            }
        }
        self.finalized = true;
    }

    /// Number of registered series.
    pub fn num_series(&self) -> usize {
        self.series.len()
    }

    /// The identity of a series.
    pub fn info(&self, id: WriterId) -> &SeriesInfo {
        &self.series[id].info
    }

    /// Look up a series id by tag.
    pub fn id_of(&self, tag: &str) -> Option<WriterId> {
        self.series.iter().position(|s| s.info.tag == tag)
    }

    /// The recorded history of a series (empty side-table entry for
    /// non-recording series).
    pub fn history(&self, id: WriterId) -> &[Datum] {
        if self.series[id].record_history {
            &self.series[id].history
        } else {
            &[]
        }
    }

    /// Iterate over all recording series as `(id, info, history)`.
    pub fn iter_recorded(&self) -> impl Iterator<Item = (WriterId, &SeriesInfo, &[Datum])> {
        self.series
            .iter()
            .enumerate()
            .filter(|(_, s)| s.record_history)
            .map(|(id, s)| (id, &s.info, s.history.as_slice()))
    }

    /// Drop all recorded data but keep the registrations.
    pub fn clear(&mut self) {
        for series in &mut self.series {
            series.history = vec![Datum::default()];
        }
        self.finalized = false;
    }
}
