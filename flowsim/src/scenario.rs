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

//! Scenarios and the top-level [`Simulation`]: scenario occurrence
//! scheduling, per-occurrence network builds, and result collection.

use std::collections::{BTreeMap, HashMap};

use log::*;
use serde::{Deserialize, Serialize};

use crate::builder::NetworkBuilder;
use crate::component::{Component, Connection};
use crate::distribution::{DistId, DistributionSystem};
use crate::flow_writer::FlowWriter;
use crate::fragility::{self, FragilityCurve};
use crate::reliability::{clip_schedule_to, ReliabilityCoordinator, TimeState};
use crate::stats::StatsSummary;
use crate::types::{ConfigError, RealTime, ReferenceError, SimulationError};

/// One scenario: a disturbance of a given duration, applied to a network,
/// with intensities feeding the fragility curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// The scenario's unique name.
    pub name: String,
    /// The network the scenario runs on.
    pub network_id: String,
    /// Duration of one occurrence, in seconds.
    pub duration: RealTime,
    /// Bound on the number of occurrences (`None` = unbounded).
    pub max_occurrences: Option<usize>,
    /// Distribution of the time between occurrences.
    pub occurrence_dist: DistId,
    /// Intensities (e.g. `wind_speed_mph`) evaluated against fragility
    /// curves.
    pub intensities: HashMap<String, f64>,
    /// Whether reliability schedules apply during this scenario.
    pub calc_reliability: bool,
}

impl Scenario {
    /// Create a new scenario, validating the duration.
    pub fn new(
        name: impl Into<String>,
        network_id: impl Into<String>,
        duration: RealTime,
        occurrence_dist: DistId,
    ) -> Result<Self, ConfigError> {
        if duration <= 0 {
            return Err(ConfigError::NegativeDuration(duration));
        }
        Ok(Self {
            name: name.into(),
            network_id: network_id.into(),
            duration,
            max_occurrences: None,
            occurrence_dist,
            intensities: HashMap::new(),
            calc_reliability: false,
        })
    }

    /// Bound the number of occurrences.
    pub fn with_max_occurrences(mut self, max: usize) -> Self {
        self.max_occurrences = Some(max);
        self
    }

    /// Set the scenario intensities.
    pub fn with_intensities(mut self, intensities: HashMap<String, f64>) -> Self {
        self.intensities = intensities;
        self
    }

    /// Enable reliability schedules for this scenario.
    pub fn with_reliability(mut self) -> Self {
        self.calc_reliability = true;
        self
    }
}

/// The outcome of one scenario occurrence. A failed run (divergence or
/// invariant violation) is flagged `is_good = false` and carries the
/// message instead of aborting the whole simulation.
#[derive(Debug)]
pub struct ScenarioResults {
    /// Whether the run completed.
    pub is_good: bool,
    /// Error message of a failed run.
    pub message: Option<String>,
    /// The scenario name.
    pub scenario: String,
    /// Occurrence start time on the global clock, in seconds.
    pub start_time: RealTime,
    /// Duration of the occurrence, in seconds.
    pub duration: RealTime,
    /// The finalized flow recording of the run.
    pub writer: FlowWriter,
}

impl ScenarioResults {
    /// Summarize the recorded series of this occurrence.
    pub fn stats(&self) -> StatsSummary {
        StatsSummary::from_writer(&self.writer)
    }
}

/// Results of all scenarios, each with all its occurrences.
#[derive(Debug, Default)]
pub struct AllResults {
    /// Occurrence results per scenario name.
    pub results: BTreeMap<String, Vec<ScenarioResults>>,
}

impl AllResults {
    /// Aggregate the statistics of every occurrence, per scenario.
    pub fn stats_by_scenario(&self) -> BTreeMap<String, StatsSummary> {
        let mut out = BTreeMap::new();
        for (name, occurrences) in &self.results {
            let mut total = StatsSummary::default();
            for occurrence in occurrences {
                total.merge(&occurrence.stats());
            }
            out.insert(name.clone(), total);
        }
        out
    }
}

/// # The top-level simulation
///
/// Owns the model library (components, networks, scenarios, distributions,
/// fragility curves, reliability modes) and the injected random source, and
/// runs scenarios against it.
pub struct Simulation {
    components: BTreeMap<String, Component>,
    networks: BTreeMap<String, Vec<Connection>>,
    scenarios: BTreeMap<String, Scenario>,
    dists: DistributionSystem,
    fragility_curves: HashMap<String, FragilityCurve>,
    reliability: ReliabilityCoordinator,
    reliability_schedule: Option<HashMap<String, Vec<TimeState>>>,
    max_time: RealTime,
    rand_fn: Box<dyn FnMut() -> f64>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("networks", &self.networks.keys().collect::<Vec<_>>())
            .field("scenarios", &self.scenarios.keys().collect::<Vec<_>>())
            .field("max_time", &self.max_time)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Create an empty simulation. `max_time` bounds the global clock (the
    /// horizon of occurrence and reliability scheduling) and `rand_fn` is
    /// the injected uniform-[0,1) source.
    pub fn new(max_time: RealTime, rand_fn: impl FnMut() -> f64 + 'static) -> Self {
        Self {
            components: BTreeMap::new(),
            networks: BTreeMap::new(),
            scenarios: BTreeMap::new(),
            dists: DistributionSystem::new(),
            fragility_curves: HashMap::new(),
            reliability: ReliabilityCoordinator::new(),
            reliability_schedule: None,
            max_time,
            rand_fn: Box::new(rand_fn),
        }
    }

    /// Add a component to the library.
    pub fn add_component(&mut self, component: Component) -> Result<(), ConfigError> {
        if self.components.contains_key(&component.id) {
            return Err(ConfigError::DuplicateTag(component.id));
        }
        self.components.insert(component.id.clone(), component);
        Ok(())
    }

    /// Add a network (a list of connections) to the library.
    pub fn add_network(
        &mut self,
        id: impl Into<String>,
        connections: Vec<Connection>,
    ) -> Result<(), ConfigError> {
        let id = id.into();
        if self.networks.contains_key(&id) {
            return Err(ConfigError::DuplicateTag(id));
        }
        self.networks.insert(id, connections);
        Ok(())
    }

    /// Add a scenario to the library.
    pub fn add_scenario(&mut self, scenario: Scenario) -> Result<(), ConfigError> {
        if self.scenarios.contains_key(&scenario.name) {
            return Err(ConfigError::DuplicateTag(scenario.name));
        }
        self.scenarios.insert(scenario.name.clone(), scenario);
        Ok(())
    }

    /// Register a fragility curve under a tag.
    pub fn add_fragility_curve(
        &mut self,
        tag: impl Into<String>,
        curve: FragilityCurve,
    ) -> Result<(), ConfigError> {
        let tag = tag.into();
        if self.fragility_curves.contains_key(&tag) {
            return Err(ConfigError::DuplicateTag(tag));
        }
        self.fragility_curves.insert(tag, curve);
        Ok(())
    }

    /// The distribution registry.
    pub fn dists(&self) -> &DistributionSystem {
        &self.dists
    }

    /// Mutable access to the distribution registry.
    pub fn dists_mut(&mut self) -> &mut DistributionSystem {
        &mut self.dists
    }

    /// Mutable access to the reliability coordinator.
    pub fn reliability_mut(&mut self) -> &mut ReliabilityCoordinator {
        &mut self.reliability
    }

    /// The global time horizon in seconds.
    pub fn max_time(&self) -> RealTime {
        self.max_time
    }

    /// Iterate over all components of the library.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// The connections of a network, if it exists.
    pub fn network(&self, id: &str) -> Option<&[Connection]> {
        self.networks.get(id).map(Vec::as_slice)
    }

    /// Iterate over all networks as `(id, connections)`.
    pub fn networks(&self) -> impl Iterator<Item = (&str, &[Connection])> {
        self.networks.iter().map(|(id, c)| (id.as_str(), c.as_slice()))
    }

    /// Iterate over all scenarios of the library.
    pub fn scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }

    /// The global reliability schedule over `[0, max_time]`, computed once
    /// and shared by all scenario occurrences.
    fn reliability_schedule(
        &mut self,
    ) -> Result<&HashMap<String, Vec<TimeState>>, SimulationError> {
        if self.reliability_schedule.is_none() {
            let schedule = self.reliability.calc_reliability_schedule(
                &mut self.rand_fn,
                &self.dists,
                self.max_time,
            )?;
            self.reliability_schedule = Some(schedule);
        }
        Ok(self.reliability_schedule.as_ref().expect("just computed"))
    }

    /// Run one occurrence of a scenario starting at `start_time` on the
    /// global clock. Build errors abort; runtime errors produce a result
    /// flagged `is_good = false`.
    pub fn run(
        &mut self,
        scenario_id: &str,
        start_time: RealTime,
    ) -> Result<ScenarioResults, SimulationError> {
        let scenario = self
            .scenarios
            .get(scenario_id)
            .ok_or_else(|| ReferenceError::Scenario(scenario_id.to_string()))?
            .clone();
        let connections = self
            .networks
            .get(&scenario.network_id)
            .ok_or_else(|| ReferenceError::Network(scenario.network_id.clone()))?
            .clone();

        // assemble the overlays: reliability window and failure probabilities
        let clipped = if scenario.calc_reliability {
            let schedule = self.reliability_schedule()?;
            clip_schedule_to(schedule, start_time, start_time + scenario.duration)
        } else {
            HashMap::new()
        };
        let mut failure_probs = HashMap::new();
        for (id, component) in &self.components {
            if component.fragility_modes.is_empty() {
                continue;
            }
            let probs = fragility::failure_probabilities(
                &component.fragility_modes,
                &self.fragility_curves,
                &scenario.intensities,
            )?;
            if !probs.is_empty() {
                failure_probs.insert(id.clone(), probs);
            }
        }

        info!("running scenario {scenario_id} at t = {start_time} s");
        let builder = NetworkBuilder {
            components: &self.components,
            scenario: scenario_id,
            duration: scenario.duration,
            failure_probs: &failure_probs,
            reliability: &clipped,
            dists: &self.dists,
        };
        let (mut net, _surface) = builder.build(&connections, &mut self.rand_fn)?;

        match net.simulate(scenario.duration) {
            Ok(()) => Ok(ScenarioResults {
                is_good: true,
                message: None,
                scenario: scenario_id.to_string(),
                start_time,
                duration: scenario.duration,
                writer: net.finalize(scenario.duration),
            }),
            Err(e @ (SimulationError::Divergence { .. } | SimulationError::Invariant(_))) => {
                warn!("scenario {scenario_id} failed: {e}");
                Ok(ScenarioResults {
                    is_good: false,
                    message: Some(e.to_string()),
                    scenario: scenario_id.to_string(),
                    start_time,
                    duration: scenario.duration,
                    writer: net.finalize(scenario.duration),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// The occurrence start times of a scenario: repeated draws of the
    /// occurrence distribution, bounded by `max_occurrences` and the global
    /// horizon.
    pub fn scenario_start_times(
        &mut self,
        scenario_id: &str,
    ) -> Result<Vec<RealTime>, SimulationError> {
        let scenario = self
            .scenarios
            .get(scenario_id)
            .ok_or_else(|| ReferenceError::Scenario(scenario_id.to_string()))?;
        let (dist, max_occurrences) = (scenario.occurrence_dist, scenario.max_occurrences);
        let mut starts = Vec::new();
        let mut t: RealTime = 0;
        loop {
            if max_occurrences.map(|m| starts.len() >= m).unwrap_or(false) {
                break;
            }
            let u = (self.rand_fn)();
            t += self.dists.next_time_advance(dist, u)?;
            if t > self.max_time {
                break;
            }
            starts.push(t);
        }
        Ok(starts)
    }

    /// Run every occurrence of every scenario.
    pub fn run_all(&mut self) -> Result<AllResults, SimulationError> {
        let mut all = AllResults::default();
        let scenario_ids: Vec<String> = self.scenarios.keys().cloned().collect();
        for scenario_id in scenario_ids {
            let mut occurrences = Vec::new();
            for start in self.scenario_start_times(&scenario_id)? {
                let result = self.run(&scenario_id, start)?;
                if !result.is_good {
                    warn!(
                        "scenario {scenario_id} occurrence at {start} s failed: {}",
                        result.message.as_deref().unwrap_or("unknown")
                    );
                }
                occurrences.push(result);
            }
            all.results.insert(scenario_id, occurrences);
        }
        Ok(all)
    }
}
