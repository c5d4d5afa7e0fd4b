// Enflow: Resilience analysis for energy flow networks
// Copyright (C) 2023 Tibor Schneider <sctibor@ethz.ch>
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

//! The TOML input dialect and its translation into a [`Simulation`].
//!
//! Times may be given in seconds, minutes, hours, days or years; flows are
//! kilowatts and quantities kilojoules. Everything is normalized at this
//! boundary; the core only ever sees seconds and kilowatts.

use std::collections::BTreeMap;
use std::path::Path;

use flowsim::prelude::*;
use log::*;
use serde::Deserialize;

use crate::EnflowError;

/// Load a simulation from a TOML file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Simulation, EnflowError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|source| EnflowError::Io { path: path.to_path_buf(), source })?;
    load_str(&raw)
}

/// Load a simulation from a TOML string.
pub fn load_str(raw: &str) -> Result<Simulation, EnflowError> {
    let config: RawConfig = toml::from_str(raw)?;
    config.build()
}

/// Time units accepted by the input dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Plain seconds (the default).
    #[default]
    Seconds,
    /// Minutes (60 s).
    Minutes,
    /// Hours (3600 s).
    Hours,
    /// Days (86 400 s).
    Days,
    /// Years (365 days; leap years are not acknowledged).
    Years,
}

impl TimeUnit {
    fn seconds_per_unit(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86_400.0,
            TimeUnit::Years => 365.0 * 86_400.0,
        }
    }

    /// Convert a time in this unit to whole seconds.
    pub fn to_seconds(self, time: f64) -> RealTime {
        (time * self.seconds_per_unit()).round() as RealTime
    }
}

/// The raw top-level structure of an input file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Global run parameters.
    pub simulation_info: SimulationInfo,
    /// Declared streams (keys are the stream tags).
    #[serde(default)]
    pub streams: BTreeMap<String, StreamSpec>,
    /// Named load (and supply) profiles.
    #[serde(default)]
    pub loads: BTreeMap<String, LoadProfile>,
    /// The component library.
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSpec>,
    /// Named time distributions.
    #[serde(default, rename = "dist")]
    pub dists: BTreeMap<String, DistSpecRaw>,
    /// Named fragility curves.
    #[serde(default, rename = "fragility_curve")]
    pub fragility_curves: BTreeMap<String, FragilityCurveSpec>,
    /// Named fragility modes (curve plus optional repair).
    #[serde(default, rename = "fragility_mode")]
    pub fragility_modes: BTreeMap<String, FragilityModeSpec>,
    /// Named failure modes (failure plus repair distribution).
    #[serde(default, rename = "failure_mode")]
    pub failure_modes: BTreeMap<String, FailureModeSpec>,
    /// Named networks (connection lists).
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkSpec>,
    /// Named scenarios.
    #[serde(default)]
    pub scenarios: BTreeMap<String, ScenarioSpec>,
}

/// Global run parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationInfo {
    /// Unit of flow rates; only `"kW"` is accepted.
    #[serde(default = "default_rate_unit")]
    pub rate_unit: String,
    /// Unit of quantities; only `"kJ"` is accepted.
    #[serde(default = "default_quantity_unit")]
    pub quantity_unit: String,
    /// Unit of `max_time`.
    #[serde(default)]
    pub time_unit: TimeUnit,
    /// The global time horizon, in `time_unit`s.
    pub max_time: f64,
    /// Seed of the random engine.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Replace the random engine by a constant.
    #[serde(default)]
    pub fixed_random: Option<f64>,
    /// Replace the random engine by a repeating series.
    #[serde(default)]
    pub fixed_random_series: Option<Vec<f64>>,
}

fn default_rate_unit() -> String {
    "kW".to_string()
}

fn default_quantity_unit() -> String {
    "kJ".to_string()
}

impl SimulationInfo {
    /// Build the uniform-[0,1) source the core consumes: a seeded engine,
    /// a constant, or a repeating series.
    pub fn make_rand_fn(&self) -> Box<dyn FnMut() -> f64> {
        use rand::prelude::*;
        if let Some(series) = &self.fixed_random_series {
            let series = series.clone();
            let mut idx = 0;
            return Box::new(move || {
                let u = series[idx % series.len()];
                idx += 1;
                u
            });
        }
        if let Some(u) = self.fixed_random {
            return Box::new(move || u);
        }
        let mut rng = match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Box::new(move || rng.gen())
    }
}

/// A declared stream. The table currently carries no parameters; declaring
/// a stream makes it known for connection checking.
#[derive(Debug, Default, Deserialize)]
pub struct StreamSpec {}

/// A named piecewise-constant profile.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadProfile {
    /// `[time, rate]` pairs; times in `time_unit`, rates in kW.
    pub time_rate_pairs: Vec<(f64, f64)>,
    /// Unit of the times in `time_rate_pairs`.
    #[serde(default)]
    pub time_unit: TimeUnit,
}

impl LoadProfile {
    fn to_items(&self) -> Vec<LoadItem> {
        self.time_rate_pairs
            .iter()
            .map(|(t, v)| LoadItem::new(self.time_unit.to_seconds(*t), *v))
            .collect()
    }
}

/// One component of the library.
#[derive(Debug, Deserialize)]
pub struct ComponentSpec {
    /// The kind-specific configuration.
    #[serde(flatten)]
    pub kind: ComponentKindSpec,
    /// Fragility modes that apply to this component.
    #[serde(default)]
    pub fragility_modes: Vec<String>,
    /// Failure modes that apply to this component.
    #[serde(default)]
    pub failure_modes: Vec<String>,
}

/// The kind-specific component configuration, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKindSpec {
    /// A dispatchable source.
    Source {
        /// Stream provided.
        outflow: String,
        /// Optional cap in kW.
        #[serde(default)]
        max_outflow: Option<f64>,
    },
    /// A scheduled sink.
    Load {
        /// Stream drawn.
        inflow: String,
        /// Profile tag per scenario id.
        loads_by_scenario: BTreeMap<String, String>,
    },
    /// A source delivering a scheduled, non-dispatchable flow.
    UncontrolledSource {
        /// Stream provided.
        outflow: String,
        /// Profile tag per scenario id.
        supply_by_scenario: BTreeMap<String, String>,
    },
    /// A constant-efficiency converter.
    Converter {
        /// Stream consumed.
        inflow: String,
        /// Stream produced.
        outflow: String,
        /// Stream of the loss heat (defaults to `"waste_heat"`).
        #[serde(default)]
        lossflow: Option<String>,
        /// The constant efficiency.
        constant_efficiency: f64,
    },
    /// An N-to-M dispatch point.
    Muxer {
        /// Stream switched.
        stream: String,
        /// Number of inflow ports.
        num_inflows: usize,
        /// Number of outflow ports.
        num_outflows: usize,
        /// `"in_order"` or `"distribute"` (the default).
        #[serde(default)]
        dispatch_strategy: Option<String>,
    },
    /// A pass-through, optionally flow-limited.
    PassThrough {
        /// Stream passed through.
        stream: String,
        /// Optional lower limit in kW.
        #[serde(default)]
        min_outflow: Option<f64>,
        /// Optional upper limit in kW.
        #[serde(default)]
        max_outflow: Option<f64>,
    },
    /// A state-of-charge store.
    Store {
        /// Stream stored.
        stream: String,
        /// Capacity in kJ.
        capacity: f64,
        /// Maximum charge rate in kW.
        max_charge_rate: f64,
        /// Initial state of charge (defaults to 1.0).
        #[serde(default)]
        init_soc: Option<f64>,
    },
    /// A two-inflow mover.
    Mover {
        /// Stream of inflow port 0.
        inflow0: String,
        /// Stream of inflow port 1.
        inflow1: String,
        /// Stream of the outflow.
        outflow: String,
        /// The coefficient of performance.
        cop: f64,
    },
}

/// A named distribution, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistSpecRaw {
    /// Always the same value.
    Fixed {
        /// The value, in `time_unit`s.
        value: f64,
        /// Unit of `value`.
        #[serde(default)]
        time_unit: TimeUnit,
    },
    /// Uniform over `[lower_bound, upper_bound]`.
    Uniform {
        /// Lower bound.
        lower_bound: f64,
        /// Upper bound.
        upper_bound: f64,
        /// Unit of the bounds.
        #[serde(default)]
        time_unit: TimeUnit,
    },
    /// Normal with mean and standard deviation.
    Normal {
        /// The mean.
        mean: f64,
        /// The standard deviation.
        standard_deviation: f64,
        /// Unit of mean and standard deviation.
        #[serde(default)]
        time_unit: TimeUnit,
    },
    /// Three-parameter Weibull.
    Weibull {
        /// Shape parameter `k`.
        shape: f64,
        /// Scale parameter `lambda`, in `time_unit`s.
        scale: f64,
        /// Location parameter `gamma`, in `time_unit`s.
        #[serde(default)]
        location: f64,
        /// Unit of scale and location.
        #[serde(default)]
        time_unit: TimeUnit,
    },
    /// Quantile table mapping variates to times.
    QuantileTable {
        /// Strictly increasing variates spanning `[0, 1]`.
        variates: Vec<f64>,
        /// Times, one per variate, in `time_unit`s.
        times: Vec<f64>,
        /// Unit of the times.
        #[serde(default)]
        time_unit: TimeUnit,
    },
}

/// A named fragility curve.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FragilityCurveSpec {
    /// Linear between the two bounds.
    Linear {
        /// Intensity below which the curve yields 0.
        lower_bound: f64,
        /// Intensity at or above which the curve yields 1.
        upper_bound: f64,
        /// The scenario intensity this curve reacts to.
        vulnerable_to: String,
    },
}

/// A named fragility mode.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FragilityModeSpec {
    /// The fragility curve to evaluate.
    pub fragility_curve: String,
    /// Distribution of the repair time. Absent means the failure cannot be
    /// repaired (following the convention that a repair time of zero means
    /// "no repair", not "instant repair").
    #[serde(default)]
    pub repair_dist: Option<String>,
}

/// A named failure mode.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureModeSpec {
    /// Distribution of the time to failure.
    pub failure_dist: String,
    /// Distribution of the time to repair.
    pub repair_dist: String,
}

/// A named network.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSpec {
    /// Connections as `["compA:OUT(i)", "compB:IN(j)", "stream"]` triples.
    pub connections: Vec<(String, String, String)>,
}

/// A named scenario.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpec {
    /// The network the scenario runs on.
    pub network: String,
    /// Duration of one occurrence, in `time_unit`s.
    pub duration: f64,
    /// Unit of `duration`.
    #[serde(default)]
    pub time_unit: TimeUnit,
    /// The distribution of the time between occurrences.
    pub occurrence_distribution: String,
    /// Bound on the number of occurrences (absent or negative = unbounded).
    #[serde(default)]
    pub max_occurrences: Option<i64>,
    /// Scenario intensities fed to the fragility curves.
    #[serde(default)]
    pub intensity: BTreeMap<String, f64>,
    /// Whether reliability (failure/repair) schedules apply.
    #[serde(default)]
    pub calc_reliability: bool,
}

impl RawConfig {
    /// Translate the raw input into a ready-to-run [`Simulation`].
    pub fn build(&self) -> Result<Simulation, EnflowError> {
        let info = &self.simulation_info;
        if info.rate_unit != "kW" {
            return Err(EnflowError::Input(format!(
                "unsupported rate unit '{}' (only kW)",
                info.rate_unit
            )));
        }
        if info.quantity_unit != "kJ" {
            return Err(EnflowError::Input(format!(
                "unsupported quantity unit '{}' (only kJ)",
                info.quantity_unit
            )));
        }
        let max_time = info.time_unit.to_seconds(info.max_time);
        let mut sim = Simulation::new(max_time, info.make_rand_fn());

        // distributions first, everything else references them by tag
        for (tag, spec) in &self.dists {
            self.register_dist(&mut sim, tag, spec)?;
        }
        for (tag, spec) in &self.fragility_curves {
            let FragilityCurveSpec::Linear { lower_bound, upper_bound, .. } = spec;
            sim.add_fragility_curve(
                tag.as_str(),
                FragilityCurve::linear(*lower_bound, *upper_bound)?,
            )?;
        }

        // failure modes and their component links
        let mut failure_mode_ids = BTreeMap::new();
        for (tag, spec) in &self.failure_modes {
            let failure = sim.dists().lookup_dist_by_tag(&spec.failure_dist)?;
            let repair = sim.dists().lookup_dist_by_tag(&spec.repair_dist)?;
            let id = sim.reliability_mut().add_failure_mode(tag.as_str(), failure, repair);
            failure_mode_ids.insert(tag.clone(), id);
        }

        for (id, spec) in &self.components {
            let component = self.build_component(&sim, id, spec)?;
            for fm_tag in &spec.failure_modes {
                let fm = failure_mode_ids.get(fm_tag).ok_or_else(|| {
                    EnflowError::Input(format!("component {id}: unknown failure mode '{fm_tag}'"))
                })?;
                sim.reliability_mut().link_component_with_failure_mode(id.as_str(), *fm);
            }
            sim.add_component(component)?;
        }

        for (id, spec) in &self.networks {
            let mut connections = Vec::with_capacity(spec.connections.len());
            for (source, target, stream) in &spec.connections {
                self.check_stream_declared(stream)?;
                connections.push(Connection::new(
                    parse_endpoint(source, "OUT")?,
                    parse_endpoint(target, "IN")?,
                    stream.as_str().into(),
                ));
            }
            sim.add_network(id.as_str(), connections)?;
        }

        for (name, spec) in &self.scenarios {
            let occurrence = sim.dists().lookup_dist_by_tag(&spec.occurrence_distribution)?;
            let mut scenario = Scenario::new(
                name.as_str(),
                spec.network.as_str(),
                spec.time_unit.to_seconds(spec.duration),
                occurrence,
            )?
            .with_intensities(spec.intensity.clone().into_iter().collect());
            if let Some(max) = spec.max_occurrences {
                if max >= 0 {
                    scenario = scenario.with_max_occurrences(max as usize);
                }
            }
            if spec.calc_reliability {
                scenario = scenario.with_reliability();
            }
            sim.add_scenario(scenario)?;
        }

        debug!(
            "loaded {} components, {} networks, {} scenarios",
            self.components.len(),
            self.networks.len(),
            self.scenarios.len()
        );
        Ok(sim)
    }

    fn register_dist(
        &self,
        sim: &mut Simulation,
        tag: &str,
        spec: &DistSpecRaw,
    ) -> Result<(), EnflowError> {
        let dists = sim.dists_mut();
        match spec {
            DistSpecRaw::Fixed { value, time_unit } => {
                dists.add_fixed(tag, time_unit.to_seconds(*value))?;
            }
            DistSpecRaw::Uniform { lower_bound, upper_bound, time_unit } => {
                dists.add_uniform(
                    tag,
                    time_unit.to_seconds(*lower_bound),
                    time_unit.to_seconds(*upper_bound),
                )?;
            }
            DistSpecRaw::Normal { mean, standard_deviation, time_unit } => {
                dists.add_normal(
                    tag,
                    time_unit.to_seconds(*mean),
                    time_unit.to_seconds(*standard_deviation),
                )?;
            }
            DistSpecRaw::Weibull { shape, scale, location, time_unit } => {
                dists.add_weibull(
                    tag,
                    *shape,
                    scale * time_unit.seconds_per_unit(),
                    location * time_unit.seconds_per_unit(),
                )?;
            }
            DistSpecRaw::QuantileTable { variates, times, time_unit } => {
                let times =
                    times.iter().map(|t| t * time_unit.seconds_per_unit()).collect();
                dists.add_quantile_table(tag, variates.clone(), times)?;
            }
        }
        Ok(())
    }

    fn check_stream_declared(&self, stream: &str) -> Result<(), EnflowError> {
        if !self.streams.is_empty() && !self.streams.contains_key(stream) {
            return Err(EnflowError::Input(format!("undeclared stream '{stream}'")));
        }
        Ok(())
    }

    fn resolve_profiles(
        &self,
        component: &str,
        by_scenario: &BTreeMap<String, String>,
    ) -> Result<std::collections::HashMap<String, Vec<LoadItem>>, EnflowError> {
        let mut out = std::collections::HashMap::new();
        for (scenario, profile_tag) in by_scenario {
            let profile = self.loads.get(profile_tag).ok_or_else(|| {
                EnflowError::Input(format!(
                    "component {component}: unknown load profile '{profile_tag}'"
                ))
            })?;
            out.insert(scenario.clone(), profile.to_items());
        }
        Ok(out)
    }

    fn build_component(
        &self,
        sim: &Simulation,
        id: &str,
        spec: &ComponentSpec,
    ) -> Result<Component, EnflowError> {
        let kind = match &spec.kind {
            ComponentKindSpec::Source { outflow, max_outflow } => {
                self.check_stream_declared(outflow)?;
                ComponentKind::Source {
                    stream: outflow.as_str().into(),
                    max_outflow: *max_outflow,
                }
            }
            ComponentKindSpec::Load { inflow, loads_by_scenario } => {
                self.check_stream_declared(inflow)?;
                ComponentKind::Load {
                    stream: inflow.as_str().into(),
                    loads_by_scenario: self.resolve_profiles(id, loads_by_scenario)?,
                }
            }
            ComponentKindSpec::UncontrolledSource { outflow, supply_by_scenario } => {
                self.check_stream_declared(outflow)?;
                ComponentKind::UncontrolledSource {
                    stream: outflow.as_str().into(),
                    supply_by_scenario: self.resolve_profiles(id, supply_by_scenario)?,
                }
            }
            ComponentKindSpec::Converter { inflow, outflow, lossflow, constant_efficiency } => {
                self.check_stream_declared(inflow)?;
                self.check_stream_declared(outflow)?;
                ComponentKind::Converter {
                    inflow_stream: inflow.as_str().into(),
                    outflow_stream: outflow.as_str().into(),
                    lossflow_stream: lossflow.as_deref().unwrap_or("waste_heat").into(),
                    efficiency: *constant_efficiency,
                }
            }
            ComponentKindSpec::Muxer { stream, num_inflows, num_outflows, dispatch_strategy } => {
                self.check_stream_declared(stream)?;
                let strategy = match dispatch_strategy.as_deref() {
                    None | Some("distribute") => MuxDispatchStrategy::Distribute,
                    Some("in_order") => MuxDispatchStrategy::InOrder,
                    Some(other) => {
                        return Err(EnflowError::Input(format!(
                            "component {id}: unknown dispatch strategy '{other}'"
                        )))
                    }
                };
                ComponentKind::Mux {
                    stream: stream.as_str().into(),
                    num_inflows: *num_inflows,
                    num_outflows: *num_outflows,
                    strategy,
                }
            }
            ComponentKindSpec::PassThrough { stream, min_outflow, max_outflow } => {
                self.check_stream_declared(stream)?;
                let limits = match (min_outflow, max_outflow) {
                    (None, None) => None,
                    (min, max) => {
                        Some(Limits::new(min.unwrap_or(0.0), max.unwrap_or(f64::INFINITY))?)
                    }
                };
                ComponentKind::PassThrough { stream: stream.as_str().into(), limits }
            }
            ComponentKindSpec::Store { stream, capacity, max_charge_rate, init_soc } => {
                self.check_stream_declared(stream)?;
                ComponentKind::Storage {
                    stream: stream.as_str().into(),
                    capacity: *capacity,
                    max_charge_rate: *max_charge_rate,
                    init_soc: init_soc.unwrap_or(1.0),
                }
            }
            ComponentKindSpec::Mover { inflow0, inflow1, outflow, cop } => {
                self.check_stream_declared(inflow0)?;
                self.check_stream_declared(inflow1)?;
                self.check_stream_declared(outflow)?;
                ComponentKind::Mover {
                    inflow0_stream: inflow0.as_str().into(),
                    inflow1_stream: inflow1.as_str().into(),
                    outflow_stream: outflow.as_str().into(),
                    cop: *cop,
                }
            }
        };
        let mut fragility_modes = Vec::with_capacity(spec.fragility_modes.len());
        for mode_tag in &spec.fragility_modes {
            let mode = self.fragility_modes.get(mode_tag).ok_or_else(|| {
                EnflowError::Input(format!("component {id}: unknown fragility mode '{mode_tag}'"))
            })?;
            let FragilityCurveSpec::Linear { vulnerable_to, .. } =
                self.fragility_curves.get(&mode.fragility_curve).ok_or_else(|| {
                    EnflowError::Input(format!(
                        "fragility mode {mode_tag}: unknown fragility curve '{}'",
                        mode.fragility_curve
                    ))
                })?;
            let repair_dist = match &mode.repair_dist {
                Some(tag) => Some(sim.dists().lookup_dist_by_tag(tag)?),
                None => None,
            };
            fragility_modes.push(FragilityMode {
                curve_tag: mode.fragility_curve.clone(),
                vulnerable_to: vulnerable_to.clone(),
                repair_dist,
            });
        }
        Ok(Component::with_fragilities(id, kind, fragility_modes))
    }
}

/// Parse a connection endpoint like `"battery:OUT(0)"`. A missing port
/// number defaults to 0.
fn parse_endpoint(raw: &str, direction: &str) -> Result<ComponentPort, EnflowError> {
    let invalid = || {
        EnflowError::Input(format!(
            "invalid connection endpoint '{raw}' (expected 'component:{direction}(k)')"
        ))
    };
    let (component, port_spec) = raw.split_once(':').ok_or_else(invalid)?;
    if component.is_empty() {
        return Err(invalid());
    }
    let port_spec = port_spec.strip_prefix(direction).ok_or_else(invalid)?;
    let port = if port_spec.is_empty() {
        0
    } else {
        port_spec
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)?
    };
    Ok(ComponentPort::new(component, port))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn endpoints_parse() {
        assert_eq!(parse_endpoint("grid:OUT(0)", "OUT").unwrap(), ComponentPort::new("grid", 0));
        assert_eq!(parse_endpoint("bus:IN(3)", "IN").unwrap(), ComponentPort::new("bus", 3));
        assert_eq!(parse_endpoint("grid:OUT", "OUT").unwrap(), ComponentPort::new("grid", 0));
        assert!(parse_endpoint("grid:IN(0)", "OUT").is_err());
        assert!(parse_endpoint("grid", "OUT").is_err());
        assert!(parse_endpoint("grid:OUT(x)", "OUT").is_err());
    }

    #[test]
    fn time_units_convert() {
        assert_eq!(TimeUnit::Seconds.to_seconds(12.0), 12);
        assert_eq!(TimeUnit::Hours.to_seconds(2.0), 7200);
        assert_eq!(TimeUnit::Years.to_seconds(1.0), 365 * 86_400);
    }

    #[test]
    fn minimal_input_builds() {
        let sim = load_str(
            r#"
            [simulation_info]
            max_time = 1
            time_unit = "hours"
            fixed_random = 0.5

            [streams.electricity]

            [loads.flat]
            time_rate_pairs = [[0.0, 5.0]]

            [components.grid]
            type = "source"
            outflow = "electricity"

            [components.building]
            type = "load"
            inflow = "electricity"
            loads_by_scenario = { blue_sky = "flat" }

            [dist.immediately]
            type = "fixed"
            value = 0

            [networks.town]
            connections = [["grid:OUT(0)", "building:IN(0)", "electricity"]]

            [scenarios.blue_sky]
            network = "town"
            duration = 1
            time_unit = "hours"
            occurrence_distribution = "immediately"
            max_occurrences = 1
            "#,
        )
        .unwrap();
        assert_eq!(sim.max_time(), 3600);
        assert_eq!(sim.components().count(), 2);
        assert!(sim.network("town").is_some());
    }

    #[test]
    fn unknown_stream_is_rejected() {
        let result = load_str(
            r#"
            [simulation_info]
            max_time = 10

            [streams.electricity]

            [components.grid]
            type = "source"
            outflow = "heat"
            "#,
        );
        assert!(matches!(result, Err(EnflowError::Input(_))));
    }

    #[test]
    fn full_run_from_toml() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut sim = load_str(
            r#"
            [simulation_info]
            max_time = 3600
            fixed_random = 0.5

            [streams.electricity]

            [loads.flat]
            time_rate_pairs = [[0.0, 4.0]]

            [components.grid]
            type = "source"
            outflow = "electricity"
            max_outflow = 10.0

            [components.building]
            type = "load"
            inflow = "electricity"
            loads_by_scenario = { blue_sky = "flat" }

            [dist.immediately]
            type = "fixed"
            value = 0

            [networks.town]
            connections = [["grid:OUT(0)", "building:IN(0)", "electricity"]]

            [scenarios.blue_sky]
            network = "town"
            duration = 100
            occurrence_distribution = "immediately"
            max_occurrences = 1
            "#,
        )
        .unwrap();
        let results = sim.run_all().unwrap();
        let occurrence = &results.results["blue_sky"][0];
        assert!(occurrence.is_good);
        let stats = occurrence.stats();
        assert!((stats.by_series["building-inflow"].total_energy - 400.0).abs() < 1e-6);
    }
}
