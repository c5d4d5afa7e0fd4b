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

//! End-to-end tests of the top-level simulation: occurrence scheduling,
//! reliability overlays and result aggregation.

use approx::assert_abs_diff_eq;
use lazy_static::lazy_static;
use maplit::hashmap;
use pretty_assertions::assert_eq;
use rand::prelude::*;

use crate::component::{Component, ComponentKind, ComponentPort, Connection};
use crate::scenario::{Scenario, Simulation};
use crate::types::LoadItem;

lazy_static! {
    static ref GRID_AND_BUILDING: Vec<Component> = vec![
        Component::new(
            "grid",
            ComponentKind::Source { stream: "electricity".into(), max_outflow: None },
        ),
        Component::new(
            "building",
            ComponentKind::Load {
                stream: "electricity".into(),
                loads_by_scenario: hashmap! {
                    "outage".to_string() => vec![LoadItem::new(0, 5.0)],
                },
            },
        ),
    ];
    static ref GRID_TO_BUILDING: Vec<Connection> = vec![Connection::new(
        ComponentPort::new("grid", 0),
        ComponentPort::new("building", 0),
        "electricity".into(),
    )];
}

fn basic_simulation(rand_fn: impl FnMut() -> f64 + 'static) -> Simulation {
    let mut sim = Simulation::new(3500, rand_fn);
    for component in GRID_AND_BUILDING.iter() {
        sim.add_component(component.clone()).unwrap();
    }
    sim.add_network("town", GRID_TO_BUILDING.clone()).unwrap();
    sim
}

#[test]
fn occurrences_are_scheduled_from_the_distribution() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut sim = basic_simulation(|| 0.5);
    let occurrence = sim.dists_mut().add_fixed("every-1000", 1000).unwrap();
    sim.add_scenario(Scenario::new("outage", "town", 600, occurrence).unwrap()).unwrap();

    let starts = sim.scenario_start_times("outage").unwrap();
    assert_eq!(starts, vec![1000, 2000, 3000]);

    let results = sim.run_all().unwrap();
    let occurrences = &results.results["outage"];
    assert_eq!(occurrences.len(), 3);
    assert!(occurrences.iter().all(|r| r.is_good));

    let stats = results.stats_by_scenario();
    // 5 kW over 600 s, three times
    assert_abs_diff_eq!(stats["outage"].by_series["building-inflow"].total_energy, 9000.0);
}

#[test]
fn max_occurrences_bounds_the_schedule() {
    let mut sim = basic_simulation(|| 0.5);
    let occurrence = sim.dists_mut().add_fixed("immediately", 0).unwrap();
    sim.add_scenario(
        Scenario::new("outage", "town", 600, occurrence).unwrap().with_max_occurrences(1),
    )
    .unwrap();
    assert_eq!(sim.scenario_start_times("outage").unwrap(), vec![0]);
}

#[test]
fn reliability_gates_the_source_during_outages() {
    let mut sim = basic_simulation(|| 0.5);
    let occurrence = sim.dists_mut().add_fixed("once", 0).unwrap();
    let fail = sim.dists_mut().add_fixed("mtbf", 200).unwrap();
    let repair = sim.dists_mut().add_fixed("mttr", 100).unwrap();
    let mode = sim.reliability_mut().add_failure_mode("grid-outage", fail, repair);
    sim.reliability_mut().link_component_with_failure_mode("grid", mode);
    sim.add_scenario(
        Scenario::new("outage", "town", 600, occurrence)
            .unwrap()
            .with_max_occurrences(1)
            .with_reliability(),
    )
    .unwrap();

    let results = sim.run_all().unwrap();
    let occurrence = &results.results["outage"][0];
    assert!(occurrence.is_good);
    let stats = occurrence.stats();
    let building = &stats.by_series["building-inflow"];
    // outages on [200, 300) and [500, 600)
    assert_eq!(building.uptime, 400);
    assert_eq!(building.downtime, 200);
    assert_eq!(building.max_downtime, 100);
    assert_abs_diff_eq!(building.total_energy, 2000.0);
    assert_abs_diff_eq!(building.load_not_served, 1000.0);
}

/// A simulation whose building fails with 50% probability under a wind
/// intensity of 50 mph.
fn fragile_simulation(rand_fn: impl FnMut() -> f64 + 'static) -> Simulation {
    let mut sim = Simulation::new(3500, rand_fn);
    sim.add_component(GRID_AND_BUILDING[0].clone()).unwrap();
    let mut building = GRID_AND_BUILDING[1].clone();
    building.fragility_modes.push(crate::fragility::FragilityMode {
        curve_tag: "wind".to_string(),
        vulnerable_to: "wind_speed_mph".to_string(),
        repair_dist: None,
    });
    sim.add_component(building).unwrap();
    sim.add_network("town", GRID_TO_BUILDING.clone()).unwrap();
    sim.add_fragility_curve("wind", crate::fragility::FragilityCurve::linear(0.0, 100.0).unwrap())
        .unwrap();
    let occurrence = sim.dists_mut().add_fixed("once", 0).unwrap();
    sim.add_scenario(
        Scenario::new("outage", "town", 600, occurrence)
            .unwrap()
            .with_max_occurrences(1)
            .with_intensities(hashmap! { "wind_speed_mph".to_string() => 50.0 }),
    )
    .unwrap();
    sim
}

#[test]
fn fragility_is_sampled_from_the_injected_randomness() {
    // a draw below the 50% failure probability knocks the building out
    let mut sim = fragile_simulation(|| 0.1);
    let result = sim.run("outage", 0).unwrap();
    assert!(result.is_good);
    let stats = result.stats();
    assert_abs_diff_eq!(stats.by_series["building-inflow"].total_energy, 0.0);
    assert_eq!(stats.by_series["building-inflow"].downtime, 600);

    // a draw above it leaves the building served
    let mut sim = fragile_simulation(|| 0.9);
    let result = sim.run("outage", 0).unwrap();
    assert_abs_diff_eq!(result.stats().by_series["building-inflow"].total_energy, 3000.0);
}

#[test]
fn seeded_runs_are_reproducible() {
    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sim = basic_simulation(move || rng.gen());
        let occurrence = sim.dists_mut().add_uniform("spread", 100, 1000).unwrap();
        sim.add_scenario(Scenario::new("outage", "town", 600, occurrence).unwrap())
            .unwrap();
        sim.scenario_start_times("outage").unwrap()
    };
    assert_eq!(run(42), run(42));
    assert_ne!(run(42), run(43));
}

#[test]
fn unknown_scenario_is_a_reference_error() {
    let mut sim = basic_simulation(|| 0.5);
    assert!(sim.run("does-not-exist", 0).is_err());
}
