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

//! Graphviz rendering of a network: one node per component (shaped by
//! component type), one labeled edge per connection.

use std::fmt::Write;

use flowsim::prelude::*;

use crate::EnflowError;

fn node_shape(component_type: ComponentType) -> &'static str {
    match component_type {
        ComponentType::Source | ComponentType::UncontrolledSource => "invhouse",
        ComponentType::Load => "house",
        ComponentType::Storage => "cylinder",
        ComponentType::Converter | ComponentType::Mover => "diamond",
        ComponentType::Muxer => "trapezium",
        ComponentType::PassThrough => "box",
    }
}

/// Render one network of the simulation as a Graphviz digraph.
pub fn network_to_dot(sim: &Simulation, network_id: &str) -> Result<String, EnflowError> {
    let connections = sim
        .network(network_id)
        .ok_or_else(|| EnflowError::Input(format!("unknown network '{network_id}'")))?;
    let mut dot = String::new();
    // infallible writes into a String
    let _ = writeln!(dot, "digraph \"{network_id}\" {{");
    let _ = writeln!(dot, "  rankdir=LR;");
    let mut named: Vec<&str> = connections
        .iter()
        .flat_map(|c| [c.source.component.as_str(), c.target.component.as_str()])
        .collect();
    named.sort_unstable();
    named.dedup();
    for component in sim.components() {
        if !named.contains(&component.id.as_str()) {
            continue;
        }
        let _ = writeln!(
            dot,
            "  \"{}\" [shape={}];",
            component.id,
            node_shape(component.component_type())
        );
    }
    for connection in connections {
        let _ = writeln!(
            dot,
            "  \"{}\" -> \"{}\" [label=\"{} ({}->{})\"];",
            connection.source.component,
            connection.target.component,
            connection.stream,
            connection.source.port,
            connection.target.port,
        );
    }
    let _ = writeln!(dot, "}}");
    Ok(dot)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::input::load_str;

    #[test]
    fn dot_output_contains_nodes_and_edges() {
        let sim = load_str(
            r#"
            [simulation_info]
            max_time = 10
            fixed_random = 0.5

            [loads.flat]
            time_rate_pairs = [[0.0, 5.0]]

            [components.grid]
            type = "source"
            outflow = "electricity"

            [components.building]
            type = "load"
            inflow = "electricity"
            loads_by_scenario = { blue_sky = "flat" }

            [networks.town]
            connections = [["grid:OUT(0)", "building:IN(0)", "electricity"]]
            "#,
        )
        .unwrap();
        let dot = network_to_dot(&sim, "town").unwrap();
        assert!(dot.contains("digraph \"town\""));
        assert!(dot.contains("\"grid\" [shape=invhouse];"));
        assert!(dot.contains("\"building\" [shape=house];"));
        assert!(dot.contains("\"grid\" -> \"building\" [label=\"electricity (0->0)\"];"));
        assert!(network_to_dot(&sim, "village").is_err());
    }
}
