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

//! Tests of the distribution registry and its inverse-transform sampling.

use pretty_assertions::assert_eq;

use crate::distribution::DistributionSystem;
use crate::types::ConfigError;

#[test]
fn fixed_ignores_the_variate() {
    let mut dists = DistributionSystem::new();
    let id = dists.add_fixed("fixed", 42).unwrap();
    assert_eq!(dists.next_time_advance(id, 0.0).unwrap(), 42);
    assert_eq!(dists.next_time_advance(id, 0.99).unwrap(), 42);
}

#[test]
fn uniform_interpolates_the_bounds() {
    let mut dists = DistributionSystem::new();
    let id = dists.add_uniform("uniform", 100, 200).unwrap();
    assert_eq!(dists.next_time_advance(id, 0.0).unwrap(), 100);
    assert_eq!(dists.next_time_advance(id, 0.5).unwrap(), 150);
    assert_eq!(dists.next_time_advance(id, 0.999).unwrap(), 200);
}

#[test]
fn uniform_requires_ordered_bounds() {
    let mut dists = DistributionSystem::new();
    assert!(matches!(
        dists.add_uniform("bad", 200, 100),
        Err(ConfigError::InvalidDistribution { .. })
    ));
}

#[test]
fn normal_median_is_the_mean() {
    let mut dists = DistributionSystem::new();
    let id = dists.add_normal("normal", 1000, 100).unwrap();
    assert_eq!(dists.next_time_advance(id, 0.5).unwrap(), 1000);
    // one sigma below the mean: Phi^-1(0.1587) ~ -1
    let low = dists.next_time_advance(id, 0.1587).unwrap();
    assert!((low - 900).abs() <= 1);
    // samples never go negative
    let mut dists = DistributionSystem::new();
    let id = dists.add_normal("tight", 10, 1000).unwrap();
    assert_eq!(dists.next_time_advance(id, 0.001).unwrap(), 0);
}

#[test]
fn weibull_inverts_its_cdf() {
    let mut dists = DistributionSystem::new();
    let id = dists.add_weibull("weibull", 1.0, 100.0, 20.0).unwrap();
    // at u = 1 - e^-1 the exponent is exactly 1: gamma + lambda
    let u = 1.0 - (-1.0f64).exp();
    assert_eq!(dists.next_time_advance(id, u).unwrap(), 120);
    assert_eq!(dists.next_time_advance(id, 0.0).unwrap(), 20);
}

#[test]
fn quantile_table_interpolates() {
    let mut dists = DistributionSystem::new();
    let id = dists
        .add_quantile_table("table", vec![0.0, 0.5, 1.0], vec![0.0, 100.0, 1000.0])
        .unwrap();
    assert_eq!(dists.next_time_advance(id, 0.0).unwrap(), 0);
    assert_eq!(dists.next_time_advance(id, 0.25).unwrap(), 50);
    assert_eq!(dists.next_time_advance(id, 0.75).unwrap(), 550);
    assert_eq!(dists.next_time_advance(id, 1.0).unwrap(), 1000);
}

#[test]
fn quantile_table_is_validated() {
    let mut dists = DistributionSystem::new();
    assert!(dists
        .add_quantile_table("bad", vec![0.0, 0.5], vec![0.0, 1.0, 2.0])
        .is_err());
    assert!(dists
        .add_quantile_table("bad", vec![0.0, 0.6, 0.5, 1.0], vec![0.0, 1.0, 2.0, 3.0])
        .is_err());
    assert!(dists
        .add_quantile_table("bad", vec![0.1, 1.0], vec![0.0, 1.0])
        .is_err());
}

#[test]
fn tags_resolve_to_ids() {
    let mut dists = DistributionSystem::new();
    let a = dists.add_fixed("a", 1).unwrap();
    let b = dists.add_fixed("b", 2).unwrap();
    assert_eq!(dists.lookup_dist_by_tag("a").unwrap(), a);
    assert_eq!(dists.lookup_dist_by_tag("b").unwrap(), b);
    assert!(dists.lookup_dist_by_tag("c").is_err());
    assert!(matches!(dists.add_fixed("a", 3), Err(ConfigError::DuplicateTag(_))));
}
