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

//! Named time distributions, sampled by inverse transform.
//!
//! The system itself holds no random engine: every draw takes a uniform
//! variate `u` in `[0, 1)` supplied by the caller, so a run is
//! deterministic given a fixed seed (or a replayed series).

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::types::{ConfigError, RealTime, ReferenceError};

/// Dense id of a registered distribution.
pub type DistId = usize;

/// The supported distribution kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistSpec {
    /// Always the same value.
    Fixed {
        /// The value, in seconds.
        value: RealTime,
    },
    /// Uniform over `[lower_bound, upper_bound]`.
    Uniform {
        /// Lower bound in seconds.
        lower_bound: RealTime,
        /// Upper bound in seconds.
        upper_bound: RealTime,
    },
    /// Normal with the given mean and standard deviation, clamped at zero.
    Normal {
        /// Mean in seconds.
        mean: RealTime,
        /// Standard deviation in seconds.
        stddev: RealTime,
    },
    /// Three-parameter Weibull (shape `k`, scale `lambda`, location
    /// `gamma`), clamped at zero.
    Weibull {
        /// Shape parameter `k`.
        shape: f64,
        /// Scale parameter `lambda`, in seconds.
        scale: f64,
        /// Location parameter `gamma`, in seconds.
        location: f64,
    },
    /// Piecewise-linear quantile table mapping a variate in `[0, 1]` to a
    /// time.
    QuantileTable {
        /// Strictly increasing variates spanning `[0, 1]`.
        variates: Vec<f64>,
        /// Non-decreasing times in seconds, one per variate.
        times: Vec<f64>,
    },
}

/// The registry of named distributions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionSystem {
    dists: Vec<(String, DistSpec)>,
}

impl DistributionSystem {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, tag: impl Into<String>, spec: DistSpec) -> Result<DistId, ConfigError> {
        let tag = tag.into();
        if self.dists.iter().any(|(t, _)| *t == tag) {
            return Err(ConfigError::DuplicateTag(tag));
        }
        self.dists.push((tag, spec));
        Ok(self.dists.len() - 1)
    }

    /// Register a fixed distribution.
    pub fn add_fixed(
        &mut self,
        tag: impl Into<String>,
        value_s: RealTime,
    ) -> Result<DistId, ConfigError> {
        self.add(tag, DistSpec::Fixed { value: value_s })
    }

    /// Register a uniform distribution over `[lower_s, upper_s]`.
    pub fn add_uniform(
        &mut self,
        tag: impl Into<String>,
        lower_s: RealTime,
        upper_s: RealTime,
    ) -> Result<DistId, ConfigError> {
        let tag = tag.into();
        if lower_s >= upper_s {
            return Err(ConfigError::InvalidDistribution {
                tag,
                reason: format!("lower bound ({lower_s}) must be < upper bound ({upper_s})"),
            });
        }
        self.add(tag, DistSpec::Uniform { lower_bound: lower_s, upper_bound: upper_s })
    }

    /// Register a normal distribution.
    pub fn add_normal(
        &mut self,
        tag: impl Into<String>,
        mean_s: RealTime,
        stddev_s: RealTime,
    ) -> Result<DistId, ConfigError> {
        let tag = tag.into();
        if stddev_s < 0 {
            return Err(ConfigError::InvalidDistribution {
                tag,
                reason: format!("standard deviation must be >= 0, got {stddev_s}"),
            });
        }
        self.add(tag, DistSpec::Normal { mean: mean_s, stddev: stddev_s })
    }

    /// Register a Weibull distribution.
    pub fn add_weibull(
        &mut self,
        tag: impl Into<String>,
        shape: f64,
        scale: f64,
        location: f64,
    ) -> Result<DistId, ConfigError> {
        let tag = tag.into();
        if shape <= 0.0 || scale <= 0.0 {
            return Err(ConfigError::InvalidDistribution {
                tag,
                reason: format!("shape ({shape}) and scale ({scale}) must be > 0"),
            });
        }
        self.add(tag, DistSpec::Weibull { shape, scale, location })
    }

    /// Register a quantile table. `variates` must be strictly increasing
    /// and span `[0, 1]`; `times` must be non-decreasing and of the same
    /// length.
    pub fn add_quantile_table(
        &mut self,
        tag: impl Into<String>,
        variates: Vec<f64>,
        times_s: Vec<f64>,
    ) -> Result<DistId, ConfigError> {
        let tag = tag.into();
        let invalid = |reason: String| ConfigError::InvalidDistribution { tag: tag.clone(), reason };
        if variates.len() != times_s.len() || variates.len() < 2 {
            return Err(invalid(format!(
                "need the same number (>= 2) of variates and times, got {} and {}",
                variates.len(),
                times_s.len()
            )));
        }
        let mut previous: Option<NotNan<f64>> = None;
        for v in &variates {
            let v = NotNan::new(*v).map_err(|_| invalid("variate is NaN".to_string()))?;
            if previous.map(|p| v <= p).unwrap_or(false) {
                return Err(invalid("variates must be strictly increasing".to_string()));
            }
            previous = Some(v);
        }
        if variates[0] != 0.0 || *variates.last().expect("len checked above") != 1.0 {
            return Err(invalid("variates must span [0, 1]".to_string()));
        }
        if times_s.windows(2).any(|w| w[1] < w[0]) {
            return Err(invalid("times must be non-decreasing".to_string()));
        }
        self.add(tag, DistSpec::QuantileTable { variates, times: times_s })
    }

    /// Look up a distribution id by tag.
    pub fn lookup_dist_by_tag(&self, tag: &str) -> Result<DistId, ReferenceError> {
        self.dists
            .iter()
            .position(|(t, _)| t == tag)
            .ok_or_else(|| ReferenceError::Distribution(tag.to_string()))
    }

    /// The tag of a registered distribution.
    pub fn tag(&self, id: DistId) -> Option<&str> {
        self.dists.get(id).map(|(t, _)| t.as_str())
    }

    /// Sample the next time advance of distribution `id` at the uniform
    /// variate `u` in `[0, 1)`. Results are clamped to be non-negative and
    /// rounded to whole seconds.
    pub fn next_time_advance(&self, id: DistId, u: f64) -> Result<RealTime, ReferenceError> {
        let (_, spec) = self
            .dists
            .get(id)
            .ok_or_else(|| ReferenceError::Distribution(format!("#{id}")))?;
        let dt = match spec {
            DistSpec::Fixed { value } => *value as f64,
            DistSpec::Uniform { lower_bound, upper_bound } => {
                *lower_bound as f64 + u * (*upper_bound - *lower_bound) as f64
            }
            DistSpec::Normal { mean, stddev } => {
                *mean as f64 + *stddev as f64 * inverse_normal_cdf(u)
            }
            DistSpec::Weibull { shape, scale, location } => {
                location + scale * (-(1.0 - u).ln()).powf(1.0 / shape)
            }
            DistSpec::QuantileTable { variates, times } => interpolate(variates, times, u),
        };
        Ok(dt.round().max(0.0) as RealTime)
    }
}

/// Linear interpolation of `u` over the `(variates, times)` table.
fn interpolate(variates: &[f64], times: &[f64], u: f64) -> f64 {
    let u = u.clamp(0.0, 1.0);
    for window in 0..variates.len() - 1 {
        let (v0, v1) = (variates[window], variates[window + 1]);
        if u <= v1 {
            let (t0, t1) = (times[window], times[window + 1]);
            if v1 == v0 {
                return t1;
            }
            return t0 + (u - v0) / (v1 - v0) * (t1 - t0);
        }
    }
    times[times.len() - 1]
}

/// Rational approximation of the standard normal inverse CDF (Acklam's
/// algorithm, relative error below 1.15e-9 over the open unit interval).
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    let p = p.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
