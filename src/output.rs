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

//! CSV emission of flow time-series and scenario statistics.

use std::collections::BTreeSet;
use std::io::Write;

use flowsim::prelude::*;
use flowsim::stats::energy_availability;
use itertools::Itertools;

use crate::EnflowError;

/// Write the recorded time-series of one scenario occurrence: one row per
/// event time, with a `<tag>:requested` and `<tag>:achieved` column pair
/// per recorded port. Values hold from their row's time until the next row.
pub fn write_flows_csv(
    results: &ScenarioResults,
    out: impl Write,
) -> Result<(), EnflowError> {
    let mut csv = csv::Writer::from_writer(out);
    let series: Vec<_> = results.writer.iter_recorded().collect();

    let mut header = vec!["time_s".to_string()];
    for (_, info, _) in &series {
        header.push(format!("{}:requested", info.tag));
        header.push(format!("{}:achieved", info.tag));
    }
    csv.write_record(&header)?;

    let times: BTreeSet<RealTime> = series
        .iter()
        .flat_map(|(_, _, history)| history.iter().map(|d| d.time))
        .collect();
    for time in times {
        let mut row = vec![time.to_string()];
        for (_, _, history) in &series {
            // the sample holding at this time
            let datum = history
                .iter()
                .take_while(|d| d.time <= time)
                .last()
                .copied()
                .unwrap_or_default();
            row.push(datum.requested.to_string());
            row.push(datum.achieved.to_string());
        }
        csv.write_record(&row)?;
    }
    csv.flush().map_err(|e| EnflowError::Csv(e.into()))?;
    Ok(())
}

/// Write per-series statistics of all scenarios, followed by TOTAL rows
/// per stream and per port role.
pub fn write_stats_csv(results: &AllResults, out: impl Write) -> Result<(), EnflowError> {
    let mut csv = csv::Writer::from_writer(out);
    csv.write_record([
        "scenario",
        "series",
        "component_type",
        "stream",
        "port_role",
        "uptime_s",
        "downtime_s",
        "max_downtime_s",
        "load_not_served_kJ",
        "total_energy_kJ",
        "energy_availability",
    ])?;

    for (scenario, occurrences) in &results.results {
        let mut summary = StatsSummary::default();
        for occurrence in occurrences {
            summary.merge(&occurrence.stats());
        }
        // look the series metadata up in the first occurrence
        let info_of = |tag: &str| {
            occurrences
                .iter()
                .find_map(|o| o.writer.id_of(tag).map(|id| o.writer.info(id).clone()))
        };
        for (tag, stats) in &summary.by_series {
            let info = match info_of(tag) {
                Some(info) => info,
                None => continue,
            };
            csv.write_record([
                scenario.clone(),
                tag.clone(),
                info.component_type.to_string(),
                info.stream.to_string(),
                info.port_role.to_string(),
                stats.uptime.to_string(),
                stats.downtime.to_string(),
                stats.max_downtime.to_string(),
                format!("{:.6}", stats.load_not_served),
                format!("{:.6}", stats.total_energy),
                format!("{:.6}", energy_availability(stats)),
            ])?;
        }
        for (stream, energy) in &summary.energy_by_stream {
            csv.write_record([
                scenario.clone(),
                "TOTAL".to_string(),
                String::new(),
                stream.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                format!("{energy:.6}"),
                String::new(),
            ])?;
        }
        for (role, energy) in &summary.energy_by_role {
            csv.write_record([
                scenario.clone(),
                "TOTAL".to_string(),
                String::new(),
                String::new(),
                role.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                format!("{energy:.6}"),
                String::new(),
            ])?;
        }
    }
    csv.flush().map_err(|e| EnflowError::Csv(e.into()))?;
    Ok(())
}

/// A short human-readable summary of a finished run.
pub fn run_summary(results: &AllResults) -> String {
    results
        .results
        .iter()
        .map(|(scenario, occurrences)| {
            let good = occurrences.iter().filter(|o| o.is_good).count();
            format!("{scenario}: {good}/{} occurrence(s) simulated", occurrences.len())
        })
        .join("\n")
}

#[cfg(test)]
mod test {
    use super::*;

    fn results_with_one_series() -> ScenarioResults {
        let mut writer = FlowWriter::new();
        let id = writer
            .register(
                SeriesInfo {
                    tag: "building-inflow".to_string(),
                    stream: "electricity".into(),
                    component_type: ComponentType::Load,
                    port_role: PortRole::LoadInflow,
                },
                true,
            )
            .unwrap();
        writer.write(id, 0, 5.0, 5.0);
        writer.write(id, 50, 5.0, 0.0);
        writer.finalize_at(100);
        ScenarioResults {
            is_good: true,
            message: None,
            scenario: "outage".to_string(),
            start_time: 0,
            duration: 100,
            writer,
        }
    }

    #[test]
    fn flows_csv_has_one_row_per_time() {
        let results = results_with_one_series();
        let mut out = Vec::new();
        write_flows_csv(&results, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "time_s,building-inflow:requested,building-inflow:achieved"
        );
        assert_eq!(lines[1], "0,5,5");
        assert_eq!(lines[2], "50,5,0");
        assert_eq!(lines[3], "100,5,0");
    }

    #[test]
    fn stats_csv_contains_series_and_totals() {
        let mut all = AllResults::default();
        all.results.insert("outage".to_string(), vec![results_with_one_series()]);
        let mut out = Vec::new();
        write_stats_csv(&all, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("outage,building-inflow,load,electricity,load_inflow"));
        assert!(text.contains("outage,TOTAL,,electricity,"));
        assert!(text.contains("outage,TOTAL,,,load_inflow"));
    }
}
