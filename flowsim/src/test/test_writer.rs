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

//! Tests of the flow writer.

use pretty_assertions::assert_eq;

use crate::flow_writer::{FlowWriter, SeriesInfo};
use crate::types::{ComponentType, ConfigError, Datum, PortRole};

fn info(tag: &str) -> SeriesInfo {
    SeriesInfo {
        tag: tag.to_string(),
        stream: "electricity".into(),
        component_type: ComponentType::Load,
        port_role: PortRole::LoadInflow,
    }
}

#[test]
fn tags_must_be_unique() {
    let mut writer = FlowWriter::new();
    writer.register(info("a"), true).unwrap();
    assert_eq!(
        writer.register(info("a"), true),
        Err(ConfigError::DuplicateTag("a".to_string()))
    );
}

#[test]
fn same_time_writes_overwrite() {
    let mut writer = FlowWriter::new();
    let id = writer.register(info("a"), true).unwrap();
    // transients within one real instant collapse into the settled value
    writer.write(id, 0, 5.0, 0.0);
    writer.write(id, 0, 5.0, 5.0);
    writer.write(id, 10, 5.0, 2.0);
    assert_eq!(
        writer.history(id),
        &[
            Datum { time: 0, requested: 5.0, achieved: 5.0 },
            Datum { time: 10, requested: 5.0, achieved: 2.0 },
        ]
    );
}

#[test]
fn unchanged_values_are_not_recorded() {
    let mut writer = FlowWriter::new();
    let id = writer.register(info("a"), true).unwrap();
    writer.write(id, 0, 5.0, 5.0);
    writer.write(id, 10, 5.0, 5.0);
    writer.write(id, 20, 3.0, 3.0);
    let times: Vec<i64> = writer.history(id).iter().map(|d| d.time).collect();
    assert_eq!(times, vec![0, 20]);
}

#[test]
fn finalize_appends_a_terminal_record() {
    let mut writer = FlowWriter::new();
    let id = writer.register(info("a"), true).unwrap();
    writer.write(id, 0, 5.0, 5.0);
    writer.finalize_at(100);
    assert_eq!(
        writer.history(id).last(),
        Some(&Datum { time: 100, requested: 5.0, achieved: 5.0 })
    );
}

#[test]
fn non_recording_series_stay_empty() {
    let mut writer = FlowWriter::new();
    let id = writer.register(info("quiet"), false).unwrap();
    writer.write(id, 0, 5.0, 5.0);
    writer.finalize_at(100);
    assert_eq!(writer.history(id), &[] as &[Datum]);
    assert_eq!(writer.iter_recorded().count(), 0);
    assert_eq!(writer.num_series(), 1);
}

#[test]
fn times_are_strictly_increasing() {
    let mut writer = FlowWriter::new();
    let id = writer.register(info("a"), true).unwrap();
    writer.write(id, 0, 1.0, 1.0);
    writer.write(id, 5, 2.0, 2.0);
    writer.write(id, 5, 2.0, 1.0);
    writer.write(id, 9, 3.0, 3.0);
    writer.finalize_at(20);
    let times: Vec<i64> = writer.history(id).iter().map(|d| d.time).collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(writer.info(id).tag, "a");
    assert_eq!(writer.id_of("a"), Some(id));
}
