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

//! Module containing the definition of the event queue.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::types::{ElementId, SuperDenseTime};

use super::Event;

/// The event queue over super-dense time.
///
/// Each element has at most one pending internal event. Rescheduling an
/// element replaces its pending event; stale heap entries are discarded
/// lazily when they surface.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    scheduled: HashMap<ElementId, SuperDenseTime>,
}

impl EventQueue {
    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule (or reschedule) the element's next internal event.
    pub fn schedule(&mut self, element: ElementId, time: SuperDenseTime) {
        self.scheduled.insert(element, time);
        self.heap.push(Reverse(Event::new(time, element)));
    }

    /// Remove the element's pending event, if any.
    pub fn cancel(&mut self, element: ElementId) {
        self.scheduled.remove(&element);
    }

    /// The super-dense time of the next pending event, if any.
    pub fn next_time(&mut self) -> Option<SuperDenseTime> {
        self.skip_stale();
        self.heap.peek().map(|Reverse(ev)| ev.time)
    }

    /// Pop every element whose next event is due exactly at `time` (the
    /// imminent set).
    pub fn pop_imminent(&mut self, time: SuperDenseTime) -> Vec<ElementId> {
        let mut imminent = Vec::new();
        loop {
            self.skip_stale();
            match self.heap.peek().copied() {
                Some(Reverse(ev)) if ev.time == time => {
                    self.heap.pop();
                    self.scheduled.remove(&ev.element);
                    imminent.push(ev.element);
                }
                _ => break,
            }
        }
        imminent
    }

    /// Get the number of pending events.
    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    /// Return `true` if no event is pending.
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Remove all events from the queue.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.scheduled.clear();
    }

    /// Drop heap entries that no longer match the scheduled time of their
    /// element.
    fn skip_stale(&mut self) {
        while let Some(Reverse(ev)) = self.heap.peek().copied() {
            if self.scheduled.get(&ev.element) == Some(&ev.time) {
                break;
            }
            self.heap.pop();
        }
    }
}
