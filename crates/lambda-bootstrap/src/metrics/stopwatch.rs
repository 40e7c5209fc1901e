// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wall-clock timing of named topics.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Records how long named topics took.
///
/// Starting a topic that was already recorded replaces the earlier timing.
#[derive(Debug, Default)]
pub struct StopWatch {
    topic: String,
    timers: BTreeMap<String, TopicTime>,
}

#[derive(Debug, Clone, Copy)]
struct TopicTime {
    started: Instant,
    stopped: Option<Instant>,
}

impl TopicTime {
    fn duration(&self) -> Option<Duration> {
        self.stopped.map(|stopped| stopped - self.started)
    }
}

impl StopWatch {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            timers: BTreeMap::new(),
        }
    }

    pub fn start(&mut self, topic: &str) {
        self.timers.insert(
            topic.to_string(),
            TopicTime {
                started: Instant::now(),
                stopped: None,
            },
        );
    }

    /// Stop a running topic. Unknown or already stopped topics are ignored.
    pub fn stop(&mut self, topic: &str) {
        if let Some(time) = self.timers.get_mut(topic)
            && time.stopped.is_none()
        {
            time.stopped = Some(Instant::now());
        }
    }

    /// Finished topics and their durations in milliseconds.
    pub fn times_map(&self) -> BTreeMap<String, u64> {
        self.timers
            .iter()
            .filter_map(|(topic, time)| {
                time.duration()
                    .map(|d| (topic.clone(), d.as_millis() as u64))
            })
            .collect()
    }

    /// One line, e.g. `StopWatch topic: a: 3ms;b: 1ms;;Overall: 4ms`.
    pub fn summary(&self) -> String {
        let times = self.times_map();
        let sub_times = times
            .iter()
            .map(|(topic, ms)| format!("{}: {}ms", topic, ms))
            .collect::<Vec<_>>()
            .join(";");
        let overall: u64 = times.values().sum();
        format!(
            "StopWatch {}: {};;Overall: {}ms",
            self.topic, sub_times, overall
        )
    }
}
