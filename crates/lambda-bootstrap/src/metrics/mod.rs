// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Optional per-invocation performance metrics.
//!
//! The invocation loop is generic over [`PerformanceMetrics`] and picks an
//! implementation once at startup. [`NoopMetrics`] calls straight through and
//! records nothing; [`RecordingMetrics`] times every named section and logs the
//! results when it is dropped at the end of an invocation.

mod stopwatch;

pub use stopwatch::StopWatch;

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::log_map;
use crate::logging::StructuralLogger;

/// Times named sections of work.
///
/// Takes `&self` so sections can nest: an outer section's closure may time
/// inner sections through the same metrics value.
pub trait PerformanceMetrics {
    fn add_metric<T>(&self, name: &str, action: impl FnOnce() -> T) -> T;

    /// Recorded durations in milliseconds.
    fn results(&self) -> BTreeMap<String, u64>;
}

/// Records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl PerformanceMetrics for NoopMetrics {
    #[inline(always)]
    fn add_metric<T>(&self, _name: &str, action: impl FnOnce() -> T) -> T {
        action()
    }

    fn results(&self) -> BTreeMap<String, u64> {
        BTreeMap::new()
    }
}

/// Times sections with a [`StopWatch`] and logs the results on drop.
#[derive(Debug)]
pub struct RecordingMetrics<'a> {
    stop_watch: RefCell<StopWatch>,
    active_topic: String,
    logger: &'a StructuralLogger,
}

impl<'a> RecordingMetrics<'a> {
    pub fn start(topic: &str, logger: &'a StructuralLogger) -> Self {
        let active_topic = format!("MetricActiveTime[{}]", topic);
        let mut stop_watch = StopWatch::new(topic);
        stop_watch.start(&active_topic);
        Self {
            stop_watch: RefCell::new(stop_watch),
            active_topic,
            logger,
        }
    }
}

impl PerformanceMetrics for RecordingMetrics<'_> {
    fn add_metric<T>(&self, name: &str, action: impl FnOnce() -> T) -> T {
        self.stop_watch.borrow_mut().start(name);
        let result = action();
        self.stop_watch.borrow_mut().stop(name);
        result
    }

    fn results(&self) -> BTreeMap<String, u64> {
        let mut stop_watch = self.stop_watch.borrow_mut();
        stop_watch.stop(&self.active_topic);
        stop_watch.times_map()
    }
}

impl Drop for RecordingMetrics<'_> {
    fn drop(&mut self) {
        self.logger.debug_log_map(|| {
            let times: Map<String, Value> = self
                .results()
                .into_iter()
                .map(|(topic, ms)| (topic, Value::from(ms)))
                .collect();
            log_map! {
                "message" => "Performance metrics",
                "summary" => self.stop_watch.borrow().summary(),
                "times" => times,
            }
        });
    }
}
