// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structured log records rendered through the runtime's codec.
//!
//! Each record is a JSON object built by a closure. The closure only runs when
//! the level is enabled, so building large diagnostic maps costs nothing while
//! the level is filtered out.

use std::sync::Arc;

use tracing::Level;

use crate::marshalling::{Codec, Event};

/// Emits JSON-object log records at a given level.
#[derive(Clone)]
pub struct StructuralLogger {
    codec: Arc<dyn Codec>,
}

impl StructuralLogger {
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self { codec }
    }

    pub fn trace_log_map(&self, statement: impl FnOnce() -> Event) {
        if tracing::enabled!(Level::TRACE) {
            let record = self.render(statement);
            tracing::trace!("{}", record);
        }
    }

    pub fn debug_log_map(&self, statement: impl FnOnce() -> Event) {
        if tracing::enabled!(Level::DEBUG) {
            let record = self.render(statement);
            tracing::debug!("{}", record);
        }
    }

    pub fn error_log_map(&self, statement: impl FnOnce() -> Event) {
        if tracing::enabled!(Level::ERROR) {
            let record = self.render(statement);
            tracing::error!("{}", record);
        }
    }

    fn render(&self, statement: impl FnOnce() -> Event) -> String {
        let map = statement();
        match self.codec.marshal(&map) {
            Ok(text) => text,
            Err(e) => format!("unrenderable log record ({}): {:?}", e, map),
        }
    }
}

impl std::fmt::Debug for StructuralLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuralLogger").finish_non_exhaustive()
    }
}

/// Build an [`Event`] from `key => value` pairs.
///
/// Values go through `serde_json::Value::from`, so `Option` renders as `null`.
#[macro_export]
macro_rules! log_map {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::marshalling::Event::new();
        $(
            map.insert(($key).to_string(), ::serde_json::Value::from($value));
        )*
        map
    }};
}
