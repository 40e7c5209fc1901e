// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Demo bootstrap answering every invocation with a fixed person record.
//!
//! Usage:
//!
//! - `bootstrap` - inside Lambda, runtime API from `AWS_LAMBDA_RUNTIME_API`
//! - `bootstrap <port>` - against a runtime API on `127.0.0.1:<port>`

use anyhow::Context;
use tracing::debug;

use lambda_bootstrap::log_map;
use lambda_bootstrap::{
    BootstrapOptions, Event, HandlerError, LocalConfiguration, start_lambda_runtime,
    start_lambda_runtime_with, telemetry,
};

fn handle(_event: Event) -> Result<Event, HandlerError> {
    Ok(log_map! {
        "firstName" => "Hans",
        "lastName" => "Wurst",
    })
}

fn main() -> anyhow::Result<()> {
    telemetry::init_subscriber()?;

    if let Err(e) = dotenvy::dotenv() {
        debug!("No .env file loaded: {}", e);
    }

    let outcome = match std::env::args().nth(1) {
        Some(port) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid runtime API port: {}", port))?;
            let options = BootstrapOptions::from_env();
            start_lambda_runtime_with(
                LocalConfiguration::localhost(port),
                options.enable_performance_metrics,
                handle,
            )
        }
        None => start_lambda_runtime(handle),
    };

    let Err(error) = outcome;
    Err(error.into())
}
