// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tracing subscriber setup for bootstrap binaries.
//!
//! The Lambda service forwards stderr to CloudWatch, so records go there as
//! plain text without colours.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `info`)

use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

/// Subscriber with a stderr fmt layer filtered by `RUST_LOG`.
pub fn subscriber() -> impl Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::Registry::default().with(fmt).with(filter)
}

/// Install [`subscriber`] as the global default.
///
/// Fails if a global subscriber is already installed.
pub fn init_subscriber() -> Result<(), SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(subscriber())
}
