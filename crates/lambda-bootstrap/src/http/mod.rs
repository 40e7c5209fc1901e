// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP plumbing for the runtime API: transport, step pipeline, client.

pub mod client;
pub mod stepper;
pub mod steps;
pub mod transport;

pub use client::{HttpCallResult, do_http_call};
pub use stepper::Stepper;
pub use steps::{ErrorInfo, HeaderMap, Step, StepResult, SummaryText};
pub use transport::{Connection, ConnectionSettings, Transport, UreqTransport};
