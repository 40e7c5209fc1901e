// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lambda Bootstrap - custom runtime host for the AWS Lambda runtime API.
//!
//! A process built on this crate polls the runtime API for invocations,
//! decodes each payload into a JSON object, hands it to a [`Handler`] and
//! posts the handler's response back. It runs one invocation at a time on the
//! calling thread with blocking I/O.
//!
//! # Quick Start
//!
//! ```ignore
//! use lambda_bootstrap::{Event, HandlerError, start_lambda_runtime, telemetry};
//!
//! fn main() -> anyhow::Result<()> {
//!     telemetry::init_subscriber()?;
//!     start_lambda_runtime(|event: Event| -> Result<Event, HandlerError> {
//!         Ok(event)
//!     })?;
//!     Ok(())
//! }
//! ```
//!
//! # Failure model
//!
//! Every call to the runtime API is a pipeline of steps (connect, read status,
//! read headers, read bodies). Diagnostics from every step are collected, and
//! a failed call surfaces as [`LambdaEnvironmentTainted`]. The loop logs that
//! fault at error level and exits with status 1; the host starts a fresh
//! process. Handler and codec failures are returned to the caller instead.

pub mod config;
pub mod environment;
pub mod error;
pub mod http;
pub mod invocation;
pub mod logging;
pub mod marshalling;
pub mod metrics;
pub mod runtime;
pub mod telemetry;

pub use config::{BootstrapOptions, LocalConfiguration, ProductionConfiguration, RuntimeConfiguration};
pub use environment::LambdaEnvironmentVariables;
pub use error::{CodecError, ConfigError, HandlerError, LambdaEnvironmentTainted, RuntimeError};
pub use invocation::Invocation;
pub use logging::StructuralLogger;
pub use marshalling::{Codec, Event, JsonCodec};
pub use metrics::{NoopMetrics, PerformanceMetrics, RecordingMetrics};
pub use runtime::{Handler, LambdaRuntime, start_lambda_runtime, start_lambda_runtime_with};
