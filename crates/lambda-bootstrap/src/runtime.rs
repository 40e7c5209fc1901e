// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The invocation loop.
//!
//! Fetch an invocation, decode its payload, run the handler, encode the
//! response and deliver it, forever. The loop has no normal exit. A
//! [`LambdaEnvironmentTainted`](crate::error::LambdaEnvironmentTainted) fault
//! from talking to the runtime API ends it: [`LambdaRuntime::start`] logs the
//! fault's details at error level and exits the process with status 1.
//!
//! Codec and handler failures are not handled here. They are returned to the
//! caller of the loop as [`RuntimeError::Codec`] and [`RuntimeError::Handler`].

use std::convert::Infallible;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::{BootstrapOptions, ProductionConfiguration, RuntimeConfiguration};
use crate::error::{HandlerError, RuntimeError};
use crate::http::transport::{Transport, UreqTransport};
use crate::invocation::{next_invocation, respond};
use crate::log_map;
use crate::logging::StructuralLogger;
use crate::marshalling::{Codec, Event};
use crate::metrics::{NoopMetrics, PerformanceMetrics, RecordingMetrics};

/// Topic under which per-invocation metrics are recorded.
pub const INVOCATION_METRICS_TOPIC: &str = "Lambda Invocation";

/// Turns an event into a response.
pub trait Handler {
    fn handle(&self, event: Event) -> Result<Event, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(Event) -> Result<Event, HandlerError>,
{
    fn handle(&self, event: Event) -> Result<Event, HandlerError> {
        self(event)
    }
}

/// Serves invocations from the runtime API described by `C` over `T`.
#[derive(Debug)]
pub struct LambdaRuntime<C, T = UreqTransport> {
    configuration: C,
    transport: T,
}

impl<C: RuntimeConfiguration> LambdaRuntime<C> {
    pub fn new(configuration: C) -> Self {
        Self::with_transport(configuration, UreqTransport::new())
    }
}

impl<C: RuntimeConfiguration, T: Transport> LambdaRuntime<C, T> {
    pub fn with_transport(configuration: C, transport: T) -> Self {
        Self {
            configuration,
            transport,
        }
    }

    pub fn configuration(&self) -> &C {
        &self.configuration
    }

    /// Run the loop, exiting the process with status 1 on a tainted
    /// environment.
    ///
    /// Returns only for faults the loop does not handle.
    pub fn start<H: Handler>(&self, enable_metrics: bool, handler: H) -> Result<Infallible, RuntimeError> {
        match self.serve(enable_metrics, handler) {
            Err(RuntimeError::EnvironmentTainted(fault)) => {
                let logger = StructuralLogger::new(self.configuration.codec());
                logger.error_log_map(|| fault.error_details());
                std::process::exit(1)
            }
            other => other,
        }
    }

    /// Run the loop until the first fault and return it.
    pub fn serve<H: Handler>(&self, enable_metrics: bool, handler: H) -> Result<Infallible, RuntimeError> {
        let codec = self.configuration.codec();
        let logger = StructuralLogger::new(Arc::clone(&codec));

        logger.debug_log_map(|| {
            let environment: Map<String, Value> = self
                .configuration
                .environment_variables()
                .redacted()
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect();
            log_map! {
                "message" => "Main entered in environment",
                "environment" => environment,
            }
        });

        if enable_metrics {
            self.run(&handler, codec.as_ref(), &logger, || {
                RecordingMetrics::start(INVOCATION_METRICS_TOPIC, &logger)
            })
        } else {
            self.run(&handler, codec.as_ref(), &logger, || NoopMetrics)
        }
    }

    fn run<H, M>(
        &self,
        handler: &H,
        codec: &dyn Codec,
        logger: &StructuralLogger,
        new_metrics: impl Fn() -> M,
    ) -> Result<Infallible, RuntimeError>
    where
        H: Handler,
        M: PerformanceMetrics,
    {
        loop {
            // Dropped at the end of every iteration, fault or not.
            let metrics = new_metrics();
            self.invoke_once(handler, codec, logger, &metrics)?;
        }
    }

    fn invoke_once<H, M>(
        &self,
        handler: &H,
        codec: &dyn Codec,
        logger: &StructuralLogger,
        metrics: &M,
    ) -> Result<(), RuntimeError>
    where
        H: Handler,
        M: PerformanceMetrics,
    {
        let invocation = next_invocation(
            &self.transport,
            self.configuration.next_invocation_url(),
            metrics,
            logger,
        )?;
        let event = match invocation.payload.as_deref() {
            Some(payload) => codec.unmarshal(payload)?,
            None => Event::new(),
        };
        let response = handler.handle(event).map_err(RuntimeError::Handler)?;
        let payload = codec.marshal(&response)?;
        respond(
            &self.transport,
            &self.configuration,
            &invocation,
            &payload,
            metrics,
            logger,
        )?;
        Ok(())
    }
}

/// Start the loop inside the Lambda execution environment.
///
/// Metrics are switched on by `LAMBDA_BOOTSTRAP_PERFORMANCE_METRICS`.
pub fn start_lambda_runtime<H: Handler>(handler: H) -> Result<Infallible, RuntimeError> {
    let configuration = ProductionConfiguration::from_env()?;
    let options = BootstrapOptions::from_env();
    start_lambda_runtime_with(configuration, options.enable_performance_metrics, handler)
}

/// Start the loop against an explicit configuration.
pub fn start_lambda_runtime_with<C, H>(
    configuration: C,
    enable_metrics: bool,
    handler: H,
) -> Result<Infallible, RuntimeError>
where
    C: RuntimeConfiguration,
    H: Handler,
{
    LambdaRuntime::new(configuration).start(enable_metrics, handler)
}
